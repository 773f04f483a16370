//! Pipeline stage implementations.
//!
//! Thin `Stage` wrappers around the svo and cluster modules: each stage
//! declares its inputs and outputs and delegates the actual work, keeping
//! the algorithms testable without a pipeline around them.

pub mod memory;
pub mod ncm;
pub mod ontext;
pub mod preprocess;

pub use memory::SvoToMemory;
pub use ncm::{BuildCooccurrenceGraph, NcmHcsw, NcmMedoids, NcmPromotePairs};
pub use ontext::{
    BuildCooccurrenceMatrix, EvidenceForPromotion, InstanceRanker, NormalizeMatrix, OntextKmeans,
};
pub use preprocess::{
    FilterInstanceInCategory, FilterSentencesByOccurrence, MinimumContextOccurrence,
    MinimumPairOccurrence, ReadCategories,
};
