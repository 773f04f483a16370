//! SVO corpus handling: the line format, the in-memory indices and the
//! streaming preprocessing filters.

pub mod filters;
pub mod index;
pub mod reader;

pub use index::SvoIndex;
pub use reader::SvoReader;
