//! Typed key-value state shared by pipeline stages.
//!
//! The bag keeps two registries: `files` maps logical artifact names to
//! on-disk paths, `data` maps stable string keys to tagged values. Keys
//! stay plain strings so cache filenames remain compatible across runs;
//! the tagged `Value` enum replaces the dynamic dictionary the design
//! otherwise calls for, and typed accessors fail with a `dependency`
//! error when a stage published the wrong kind of value under a key.

use crate::cluster::graph::CoGraph;
use crate::error::{PipelineError, PipelineResult};
use crate::features::FeatureTable;
use crate::types::{CategorySet, ContextPairs, Pair, PairContexts};
use indexmap::IndexMap;
use ndarray::Array2;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A tagged value living in the pipeline state.
#[derive(Debug, Clone)]
pub enum Value {
    Category(Arc<CategorySet>),
    PairContexts(Arc<PairContexts>),
    ContextPairs(Arc<ContextPairs>),
    /// Sorted distinct context table; index = canonical context id.
    Contexts(Arc<Vec<String>>),
    /// Dense matrix: the co-occurrence matrix or k-means centroids.
    Matrix(Arc<Array2<f64>>),
    Graph(Arc<CoGraph>),
    /// Cluster id per context, -1 for unassigned.
    Groups(Arc<Vec<i64>>),
    /// Row index of the representative context per cluster.
    Medoids(Arc<Vec<usize>>),
    /// Relation names, one per cluster.
    Names(Arc<Vec<String>>),
    Count(usize),
    /// Per-cluster pair scores.
    Scores(Arc<Vec<IndexMap<Pair, f64>>>),
    /// Per-cluster pair lists (promoted or full).
    PairLists(Arc<Vec<Vec<Pair>>>),
    /// Per-cluster reconstructed evidence sentences.
    Sentences(Arc<Vec<Vec<String>>>),
    /// Cluster ids flagged for pruning.
    GroupIds(Arc<Vec<usize>>),
    Scalar(f64),
    Table(Arc<FeatureTable>),
}

impl Value {
    /// Human-readable kind, used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Category(_) => "a category",
            Self::PairContexts(_) => "a pair index",
            Self::ContextPairs(_) => "a context index",
            Self::Contexts(_) => "a context table",
            Self::Matrix(_) => "a matrix",
            Self::Graph(_) => "a graph",
            Self::Groups(_) => "a group assignment",
            Self::Medoids(_) => "medoid indices",
            Self::Names(_) => "relation names",
            Self::Count(_) => "a count",
            Self::Scores(_) => "pair scores",
            Self::PairLists(_) => "pair lists",
            Self::Sentences(_) => "evidence sentences",
            Self::GroupIds(_) => "group ids",
            Self::Scalar(_) => "a scalar",
            Self::Table(_) => "a feature table",
        }
    }
}

macro_rules! typed_accessor {
    ($fn_name:ident, $variant:ident, $ty:ty, $expected:literal) => {
        pub fn $fn_name(&self, key: &str) -> PipelineResult<&$ty> {
            match self.lookup(key)? {
                Value::$variant(v) => Ok(v),
                other => Err(PipelineError::DataType {
                    name: key.to_string(),
                    expected: $expected,
                    found: other.kind(),
                }),
            }
        }
    };
}

/// The shared pipeline state: file registry plus typed data registry.
#[derive(Debug, Default)]
pub struct StateBag {
    files: HashMap<String, PathBuf>,
    data: HashMap<String, Value>,
}

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(&mut self, name: impl Into<String>, path: PathBuf) {
        self.files.insert(name.into(), path);
    }

    pub fn file(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }

    pub fn require_file(&self, name: &str) -> PipelineResult<&Path> {
        self.file(name).ok_or_else(|| PipelineError::FileAbsent {
            name: name.to_string(),
        })
    }

    pub fn contains_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains_data(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    fn lookup(&self, key: &str) -> PipelineResult<&Value> {
        self.data.get(key).ok_or_else(|| PipelineError::DataAbsent {
            name: key.to_string(),
        })
    }

    typed_accessor!(category, Category, Arc<CategorySet>, "a category");
    typed_accessor!(pair_contexts, PairContexts, Arc<PairContexts>, "a pair index");
    typed_accessor!(context_pairs, ContextPairs, Arc<ContextPairs>, "a context index");
    typed_accessor!(contexts, Contexts, Arc<Vec<String>>, "a context table");
    typed_accessor!(matrix, Matrix, Arc<Array2<f64>>, "a matrix");
    typed_accessor!(graph, Graph, Arc<CoGraph>, "a graph");
    typed_accessor!(groups, Groups, Arc<Vec<i64>>, "a group assignment");
    typed_accessor!(medoids, Medoids, Arc<Vec<usize>>, "medoid indices");
    typed_accessor!(names, Names, Arc<Vec<String>>, "relation names");
    typed_accessor!(scores, Scores, Arc<Vec<IndexMap<Pair, f64>>>, "pair scores");
    typed_accessor!(pair_lists, PairLists, Arc<Vec<Vec<Pair>>>, "pair lists");
    typed_accessor!(sentences, Sentences, Arc<Vec<Vec<String>>>, "evidence sentences");
    typed_accessor!(group_ids, GroupIds, Arc<Vec<usize>>, "group ids");
    typed_accessor!(table, Table, Arc<FeatureTable>, "a feature table");

    pub fn count(&self, key: &str) -> PipelineResult<usize> {
        match self.lookup(key)? {
            Value::Count(n) => Ok(*n),
            other => Err(PipelineError::DataType {
                name: key.to_string(),
                expected: "a count",
                found: other.kind(),
            }),
        }
    }

    pub fn scalar(&self, key: &str) -> PipelineResult<f64> {
        match self.lookup(key)? {
            Value::Scalar(x) => Ok(*x),
            other => Err(PipelineError::DataType {
                name: key.to_string(),
                expected: "a scalar",
                found: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessor_rejects_wrong_variant() {
        let mut bag = StateBag::new();
        bag.insert("relation_count", Value::Count(3));

        assert_eq!(bag.count("relation_count").unwrap(), 3);
        let err = bag.contexts("relation_count").unwrap_err();
        match err {
            PipelineError::DataType {
                expected, found, ..
            } => {
                assert_eq!(expected, "a context table");
                assert_eq!(found, "a count");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_key_is_a_dependency_error() {
        let bag = StateBag::new();
        let err = bag.count("relation_count").unwrap_err();
        assert_eq!(err.taxonomy(), "dependency");
        assert!(bag.require_file("svo").is_err());
    }
}
