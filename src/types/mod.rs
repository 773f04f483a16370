//! Core data model: corpus triples, canonical instance pairs, categories.

use crate::error::{PipelineError, PipelineResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One corpus line: `count` sentences observed with this subject, verb
/// context and object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub verb: String,
    pub object: String,
    pub count: u64,
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.subject, self.verb, self.object, self.count
        )
    }
}

/// An unordered instance pair, stored canonically as (min, max) by
/// lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair(pub String, pub String);

impl Pair {
    /// Canonicalize an observed (subject, object).
    ///
    /// The returned flag is true when the surface order already matched the
    /// canonical order, i.e. the sentence read subject-verb-object with
    /// `subject <= object`.
    pub fn canonical(subject: &str, object: &str) -> (Self, bool) {
        if subject <= object {
            (Self(subject.to_string(), object.to_string()), true)
        } else {
            (Self(object.to_string(), subject.to_string()), false)
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.0, self.1)
    }
}

/// A single observation of a pair under some verb context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextOccurrence {
    pub verb: String,
    pub count: u64,
    /// True when the original sentence order matched the canonical pair
    /// order; used to reconstruct evidence sentences.
    pub is_forward: bool,
}

/// Pair -> every context it was observed with, in corpus order.
pub type PairContexts = IndexMap<Pair, Vec<ContextOccurrence>>;

/// Context verb -> every (pair, count) it was observed with, in corpus order.
pub type ContextPairs = IndexMap<String, Vec<(Pair, u64)>>;

/// A finite set of instance identifiers, loaded from a one-per-line file.
#[derive(Debug, Clone)]
pub struct CategorySet {
    name: String,
    instances: HashSet<String>,
}

impl CategorySet {
    pub fn new(name: impl Into<String>, instances: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            instances: instances.into_iter().collect(),
        }
    }

    /// Load a category from disk. One identifier per line, trailing
    /// whitespace stripped, blank lines ignored.
    pub fn from_file(name: impl Into<String>, path: &Path) -> PipelineResult<Self> {
        let file = File::open(path).map_err(|e| PipelineError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut instances = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| PipelineError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            let instance = line.trim_end();
            if !instance.is_empty() {
                instances.insert(instance.to_string());
            }
        }

        Ok(Self {
            name: name.into(),
            instances,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, instance: &str) -> bool {
        self.instances.contains(instance)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
