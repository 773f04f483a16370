//! Relationship characteristics feature.
//!
//! For each relation, the category instance occurring in the most
//! candidate pairs, with its pair count, the count normalized by the
//! size of the *other* category, and its raw corpus frequency from the
//! persisted instance-frequency CSV.

use crate::error::{PipelineError, PipelineResult};
use crate::features::table::{CellValue, FeatureTable};
use crate::pipeline::{Stage, StageContext, Value};
use crate::types::{CategorySet, Pair};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

pub struct RelationshipCharacteristics;

/// The instance of `instances` appearing in the most pairs, with its
/// count. Ties keep the earliest instance encountered.
fn most_cooccurring_instance(
    pairs: &[Pair],
    instances: &CategorySet,
) -> Option<(String, i64)> {
    let mut counts: IndexMap<&str, i64> = IndexMap::new();
    for pair in pairs {
        let instance = if instances.contains(&pair.0) {
            &pair.0
        } else {
            &pair.1
        };
        *counts.entry(instance.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<(&str, i64)> = None;
    for (instance, count) in counts {
        if best.is_none_or(|(_, b)| count > b) {
            best = Some((instance, count));
        }
    }
    best.map(|(instance, count)| (instance.to_string(), count))
}

/// Read an `instance,frequency,normalized` CSV into a frequency lookup.
fn read_frequency_csv(path: &Path) -> PipelineResult<IndexMap<String, f64>> {
    let to_error = |e: csv::Error| PipelineError::FileRead {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    };

    let mut reader = csv::Reader::from_path(path).map_err(to_error)?;
    let mut frequencies = IndexMap::new();
    for record in reader.records() {
        let record = record.map_err(to_error)?;
        let instance = record.get(0).unwrap_or_default().to_string();
        let frequency: f64 = record
            .get(1)
            .unwrap_or_default()
            .parse()
            .map_err(|_| PipelineError::FileRead {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("non-numeric frequency for instance '{instance}'"),
                ),
            })?;
        frequencies.insert(instance, frequency);
    }
    Ok(frequencies)
}

impl Stage for RelationshipCharacteristics {
    fn identity(&self) -> String {
        "Relationship_characteristics".to_string()
    }

    fn required_files(&self) -> Vec<&'static str> {
        vec!["instance_frequency_cat1", "instance_frequency_cat2"]
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["group_pairs", "cat1", "cat2", "relation_names"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["commonest_instances_frequencies"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let group_pairs = ctx.state.pair_lists("group_pairs")?.clone();
        let cat1 = ctx.state.category("cat1")?.clone();
        let cat2 = ctx.state.category("cat2")?.clone();
        let relation_names = ctx.state.names("relation_names")?.clone();

        if group_pairs.len() != relation_names.len() {
            return Err(PipelineError::Arithmetic {
                reason: format!(
                    "group pair lists cover {} clusters, relation names {}",
                    group_pairs.len(),
                    relation_names.len()
                ),
            });
        }

        let cat1_frequencies =
            read_frequency_csv(ctx.state.require_file("instance_frequency_cat1")?)?;
        let cat2_frequencies =
            read_frequency_csv(ctx.state.require_file("instance_frequency_cat2")?)?;

        let mut c1_instances = Vec::new();
        let mut c1_counts = Vec::new();
        let mut c1_normalized = Vec::new();
        let mut c1_raw = Vec::new();
        let mut c2_instances = Vec::new();
        let mut c2_counts = Vec::new();
        let mut c2_normalized = Vec::new();
        let mut c2_raw = Vec::new();

        for pairs in group_pairs.iter() {
            let (c1_instance, c1_count) =
                most_cooccurring_instance(pairs, &cat1).unwrap_or_default();
            let (c2_instance, c2_count) =
                most_cooccurring_instance(pairs, &cat2).unwrap_or_default();

            // Normalized by the size of the opposite category: how much of
            // the other side this instance covers.
            c1_normalized.push(CellValue::Float(
                c1_count as f64 / cat2.len().max(1) as f64,
            ));
            c2_normalized.push(CellValue::Float(
                c2_count as f64 / cat1.len().max(1) as f64,
            ));
            c1_raw.push(CellValue::Float(
                cat1_frequencies.get(&c1_instance).copied().unwrap_or(0.0),
            ));
            c2_raw.push(CellValue::Float(
                cat2_frequencies.get(&c2_instance).copied().unwrap_or(0.0),
            ));
            c1_instances.push(CellValue::Text(c1_instance));
            c1_counts.push(CellValue::Int(c1_count));
            c2_instances.push(CellValue::Text(c2_instance));
            c2_counts.push(CellValue::Int(c2_count));
        }

        let mut table = FeatureTable::new("relation", relation_names.as_ref().clone());
        table.push_column("commonest_cat1_instance", c1_instances)?;
        table.push_column("commonest_cat1_count", c1_counts)?;
        table.push_column("commonest_cat1_normalized", c1_normalized)?;
        table.push_column("commonest_cat1_frequency", c1_raw)?;
        table.push_column("commonest_cat2_instance", c2_instances)?;
        table.push_column("commonest_cat2_count", c2_counts)?;
        table.push_column("commonest_cat2_normalized", c2_normalized)?;
        table.push_column("commonest_cat2_frequency", c2_raw)?;

        ctx.state.insert(
            "commonest_instances_frequencies",
            Value::Table(Arc::new(table)),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> Pair {
        Pair(a.to_string(), b.to_string())
    }

    #[test]
    fn finds_the_most_cooccurring_instance() {
        let people = CategorySet::new(
            "people",
            ["alice".to_string(), "bob".to_string(), "carol".to_string()],
        );
        let pairs = vec![
            pair("alice", "rome"),
            pair("alice", "paris"),
            pair("bob", "paris"),
        ];
        let (instance, count) = most_cooccurring_instance(&pairs, &people).unwrap();
        assert_eq!(instance, "alice");
        assert_eq!(count, 2);
    }

    #[test]
    fn empty_pair_list_has_no_commonest_instance() {
        let people = CategorySet::new("people", ["alice".to_string()]);
        assert!(most_cooccurring_instance(&[], &people).is_none());
    }

    #[test]
    fn frequency_csv_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freq");
        std::fs::write(&path, "instance,frequency,normalized\nalice,10,1\nbob,5,0.5\n").unwrap();
        let frequencies = read_frequency_csv(&path).unwrap();
        assert_eq!(frequencies["alice"], 10.0);
        assert_eq!(frequencies["bob"], 5.0);
    }
}
