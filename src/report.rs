//! Aggregated run reports.
//!
//! Collects the discovered relations of every successful category pair
//! into two CSV files: `relations.csv` with one row per relation
//! (medoid name, cluster size, promoted example pairs) and
//! `contexts.csv` with one row per cluster member context.

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::StateBag;
use std::fs::File;
use std::path::Path;

pub struct Reports {
    relations: csv::Writer<File>,
    contexts: csv::Writer<File>,
}

fn csv_writer(path: &Path, header: &[&str]) -> PipelineResult<csv::Writer<File>> {
    let file = File::create(path).map_err(|e| PipelineError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(header)
        .map_err(|e| PipelineError::FileWrite {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
    Ok(writer)
}

impl Reports {
    /// Create both report files with their header rows.
    pub fn create(dir: &Path) -> PipelineResult<Self> {
        Ok(Self {
            relations: csv_writer(
                &dir.join("relations.csv"),
                &["cat1", "cat2", "name", "cluster_size", "examples"],
            )?,
            contexts: csv_writer(
                &dir.join("contexts.csv"),
                &["cat1", "cat2", "relation", "context"],
            )?,
        })
    }

    /// Append one successful pair's relations from its final state.
    pub fn record_pair(
        &mut self,
        cat1: &str,
        cat2: &str,
        state: &StateBag,
    ) -> PipelineResult<()> {
        let relation_names = state.names("relation_names")?;
        let groups = state.groups("groups")?;
        let contexts = state.contexts("unique_contexts")?;
        let promoted = state.pair_lists("promoted_pairs")?;

        let to_error = |e: csv::Error| PipelineError::FileWrite {
            path: Path::new("relations.csv").to_path_buf(),
            source: std::io::Error::other(e),
        };

        for (cluster_id, name) in relation_names.iter().enumerate() {
            let cluster_size = groups
                .iter()
                .filter(|&&g| g == cluster_id as i64)
                .count();
            let examples = promoted
                .get(cluster_id)
                .map(|pairs| {
                    pairs
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_default();

            self.relations
                .write_record(&[
                    cat1.to_string(),
                    cat2.to_string(),
                    name.clone(),
                    cluster_size.to_string(),
                    examples,
                ])
                .map_err(to_error)?;

            for (i, context) in contexts.iter().enumerate() {
                if groups[i] == cluster_id as i64 {
                    self.contexts
                        .write_record([cat1, cat2, name.as_str(), context.as_str()])
                        .map_err(to_error)?;
                }
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> PipelineResult<()> {
        let flush_error = |e: std::io::Error| PipelineError::FileWrite {
            path: Path::new("relations.csv").to_path_buf(),
            source: e,
        };
        self.relations.flush().map_err(flush_error)?;
        self.contexts.flush().map_err(flush_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Value;
    use crate::types::Pair;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn reports_carry_headers_and_pair_rows() {
        let dir = TempDir::new().unwrap();
        let mut reports = Reports::create(dir.path()).unwrap();

        let mut state = StateBag::new();
        state.insert(
            "relation_names",
            Value::Names(Arc::new(vec!["likes".into()])),
        );
        state.insert("groups", Value::Groups(Arc::new(vec![0, 0])));
        state.insert(
            "unique_contexts",
            Value::Contexts(Arc::new(vec!["likes".into(), "loves".into()])),
        );
        state.insert(
            "promoted_pairs",
            Value::PairLists(Arc::new(vec![vec![Pair(
                "bob".into(),
                "paris".into(),
            )]])),
        );

        reports.record_pair("people", "places", &state).unwrap();
        reports.finish().unwrap();

        let relations = std::fs::read_to_string(dir.path().join("relations.csv")).unwrap();
        let lines: Vec<&str> = relations.lines().collect();
        assert_eq!(lines[0], "cat1,cat2,name,cluster_size,examples");
        assert_eq!(lines[1], "people,places,likes,2,bob|paris");

        let contexts = std::fs::read_to_string(dir.path().join("contexts.csv")).unwrap();
        let lines: Vec<&str> = contexts.lines().collect();
        assert_eq!(lines[0], "cat1,cat2,relation,context");
        assert_eq!(lines[1], "people,places,likes,likes");
        assert_eq!(lines[2], "people,places,likes,loves");
    }
}
