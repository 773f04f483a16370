//! The category-pair driver.
//!
//! Iterates the configured category pairs, assembles a pipeline for each
//! according to the chosen clustering method, and isolates failures: a
//! failing pair is logged with its taxonomy tag and skipped in the
//! aggregated reports, and the run continues with the next pair.

use crate::config::{ClusterMethod, Settings};
use crate::error::{ConfigError, ConfigResult, PipelineResult};
use crate::features::{
    FeatureAggregator, InstanceFrequencyCount, PatternContextSize, RelationshipCharacteristics,
    Specificity,
};
use crate::pipeline::{Pipeline, Stage, StateBag};
use crate::report::Reports;
use crate::stages::{
    BuildCooccurrenceGraph, BuildCooccurrenceMatrix, EvidenceForPromotion,
    FilterInstanceInCategory, FilterSentencesByOccurrence, InstanceRanker,
    MinimumContextOccurrence, MinimumPairOccurrence, NcmHcsw, NcmMedoids, NcmPromotePairs,
    NormalizeMatrix, OntextKmeans, ReadCategories, SvoToMemory,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const RUN_DIR_FORMAT: &str = "%Y_%m_%d.%H_%M_%S";

/// One failed category pair.
#[derive(Debug, Serialize)]
pub struct PairFailure {
    pub pair: String,
    pub taxonomy: &'static str,
    pub error: String,
}

/// Outcome of one full run over the categories table. Also persisted as
/// `summary.json` in the run directory.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub run_dir: PathBuf,
    pub pairs_completed: usize,
    pub failures: Vec<PairFailure>,
}

pub struct Driver {
    settings: Settings,
}

impl Driver {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Run the pipeline over every configured category pair.
    pub fn run(&self) -> ConfigResult<RunSummary> {
        let settings = &self.settings;
        fs::metadata(&settings.svo_path).map_err(|e| ConfigError::MissingInput {
            path: settings.svo_path.clone(),
            source: e,
        })?;

        let pairs = parse_categories_table(&settings.categories_table)?;
        let run_dir = settings
            .output_dir
            .join(chrono::Local::now().format(RUN_DIR_FORMAT).to_string());
        fs::create_dir_all(&run_dir).map_err(|e| ConfigError::Invalid {
            reason: format!("cannot create output directory '{}': {e}", run_dir.display()),
        })?;

        let mut reports = Reports::create(&run_dir).map_err(|e| ConfigError::Invalid {
            reason: format!("cannot create report files: {e}"),
        })?;

        let mut summary = RunSummary {
            run_dir: run_dir.clone(),
            ..RunSummary::default()
        };

        for (cat1, cat2) in pairs {
            let pair_name = format!("{cat1}_{cat2}");
            tracing::info!(target: "driver", pair = %pair_name, "starting");

            match self.run_pair(&cat1, &cat2, &run_dir) {
                Ok(state) => {
                    if let Err(e) = reports.record_pair(&cat1, &cat2, &state) {
                        tracing::warn!(
                            target: "driver",
                            pair = %pair_name,
                            "relations computed but not reported: {e}"
                        );
                    }
                    summary.pairs_completed += 1;
                    tracing::info!(target: "driver", pair = %pair_name, "completed");
                }
                Err(e) => {
                    tracing::error!(
                        target: "driver",
                        pair = %pair_name,
                        taxonomy = e.taxonomy(),
                        "{e}"
                    );
                    summary.failures.push(PairFailure {
                        pair: pair_name,
                        taxonomy: e.taxonomy(),
                        error: e.to_string(),
                    });
                }
            }
        }

        reports.finish().map_err(|e| ConfigError::Invalid {
            reason: format!("cannot finalize report files: {e}"),
        })?;

        let summary_path = run_dir.join("summary.json");
        let body = serde_json::to_string_pretty(&summary).map_err(|e| ConfigError::Invalid {
            reason: format!("cannot serialize run summary: {e}"),
        })?;
        fs::write(&summary_path, body).map_err(|e| ConfigError::Invalid {
            reason: format!("cannot write '{}': {e}", summary_path.display()),
        })?;
        Ok(summary)
    }

    /// Build and execute the pipeline for a single category pair.
    fn run_pair(&self, cat1: &str, cat2: &str, run_dir: &Path) -> PipelineResult<StateBag> {
        let settings = &self.settings;
        let pair_dir = run_dir.join(format!("{cat1}_{cat2}"));

        let mut pipeline = Pipeline::new(pair_dir, self.stage_list(cat1, cat2)?)
            .with_file("raw_svo", settings.svo_path.clone())
            .with_file("svo", settings.svo_path.clone());
        if let Some(cache_dir) = &settings.cache_dir {
            pipeline = pipeline.with_cache(cache_dir, settings.cache_prefix.clone());
        }

        pipeline.prepare()?;
        pipeline.execute_all()?;
        Ok(pipeline.into_state())
    }

    /// The stage sequence for one pair, per the configured method.
    fn stage_list(&self, cat1: &str, cat2: &str) -> PipelineResult<Vec<Box<dyn Stage>>> {
        let settings = &self.settings;
        let filters = &settings.filters;
        let clustering = &settings.clustering;

        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(FilterSentencesByOccurrence::new(
                filters.min_sentence_occurrences,
            )?),
            Box::new(MinimumContextOccurrence::new(
                filters.min_context_occurrences,
            )?),
            Box::new(MinimumPairOccurrence::new(filters.min_pair_occurrences)?),
            Box::new(ReadCategories::new(
                cat1,
                settings.category_dir.join(cat1),
                cat2,
                settings.category_dir.join(cat2),
            )),
            Box::new(FilterInstanceInCategory::new(filters.reverse_categories)),
            Box::new(SvoToMemory),
        ];

        match clustering.method {
            ClusterMethod::Matrix => {
                stages.push(Box::new(BuildCooccurrenceMatrix::new(
                    settings.limits.max_contexts,
                )));
                stages.push(Box::new(NormalizeMatrix));
                stages.push(Box::new(OntextKmeans::new(
                    clustering.k,
                    clustering.seed,
                    clustering.max_iterations,
                )));
                stages.push(Box::new(InstanceRanker));
                stages.push(Box::new(EvidenceForPromotion::new(clustering.promote)));
            }
            ClusterMethod::Graph => {
                stages.push(Box::new(BuildCooccurrenceGraph));
                stages.push(Box::new(NcmHcsw::new(clustering.hcs_multiplier)?));
                stages.push(Box::new(NcmMedoids));
                stages.push(Box::new(NcmPromotePairs::new(
                    clustering.only_commonest,
                    clustering.promote,
                )));
            }
        }

        stages.push(Box::new(InstanceFrequencyCount));
        stages.push(Box::new(Specificity));
        stages.push(Box::new(PatternContextSize));
        stages.push(Box::new(RelationshipCharacteristics));
        stages.push(Box::new(FeatureAggregator::new(true)));
        Ok(stages)
    }
}

/// Parse the whitespace-separated `cat1 cat2 score` table. The score
/// column is present in the input but unused here.
pub fn parse_categories_table(path: &Path) -> ConfigResult<Vec<(String, String)>> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::MissingInput {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut pairs = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(ConfigError::MalformedCategories {
                path: path.to_path_buf(),
                line: line_no + 1,
            });
        }
        pairs.push((fields[0].to_string(), fields[1].to_string()));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn categories_table_parses_pairs_and_skips_blanks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("categories.txt");
        fs::write(&path, "politician religion 0.8\n\nshape building 0.5\n").unwrap();

        let pairs = parse_categories_table(&path).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("politician".to_string(), "religion".to_string()),
                ("shape".to_string(), "building".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_table_reports_the_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("categories.txt");
        fs::write(&path, "politician religion 0.8\nbroken-line\n").unwrap();

        match parse_categories_table(&path).unwrap_err() {
            ConfigError::MalformedCategories { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
