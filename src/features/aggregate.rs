//! Feature aggregation: join the per-relation feature tables into one.

use crate::error::PipelineResult;
use crate::features::table::FeatureTable;
use crate::pipeline::{Stage, StageContext, Value};
use std::sync::Arc;

/// Joins whichever feature tables earlier stages published, indexed by
/// relation name. Optionally persists the result as the classifier input.
pub struct FeatureAggregator {
    save_output: bool,
}

impl FeatureAggregator {
    pub fn new(save_output: bool) -> Self {
        Self { save_output }
    }
}

const FEATURE_TABLES: &[&str] = &[
    "pattern_context_size",
    "commonest_instances_frequencies",
    "relation_specificity",
];

impl Stage for FeatureAggregator {
    fn identity(&self) -> String {
        "Feature_aggregator".to_string()
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["relation_names"]
    }

    fn creates(&self) -> Vec<&'static str> {
        if self.save_output {
            vec!["classifier_data"]
        } else {
            Vec::new()
        }
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["classification_data"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let relation_names = ctx.state.names("relation_names")?.clone();
        let mut aggregated = FeatureTable::new("relation", relation_names.as_ref().clone());

        for &name in FEATURE_TABLES {
            if ctx.state.contains_data(name) {
                let table = ctx.state.table(name)?.clone();
                aggregated.join(&table)?;
            }
        }

        if self.save_output {
            aggregated.save(&ctx.work_dir.join("classifier_data"))?;
        }

        ctx.state
            .insert("classification_data", Value::Table(Arc::new(aggregated)));
        Ok(())
    }
}
