//! SVO ingestion into the in-memory indices.

use crate::error::PipelineResult;
use crate::pipeline::{Stage, StageContext, Value};
use crate::svo::{SvoIndex, SvoReader};
use std::sync::Arc;

/// Read the filtered SVO into the pair/context indices the co-occurrence
/// builders work from.
pub struct SvoToMemory;

impl Stage for SvoToMemory {
    fn identity(&self) -> String {
        "Svo_to_memory".to_string()
    }

    fn required_files(&self) -> Vec<&'static str> {
        vec!["svo"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["pair_to_contexts", "contexts_to_pairs", "unique_contexts"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let path = ctx.state.require_file("svo")?.to_path_buf();
        let index = SvoIndex::build(SvoReader::open(&path)?)?;
        tracing::debug!(
            target: "pipeline",
            "Indexed {} pairs over {} contexts",
            index.pair_to_contexts.len(),
            index.unique_contexts.len()
        );

        ctx.state.insert(
            "pair_to_contexts",
            Value::PairContexts(Arc::new(index.pair_to_contexts)),
        );
        ctx.state.insert(
            "contexts_to_pairs",
            Value::ContextPairs(Arc::new(index.contexts_to_pairs)),
        );
        ctx.state.insert(
            "unique_contexts",
            Value::Contexts(Arc::new(index.unique_contexts)),
        );
        Ok(())
    }
}
