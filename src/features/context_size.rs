//! Cluster size feature: how many contexts express each relation.

use crate::error::PipelineResult;
use crate::features::table::{CellValue, FeatureTable};
use crate::pipeline::{Stage, StageContext, Value};
use std::sync::Arc;

pub struct PatternContextSize;

impl Stage for PatternContextSize {
    fn identity(&self) -> String {
        "Pattern_context_size".to_string()
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["relation_names", "groups"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["pattern_context_size"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let relation_names = ctx.state.names("relation_names")?.clone();
        let groups = ctx.state.groups("groups")?.clone();

        let mut sizes = vec![0i64; relation_names.len()];
        for &group in groups.iter() {
            if group >= 0 && (group as usize) < sizes.len() {
                sizes[group as usize] += 1;
            }
        }

        let mut table = FeatureTable::new("relation", relation_names.as_ref().clone());
        table.push_column(
            "pattern_context_size",
            sizes.into_iter().map(CellValue::Int).collect(),
        )?;

        ctx.state
            .insert("pattern_context_size", Value::Table(Arc::new(table)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StateBag;

    #[test]
    fn counts_cluster_members_and_ignores_pruned_contexts() {
        let mut state = StateBag::new();
        state.insert(
            "relation_names",
            Value::Names(Arc::new(vec!["likes".into(), "visits".into()])),
        );
        state.insert("groups", Value::Groups(Arc::new(vec![0, 0, 1, -1, 0])));

        let dir = tempfile::tempdir().unwrap();
        PatternContextSize
            .apply(StageContext {
                work_dir: dir.path(),
                state: &mut state,
            })
            .unwrap();

        let table = state.table("pattern_context_size").unwrap();
        assert_eq!(
            table.get("likes", "pattern_context_size"),
            Some(&CellValue::Int(3))
        );
        assert_eq!(
            table.get("visits", "pattern_context_size"),
            Some(&CellValue::Int(1))
        );
    }
}
