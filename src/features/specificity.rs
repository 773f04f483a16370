//! Relation specificity feature.
//!
//! How specific each relation verb is to the category pair: lines where
//! the verb connects Cat1 to Cat2 versus lines where one side falls
//! outside the categories. Counts are per corpus line, not weighted by
//! the sentence count.

use crate::error::PipelineResult;
use crate::features::table::{CellValue, FeatureTable};
use crate::pipeline::{Stage, StageContext, Value};
use crate::svo::SvoReader;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Specificity;

#[derive(Debug, Default, Clone, Copy)]
struct SpecificityCounts {
    cooccurrence: i64,
    cat1_unspecific: i64,
    cat2_unspecific: i64,
    cooccurrence_question: i64,
}

impl Stage for Specificity {
    fn identity(&self) -> String {
        "Specificity".to_string()
    }

    fn required_files(&self) -> Vec<&'static str> {
        vec!["raw_svo"]
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["cat1", "cat2", "relation_names"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["relation_specificity"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let raw_svo = ctx.state.require_file("raw_svo")?.to_path_buf();
        let cat1 = ctx.state.category("cat1")?.clone();
        let cat2 = ctx.state.category("cat2")?.clone();
        let relation_names = ctx.state.names("relation_names")?.clone();

        let mut counters: HashMap<&str, SpecificityCounts> = relation_names
            .iter()
            .map(|name| (name.as_str(), SpecificityCounts::default()))
            .collect();

        for triple in SvoReader::open(&raw_svo)? {
            let triple = triple?;
            let Some(counts) = counters.get_mut(triple.verb.as_str()) else {
                continue;
            };
            if cat1.contains(&triple.subject) {
                if cat2.contains(&triple.object) {
                    counts.cooccurrence += 1;
                } else {
                    counts.cat1_unspecific += 1;
                }
            } else if cat1.contains(&triple.object) {
                if cat2.contains(&triple.subject) {
                    counts.cat2_unspecific += 1;
                } else {
                    counts.cooccurrence_question += 1;
                }
            }
        }

        let mut table = FeatureTable::new("relation", relation_names.as_ref().clone());
        let column = |f: fn(&SpecificityCounts) -> i64| -> Vec<CellValue> {
            relation_names
                .iter()
                .map(|name| {
                    CellValue::Int(counters.get(name.as_str()).map(f).unwrap_or(0))
                })
                .collect()
        };
        table.push_column("cooccurrence_count", column(|c| c.cooccurrence))?;
        table.push_column("cat1_unspecific", column(|c| c.cat1_unspecific))?;
        table.push_column("cat2_unspecific", column(|c| c.cat2_unspecific))?;
        table.push_column(
            "cooccurrence_count_question",
            column(|c| c.cooccurrence_question),
        )?;

        ctx.state
            .insert("relation_specificity", Value::Table(Arc::new(table)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StateBag;
    use crate::types::CategorySet;
    use tempfile::TempDir;

    #[test]
    fn classifies_lines_into_the_four_buckets() {
        let dir = TempDir::new().unwrap();
        let svo = dir.path().join("raw");
        std::fs::write(
            &svo,
            "alice\tlikes\trome\t3\n\
             alice\tlikes\tbob\t1\n\
             rome\tlikes\talice\t1\n\
             bob\tlikes\tchess\t1\n\
             alice\tvisits\trome\t2\n",
        )
        .unwrap();

        let mut state = StateBag::new();
        state.insert_file("raw_svo", svo);
        state.insert(
            "cat1",
            Value::Category(Arc::new(CategorySet::new(
                "people",
                ["alice".to_string(), "bob".to_string()],
            ))),
        );
        state.insert(
            "cat2",
            Value::Category(Arc::new(CategorySet::new(
                "places",
                ["rome".to_string()],
            ))),
        );
        state.insert(
            "relation_names",
            Value::Names(Arc::new(vec!["likes".to_string()])),
        );

        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        Specificity
            .apply(StageContext {
                work_dir: &work,
                state: &mut state,
            })
            .unwrap();

        let table = state.table("relation_specificity").unwrap();
        // alice-likes-rome: both categories.
        assert_eq!(
            table.get("likes", "cooccurrence_count"),
            Some(&CellValue::Int(1))
        );
        // alice-likes-bob and bob-likes-chess: subject in Cat1, object not in Cat2.
        assert_eq!(
            table.get("likes", "cat1_unspecific"),
            Some(&CellValue::Int(2))
        );
        // rome-likes-alice: object in Cat1, subject in Cat2.
        assert_eq!(
            table.get("likes", "cat2_unspecific"),
            Some(&CellValue::Int(1))
        );
        assert_eq!(
            table.get("likes", "cooccurrence_count_question"),
            Some(&CellValue::Int(0))
        );
    }
}
