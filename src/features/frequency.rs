//! Instance frequency feature.
//!
//! How common the category instances are in the raw corpus, on average.
//! Uses the unfiltered SVO because it does not require both S and O to
//! belong to the categories.

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{Stage, StageContext, Value};
use crate::svo::SvoReader;
use crate::types::CategorySet;
use indexmap::IndexMap;
use std::path::Path;

pub struct InstanceFrequencyCount;

fn count_instances(svo: &Path, instances: &CategorySet) -> PipelineResult<IndexMap<String, u64>> {
    let mut counter: IndexMap<String, u64> = IndexMap::new();
    for triple in SvoReader::open(svo)? {
        let triple = triple?;
        if instances.contains(&triple.subject) {
            *counter.entry(triple.subject.clone()).or_insert(0) += triple.count;
        }
        if instances.contains(&triple.object) {
            *counter.entry(triple.object.clone()).or_insert(0) += triple.count;
        }
    }
    Ok(counter)
}

/// Write the per-instance CSV and return the mean normalized frequency.
fn persist(path: &Path, frequencies: &IndexMap<String, u64>) -> PipelineResult<f64> {
    let file = std::fs::File::create(path).map_err(|e| PipelineError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    let to_error = |e: csv::Error| PipelineError::FileWrite {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    };

    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(["instance", "frequency", "normalized"])
        .map_err(to_error)?;

    let maximum = frequencies.values().copied().max().unwrap_or(0) as f64;
    let mut normalized_sum = 0.0;
    for (instance, &frequency) in frequencies {
        let normalized = if maximum > 0.0 {
            frequency as f64 / maximum
        } else {
            0.0
        };
        normalized_sum += normalized;
        writer
            .write_record(&[
                instance.clone(),
                frequency.to_string(),
                normalized.to_string(),
            ])
            .map_err(to_error)?;
    }
    writer.flush().map_err(|e| PipelineError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    if frequencies.is_empty() {
        Ok(0.0)
    } else {
        Ok(normalized_sum / frequencies.len() as f64)
    }
}

impl Stage for InstanceFrequencyCount {
    fn identity(&self) -> String {
        "Instance_frequency_count".to_string()
    }

    fn required_files(&self) -> Vec<&'static str> {
        vec!["raw_svo"]
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["cat1", "cat2"]
    }

    fn creates(&self) -> Vec<&'static str> {
        vec!["instance_frequency_cat1", "instance_frequency_cat2"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec![
            "mean_instance_frequency_cat1",
            "mean_instance_frequency_cat2",
        ]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let raw_svo = ctx.state.require_file("raw_svo")?.to_path_buf();
        let cat1 = ctx.state.category("cat1")?.clone();
        let cat2 = ctx.state.category("cat2")?.clone();

        let frequencies1 = count_instances(&raw_svo, &cat1)?;
        let frequencies2 = count_instances(&raw_svo, &cat2)?;

        let mean1 = persist(&ctx.work_dir.join("instance_frequency_cat1"), &frequencies1)?;
        let mean2 = persist(&ctx.work_dir.join("instance_frequency_cat2"), &frequencies2)?;

        ctx.state
            .insert("mean_instance_frequency_cat1", Value::Scalar(mean1));
        ctx.state
            .insert("mean_instance_frequency_cat2", Value::Scalar(mean2));
        Ok(())
    }
}
