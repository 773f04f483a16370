//! Preprocessing stages: category loading and the streaming SVO filters.
//!
//! Every filter stage reads the current `svo` artifact and writes a new
//! one into its own working directory; all of them opt into the shared
//! cache since the filtered corpus is the most expensive artifact to
//! recompute.

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{Stage, StageContext, Value};
use crate::svo::filters;
use crate::types::CategorySet;
use std::path::PathBuf;
use std::sync::Arc;

/// Load the two category instance files into the data bag.
pub struct ReadCategories {
    cat1_path: PathBuf,
    cat2_path: PathBuf,
    cat1_name: String,
    cat2_name: String,
}

impl ReadCategories {
    pub fn new(
        cat1_name: impl Into<String>,
        cat1_path: impl Into<PathBuf>,
        cat2_name: impl Into<String>,
        cat2_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cat1_path: cat1_path.into(),
            cat2_path: cat2_path.into(),
            cat1_name: cat1_name.into(),
            cat2_name: cat2_name.into(),
        }
    }
}

impl Stage for ReadCategories {
    fn identity(&self) -> String {
        "Read_categories".to_string()
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["cat1", "cat2"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let cat1 = CategorySet::from_file(&self.cat1_name, &self.cat1_path)?;
        let cat2 = CategorySet::from_file(&self.cat2_name, &self.cat2_path)?;
        tracing::debug!(
            target: "pipeline",
            "Loaded categories {} ({} instances) and {} ({} instances)",
            cat1.name(),
            cat1.len(),
            cat2.name(),
            cat2.len()
        );
        ctx.state.insert("cat1", Value::Category(Arc::new(cat1)));
        ctx.state.insert("cat2", Value::Category(Arc::new(cat2)));
        Ok(())
    }
}

/// Drop lines observed fewer than `min_occurrences` times.
pub struct FilterSentencesByOccurrence {
    min_occurrences: u64,
}

impl FilterSentencesByOccurrence {
    pub fn new(min_occurrences: u64) -> PipelineResult<Self> {
        if min_occurrences == 0 {
            return Err(PipelineError::StageConfig {
                reason: "min_occurrences must be positive".to_string(),
            });
        }
        Ok(Self { min_occurrences })
    }
}

impl Stage for FilterSentencesByOccurrence {
    fn identity(&self) -> String {
        format!("Filter_sentences_by_occurrence_{}", self.min_occurrences)
    }

    fn required_files(&self) -> Vec<&'static str> {
        vec!["svo"]
    }

    fn creates(&self) -> Vec<&'static str> {
        vec!["svo"]
    }

    fn cache(&self) -> bool {
        true
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let input = ctx.state.require_file("svo")?.to_path_buf();
        let output = ctx.work_dir.join("svo");
        let kept = filters::by_occurrence(&input, &output, self.min_occurrences)?;
        tracing::debug!(target: "pipeline", "Kept {kept} lines");
        Ok(())
    }
}

/// Drop lines whose verb context appears on too few distinct lines.
pub struct MinimumContextOccurrence {
    min_occurrences: u64,
}

impl MinimumContextOccurrence {
    pub fn new(min_occurrences: u64) -> PipelineResult<Self> {
        if min_occurrences == 0 {
            return Err(PipelineError::StageConfig {
                reason: "min_occurrences must be positive".to_string(),
            });
        }
        Ok(Self { min_occurrences })
    }
}

impl Stage for MinimumContextOccurrence {
    fn identity(&self) -> String {
        format!("Minimum_context_occurrence_{}", self.min_occurrences)
    }

    fn required_files(&self) -> Vec<&'static str> {
        vec!["svo"]
    }

    fn creates(&self) -> Vec<&'static str> {
        vec!["svo"]
    }

    fn cache(&self) -> bool {
        true
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let input = ctx.state.require_file("svo")?.to_path_buf();
        let output = ctx.work_dir.join("svo");
        let kept = filters::by_context_occurrence(&input, &output, self.min_occurrences)?;
        tracing::debug!(target: "pipeline", "Kept {kept} lines");
        Ok(())
    }
}

/// Drop lines whose unordered (S, O) pair appears on too few lines.
///
/// A pair needs at least two shared lines before its contexts can
/// co-occur, hence the floor of 2 on the parameter.
pub struct MinimumPairOccurrence {
    min_occurrences: u64,
}

impl MinimumPairOccurrence {
    pub fn new(min_occurrences: u64) -> PipelineResult<Self> {
        if min_occurrences < 2 {
            return Err(PipelineError::StageConfig {
                reason: "min_occurrences must be at least 2 for pair filtering".to_string(),
            });
        }
        Ok(Self { min_occurrences })
    }
}

impl Stage for MinimumPairOccurrence {
    fn identity(&self) -> String {
        format!("Minimum_pair_occurrence_{}", self.min_occurrences)
    }

    fn required_files(&self) -> Vec<&'static str> {
        vec!["svo"]
    }

    fn creates(&self) -> Vec<&'static str> {
        vec!["svo"]
    }

    fn cache(&self) -> bool {
        true
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let input = ctx.state.require_file("svo")?.to_path_buf();
        let output = ctx.work_dir.join("svo");
        let kept = filters::by_pair_occurrence(&input, &output, self.min_occurrences)?;
        tracing::debug!(target: "pipeline", "Kept {kept} lines");
        Ok(())
    }
}

/// Keep only lines connecting the two categories.
pub struct FilterInstanceInCategory {
    reverse: bool,
}

impl FilterInstanceInCategory {
    pub fn new(reverse: bool) -> Self {
        Self { reverse }
    }
}

impl Stage for FilterInstanceInCategory {
    fn identity(&self) -> String {
        if self.reverse {
            "Filter_instance_in_category".to_string()
        } else {
            "Filter_instance_in_category_oneway".to_string()
        }
    }

    fn required_files(&self) -> Vec<&'static str> {
        vec!["svo"]
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["cat1", "cat2"]
    }

    fn creates(&self) -> Vec<&'static str> {
        vec!["svo"]
    }

    fn cache(&self) -> bool {
        true
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let input = ctx.state.require_file("svo")?.to_path_buf();
        let cat1 = ctx.state.category("cat1")?.clone();
        let cat2 = ctx.state.category("cat2")?.clone();
        let output = ctx.work_dir.join("svo");
        let kept = filters::by_category(&input, &output, &cat1, &cat2, self.reverse)?;
        tracing::debug!(target: "pipeline", "Kept {kept} lines");
        Ok(())
    }
}
