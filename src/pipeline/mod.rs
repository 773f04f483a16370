//! Staged dataflow engine.
//!
//! A pipeline is an ordered list of heterogeneous stages sharing a typed
//! state bag. Each stage owns a working directory under the pipeline's
//! output root; file artifacts it declares are registered in the bag and,
//! when the stage opts in, linked into a shared cache keyed by the exact
//! sequence of stage identities executed so far.
//!
//! ```text
//! prepare    -> fresh working dirs + cache symlinks for known artifacts
//! execute(i) -> skip if artifacts already present, else validate + apply
//! publish    -> register artifacts, extend the execution prefix, cache
//! ```
//!
//! Execution is strictly sequential; the first failing stage aborts the
//! pipeline (the driver isolates failures per category pair).

pub mod cache;
pub mod stage;
pub mod state;

pub use cache::ArtifactCache;
pub use stage::{Stage, StageContext};
pub use state::{StateBag, Value};

use crate::error::{PipelineError, PipelineResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How a stage finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Ran `apply` to completion.
    Done,
    /// All declared artifacts were already in the working directory.
    Skipped,
}

/// Per-stage execution record.
#[derive(Debug)]
pub struct StageReport {
    pub identity: String,
    pub outcome: StageOutcome,
    pub elapsed: Duration,
}

pub struct Pipeline {
    output_dir: PathBuf,
    cache: Option<ArtifactCache>,
    prefix: String,
    stages: Vec<Box<dyn Stage>>,
    executed: Vec<String>,
    next: usize,
    state: StateBag,
}

impl Pipeline {
    pub fn new(output_dir: impl Into<PathBuf>, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            output_dir: output_dir.into(),
            cache: None,
            prefix: String::new(),
            stages,
            executed: Vec::new(),
            next: 0,
            state: StateBag::new(),
        }
    }

    /// Attach a shared artifact cache. The prefix identifies the corpus the
    /// artifacts were derived from.
    pub fn with_cache(mut self, dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        self.cache = Some(ArtifactCache::new(dir.into()));
        self.prefix = prefix.into();
        self
    }

    /// Seed an input file before the first stage runs.
    pub fn with_file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.state.insert_file(name, path.into());
        self
    }

    /// Seed a data value before the first stage runs.
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state.insert(key, value);
        self
    }

    pub fn state(&self) -> &StateBag {
        &self.state
    }

    pub fn into_state(self) -> StateBag {
        self.state
    }

    /// Identities of the stages executed so far, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn steps_pending(&self) -> usize {
        self.stages.len() - self.next
    }

    fn work_dir(&self, identity: &str) -> PathBuf {
        self.output_dir.join(identity)
    }

    /// Create fresh working directories and pre-populate them from the
    /// cache.
    ///
    /// For every artifact a stage declares, the expected cache entry is
    /// keyed by the identities of all stages up to and including that
    /// stage; a hit becomes a symlink in the stage's working directory, so
    /// execution can later skip the stage entirely.
    pub fn prepare(&mut self) -> PipelineResult<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| PipelineError::FileWrite {
            path: self.output_dir.clone(),
            source: e,
        })?;
        if let Some(cache) = &self.cache {
            fs::create_dir_all(cache.dir()).map_err(|e| PipelineError::FileWrite {
                path: cache.dir().to_path_buf(),
                source: e,
            })?;
        }

        let mut prefix_stages: Vec<String> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let identity = stage.identity();
            let dir = self.work_dir(&identity);
            if dir.exists() {
                tracing::warn!(
                    target: "pipeline",
                    "Removing stale working directory '{}'",
                    dir.display()
                );
                fs::remove_dir_all(&dir).map_err(|e| PipelineError::FileWrite {
                    path: dir.clone(),
                    source: e,
                })?;
            }
            fs::create_dir_all(&dir).map_err(|e| PipelineError::FileWrite {
                path: dir.clone(),
                source: e,
            })?;

            prefix_stages.push(identity);
            if let Some(cache) = &self.cache {
                for artifact in stage.creates() {
                    let name = ArtifactCache::entry_name(&self.prefix, &prefix_stages, artifact);
                    if let Some(source) = cache.lookup(&name)? {
                        let link = dir.join(artifact);
                        std::os::unix::fs::symlink(&source, &link).map_err(|e| {
                            PipelineError::Cache {
                                path: link,
                                reason: format!("failed to link cached artifact: {e}"),
                            }
                        })?;
                        tracing::debug!(
                            target: "pipeline",
                            "Cache hit for '{name}'"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Execute the next stage and report how it finished.
    pub fn execute_next(&mut self) -> PipelineResult<StageReport> {
        let stage = self.stages.get(self.next).ok_or_else(|| {
            PipelineError::Arithmetic {
                reason: "no stages left to execute".to_string(),
            }
        })?;
        let identity = stage.identity();
        let dir = self.work_dir(&identity);
        let creates = stage.creates();
        let start = Instant::now();

        // A stage whose only contract is file artifacts can be satisfied
        // from cache links alone; anything publishing data must run.
        let skippable = !creates.is_empty() && stage.returns().is_empty();
        let present = count_entries(&dir)?;

        let outcome = if skippable && present >= creates.len() {
            StageOutcome::Skipped
        } else {
            for name in stage.required_files() {
                if !self.state.contains_file(name) {
                    return Err(PipelineError::MissingFile {
                        stage: identity,
                        name: name.to_string(),
                    });
                }
            }
            for name in stage.required_data() {
                if !self.state.contains_data(name) {
                    return Err(PipelineError::MissingData {
                        stage: identity,
                        name: name.to_string(),
                    });
                }
            }
            stage.apply(StageContext {
                work_dir: &dir,
                state: &mut self.state,
            })?;
            StageOutcome::Done
        };

        for artifact in &creates {
            self.state.insert_file(*artifact, dir.join(artifact));
        }
        self.executed.push(identity.clone());
        self.next += 1;

        if outcome == StageOutcome::Done
            && stage.cache()
            && let Some(cache) = &self.cache
        {
            for artifact in &creates {
                let name = ArtifactCache::entry_name(&self.prefix, &self.executed, artifact);
                cache.publish(&name, &dir.join(artifact))?;
            }
        }

        Ok(StageReport {
            identity,
            outcome,
            elapsed: start.elapsed(),
        })
    }

    /// Run every remaining stage in order, aborting on the first failure.
    pub fn execute_all(&mut self) -> PipelineResult<Vec<StageReport>> {
        let mut reports = Vec::with_capacity(self.steps_pending());
        while self.steps_pending() > 0 {
            let report = self.execute_next()?;
            tracing::info!(
                target: "pipeline",
                "{} {} in {:?}",
                report.identity,
                match report.outcome {
                    StageOutcome::Done => "done",
                    StageOutcome::Skipped => "skipped",
                },
                report.elapsed
            );
            reports.push(report);
        }
        Ok(reports)
    }
}

fn count_entries(dir: &Path) -> PipelineResult<usize> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::FileRead {
        path: dir.to_path_buf(),
        source: e,
    })?;
    Ok(entries.count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Copies its input file to its output, counting invocations.
    struct CopyStage {
        name: &'static str,
        runs: Arc<AtomicUsize>,
    }

    impl Stage for CopyStage {
        fn identity(&self) -> String {
            self.name.to_string()
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
            self.runs.fetch_add(1, Ordering::SeqCst);
            let input = ctx.state.require_file("svo")?.to_path_buf();
            let output = ctx.work_dir.join("svo");
            fs::copy(&input, &output).map_err(|e| PipelineError::FileWrite {
                path: output,
                source: e,
            })?;
            Ok(())
        }
    }

    /// Publishes a count into the data bag; must never be skipped.
    struct CountStage {
        runs: Arc<AtomicUsize>,
    }

    impl Stage for CountStage {
        fn identity(&self) -> String {
            "Count_lines".to_string()
        }
        fn required_files(&self) -> Vec<&'static str> {
            vec!["svo"]
        }
        fn returns(&self) -> Vec<&'static str> {
            vec!["line_count"]
        }
        fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let path = ctx.state.require_file("svo")?;
            let text = fs::read_to_string(path).map_err(|e| PipelineError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            ctx.state.insert("line_count", Value::Count(text.lines().count()));
            Ok(())
        }
    }

    struct FailingStage;

    impl Stage for FailingStage {
        fn identity(&self) -> String {
            "Always_fails".to_string()
        }
        fn apply(&self, _ctx: StageContext<'_>) -> PipelineResult<()> {
            Err(PipelineError::Arithmetic {
                reason: "intentional".to_string(),
            })
        }
    }

    fn seed_svo(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("input.svo");
        fs::write(&path, "a\tv\tb\t1\nc\tw\td\t2\n").unwrap();
        path
    }

    #[test]
    fn prepare_creates_one_directory_per_stage() {
        let dir = TempDir::new().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new(
            dir.path().join("out"),
            vec![
                Box::new(CopyStage { name: "Copy_a", runs: runs.clone() }),
                Box::new(CopyStage { name: "Copy_b", runs }),
            ],
        );
        pipeline.prepare().unwrap();
        assert!(dir.path().join("out/Copy_a").is_dir());
        assert!(dir.path().join("out/Copy_b").is_dir());
    }

    #[test]
    fn executes_all_stages_exactly_once() {
        let dir = TempDir::new().unwrap();
        let svo = seed_svo(&dir);
        let copy_runs = Arc::new(AtomicUsize::new(0));
        let count_runs = Arc::new(AtomicUsize::new(0));

        let mut pipeline = Pipeline::new(
            dir.path().join("out"),
            vec![
                Box::new(CopyStage { name: "Copy_a", runs: copy_runs.clone() }),
                Box::new(CountStage { runs: count_runs.clone() }),
            ],
        )
        .with_file("svo", svo);

        pipeline.prepare().unwrap();
        let reports = pipeline.execute_all().unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.outcome == StageOutcome::Done));
        assert_eq!(pipeline.executed(), ["Copy_a", "Count_lines"]);
        assert_eq!(copy_runs.load(Ordering::SeqCst), 1);
        assert_eq!(count_runs.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.state().count("line_count").unwrap(), 2);
    }

    #[test]
    fn second_run_skips_cached_file_stages_but_reruns_data_stages() {
        let dir = TempDir::new().unwrap();
        let svo = seed_svo(&dir);
        let cache_dir = dir.path().join("cache");

        let first_runs = Arc::new(AtomicUsize::new(0));
        let mut first = Pipeline::new(
            dir.path().join("run1"),
            vec![
                Box::new(CopyStage { name: "Copy_a", runs: first_runs.clone() }),
                Box::new(CountStage { runs: Arc::new(AtomicUsize::new(0)) }),
            ],
        )
        .with_file("svo", svo.clone())
        .with_cache(&cache_dir, "corpus");
        first.prepare().unwrap();
        first.execute_all().unwrap();
        assert_eq!(first_runs.load(Ordering::SeqCst), 1);

        let second_runs = Arc::new(AtomicUsize::new(0));
        let count_runs = Arc::new(AtomicUsize::new(0));
        let mut second = Pipeline::new(
            dir.path().join("run2"),
            vec![
                Box::new(CopyStage { name: "Copy_a", runs: second_runs.clone() }),
                Box::new(CountStage { runs: count_runs.clone() }),
            ],
        )
        .with_file("svo", svo)
        .with_cache(&cache_dir, "corpus");
        second.prepare().unwrap();
        let reports = second.execute_all().unwrap();

        assert_eq!(reports[0].outcome, StageOutcome::Skipped);
        assert_eq!(second_runs.load(Ordering::SeqCst), 0);
        // Data-returning stages always run: skipping cannot fill the bag.
        assert_eq!(reports[1].outcome, StageOutcome::Done);
        assert_eq!(count_runs.load(Ordering::SeqCst), 1);
        assert_eq!(second.state().count("line_count").unwrap(), 2);

        // The skipped stage's artifact is byte-identical via the cache link.
        let linked = fs::read_to_string(dir.path().join("run2/Copy_a/svo")).unwrap();
        assert_eq!(linked, "a\tv\tb\t1\nc\tw\td\t2\n");
    }

    #[test]
    fn missing_dependency_names_the_stage_and_input() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = Pipeline::new(
            dir.path().join("out"),
            vec![Box::new(CopyStage {
                name: "Copy_a",
                runs: Arc::new(AtomicUsize::new(0)),
            })],
        );
        pipeline.prepare().unwrap();

        match pipeline.execute_all().unwrap_err() {
            PipelineError::MissingFile { stage, name } => {
                assert_eq!(stage, "Copy_a");
                assert_eq!(name, "svo");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn failure_aborts_without_requeue() {
        let dir = TempDir::new().unwrap();
        let svo = seed_svo(&dir);
        let mut pipeline = Pipeline::new(
            dir.path().join("out"),
            vec![
                Box::new(FailingStage),
                Box::new(CountStage { runs: Arc::new(AtomicUsize::new(0)) }),
            ],
        )
        .with_file("svo", svo);
        pipeline.prepare().unwrap();

        assert!(pipeline.execute_all().is_err());
        assert!(pipeline.executed().is_empty());
        assert_eq!(pipeline.steps_pending(), 2);
    }

    #[test]
    fn reordering_stages_changes_cache_keys() {
        let executed_ab = vec!["A".to_string(), "B".to_string()];
        let executed_ba = vec!["B".to_string(), "A".to_string()];
        assert_ne!(
            ArtifactCache::entry_name("p", &executed_ab, "svo"),
            ArtifactCache::entry_name("p", &executed_ba, "svo")
        );
    }
}
