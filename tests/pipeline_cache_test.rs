//! Cache-reuse scenarios: a second run over the same inputs and stage
//! sequence skips every artifact-producing stage and reproduces its
//! outputs through symlinks, while changed stage parameters miss.

use ontext::pipeline::{Pipeline, Stage, StageOutcome};
use ontext::stages::{
    FilterSentencesByOccurrence, MinimumContextOccurrence, SvoToMemory,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CORPUS: &str = "alice\tlikes\trome\t3\n\
                      alice\tvisits\tparis\t2\n\
                      bob\tlikes\tparis\t5\n\
                      bob\thates\tlondon\t1\n\
                      carol\tlikes\trome\t4\n";

fn write_corpus(dir: &Path) -> PathBuf {
    let path = dir.join("input.svo");
    fs::write(&path, CORPUS).unwrap();
    path
}

fn filter_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(FilterSentencesByOccurrence::new(2).unwrap()),
        Box::new(MinimumContextOccurrence::new(2).unwrap()),
        Box::new(SvoToMemory),
    ]
}

#[test]
fn second_run_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let svo = write_corpus(dir.path());
    let cache = dir.path().join("cache");

    let mut first = Pipeline::new(dir.path().join("run1"), filter_stages())
        .with_file("svo", svo.clone())
        .with_cache(&cache, "corpus");
    first.prepare().unwrap();
    let first_reports = first.execute_all().unwrap();
    assert!(
        first_reports
            .iter()
            .all(|r| r.outcome == StageOutcome::Done)
    );

    // The cache now holds one entry per filter stage, keyed by the full
    // execution prefix.
    let mut entries: Vec<String> = fs::read_dir(&cache)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(
        entries,
        vec![
            "corpus.Filter_sentences_by_occurrence_2.Minimum_context_occurrence_2.svo"
                .to_string(),
            "corpus.Filter_sentences_by_occurrence_2.svo".to_string(),
        ]
    );

    let mut second = Pipeline::new(dir.path().join("run2"), filter_stages())
        .with_file("svo", svo)
        .with_cache(&cache, "corpus");
    second.prepare().unwrap();
    let second_reports = second.execute_all().unwrap();

    // File-producing stages are skipped; the in-memory stage reruns.
    assert_eq!(second_reports[0].outcome, StageOutcome::Skipped);
    assert_eq!(second_reports[1].outcome, StageOutcome::Skipped);
    assert_eq!(second_reports[2].outcome, StageOutcome::Done);

    // Byte-identical artifacts on both runs.
    for stage_dir in [
        "Filter_sentences_by_occurrence_2",
        "Minimum_context_occurrence_2",
    ] {
        let a = fs::read(dir.path().join("run1").join(stage_dir).join("svo")).unwrap();
        let b = fs::read(dir.path().join("run2").join(stage_dir).join("svo")).unwrap();
        assert_eq!(a, b, "artifact of {stage_dir} differs between runs");
    }

    // The skipped artifacts arrived as symlinks into the cache.
    let link = dir
        .path()
        .join("run2/Filter_sentences_by_occurrence_2/svo");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());

    // And the data bag is equally populated on the cached run.
    assert_eq!(
        second.state().contexts("unique_contexts").unwrap().as_ref(),
        first.state().contexts("unique_contexts").unwrap().as_ref()
    );
}

#[test]
fn changed_parameters_invalidate_the_cache() {
    let dir = TempDir::new().unwrap();
    let svo = write_corpus(dir.path());
    let cache = dir.path().join("cache");

    let mut first = Pipeline::new(
        dir.path().join("run1"),
        vec![Box::new(FilterSentencesByOccurrence::new(2).unwrap()) as Box<dyn Stage>],
    )
    .with_file("svo", svo.clone())
    .with_cache(&cache, "corpus");
    first.prepare().unwrap();
    first.execute_all().unwrap();

    // Same stage kind, different parameter: different identity, so the
    // prefix-keyed entry cannot match.
    let mut second = Pipeline::new(
        dir.path().join("run2"),
        vec![Box::new(FilterSentencesByOccurrence::new(3).unwrap()) as Box<dyn Stage>],
    )
    .with_file("svo", svo)
    .with_cache(&cache, "corpus");
    second.prepare().unwrap();
    let reports = second.execute_all().unwrap();
    assert_eq!(reports[0].outcome, StageOutcome::Done);
}

#[test]
fn broken_cache_entries_are_healed_into_misses() {
    let dir = TempDir::new().unwrap();
    let svo = write_corpus(dir.path());
    let cache = dir.path().join("cache");
    fs::create_dir_all(&cache).unwrap();

    // Seed the cache with a symlink whose target no longer exists.
    let vanished = dir.path().join("vanished");
    fs::write(&vanished, "stale").unwrap();
    std::os::unix::fs::symlink(
        &vanished,
        cache.join("corpus.Filter_sentences_by_occurrence_2.svo"),
    )
    .unwrap();
    fs::remove_file(&vanished).unwrap();

    let mut pipeline = Pipeline::new(
        dir.path().join("run"),
        vec![Box::new(FilterSentencesByOccurrence::new(2).unwrap()) as Box<dyn Stage>],
    )
    .with_file("svo", svo)
    .with_cache(&cache, "corpus");
    pipeline.prepare().unwrap();
    let reports = pipeline.execute_all().unwrap();

    // The broken entry was discarded and the stage ran for real.
    assert_eq!(reports[0].outcome, StageOutcome::Done);
    let produced =
        fs::read_to_string(dir.path().join("run/Filter_sentences_by_occurrence_2/svo")).unwrap();
    assert_eq!(produced.lines().count(), 4);
}
