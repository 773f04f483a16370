//! Streaming preprocessing filters over SVO files.
//!
//! Every filter reads one SVO file and writes a new one; inputs are never
//! mutated in place. The two-pass filters stream the input twice rather
//! than holding lines in memory.

use crate::error::{PipelineError, PipelineResult};
use crate::svo::reader::{SvoReader, write_triple};
use crate::types::{CategorySet, Pair, Triple};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn open_output(path: &Path) -> PipelineResult<BufWriter<File>> {
    let file = File::create(path).map_err(|e| PipelineError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

fn flush(mut writer: BufWriter<File>, path: &Path) -> PipelineResult<()> {
    writer.flush().map_err(|e| PipelineError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Copy lines whose predicate holds; returns the number kept.
fn copy_filtered<F>(input: &Path, output: &Path, mut keep: F) -> PipelineResult<usize>
where
    F: FnMut(&Triple) -> bool,
{
    let mut writer = open_output(output)?;
    let mut kept = 0;
    for triple in SvoReader::open(input)? {
        let triple = triple?;
        if keep(&triple) {
            write_triple(&mut writer, &triple, output)?;
            kept += 1;
        }
    }
    flush(writer, output)?;
    Ok(kept)
}

/// Keep lines observed at least `min_occurrences` times.
pub fn by_occurrence(input: &Path, output: &Path, min_occurrences: u64) -> PipelineResult<usize> {
    copy_filtered(input, output, |t| t.count >= min_occurrences)
}

/// Keep lines whose verb context appears on at least `min_occurrences`
/// distinct lines. Two passes over the input.
pub fn by_context_occurrence(
    input: &Path,
    output: &Path,
    min_occurrences: u64,
) -> PipelineResult<usize> {
    let mut line_counts: HashMap<String, u64> = HashMap::new();
    for triple in SvoReader::open(input)? {
        *line_counts.entry(triple?.verb).or_insert(0) += 1;
    }

    copy_filtered(input, output, |t| {
        line_counts.get(&t.verb).copied().unwrap_or(0) >= min_occurrences
    })
}

/// Keep lines whose unordered (S, O) pair appears on at least
/// `min_occurrences` distinct lines. Two passes over the input.
pub fn by_pair_occurrence(
    input: &Path,
    output: &Path,
    min_occurrences: u64,
) -> PipelineResult<usize> {
    let mut line_counts: HashMap<Pair, u64> = HashMap::new();
    for triple in SvoReader::open(input)? {
        let triple = triple?;
        let (pair, _) = Pair::canonical(&triple.subject, &triple.object);
        *line_counts.entry(pair).or_insert(0) += 1;
    }

    copy_filtered(input, output, |t| {
        let (pair, _) = Pair::canonical(&t.subject, &t.object);
        line_counts.get(&pair).copied().unwrap_or(0) >= min_occurrences
    })
}

/// Keep lines connecting the two categories: subject in Cat1 and object in
/// Cat2, or the reverse orientation when `reverse` is set.
pub fn by_category(
    input: &Path,
    output: &Path,
    cat1: &CategorySet,
    cat2: &CategorySet,
    reverse: bool,
) -> PipelineResult<usize> {
    copy_filtered(input, output, |t| {
        let left_to_right = cat1.contains(&t.subject) && cat2.contains(&t.object);
        let right_to_left = reverse && cat1.contains(&t.object) && cat2.contains(&t.subject);
        left_to_right || right_to_left
    })
}
