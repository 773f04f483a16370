//! Dense verb-by-verb co-occurrence matrix.
//!
//! Two contexts co-occur when they appear against the same unordered
//! (S, O) pair. Every combination-with-replacement drawn from a pair's
//! context list adds 1 to both `[i, j]` and `[j, i]`, so the matrix is
//! symmetric and its diagonal is even; row normalization cancels the
//! double counting for downstream consumers.

use crate::error::{PipelineError, PipelineResult};
use crate::types::PairContexts;
use ndarray::Array2;
use std::collections::HashMap;

/// Build the unnormalized co-occurrence matrix.
///
/// Index order follows `unique_contexts`. Fails when the context count
/// exceeds `max_contexts` (the matrix is quadratic in it).
pub fn build(
    pair_to_contexts: &PairContexts,
    unique_contexts: &[String],
    max_contexts: usize,
) -> PipelineResult<Array2<f64>> {
    let n = unique_contexts.len();
    if n > max_contexts {
        return Err(PipelineError::ContextCap {
            count: n,
            cap: max_contexts,
        });
    }

    let id_of: HashMap<&str, usize> = unique_contexts
        .iter()
        .enumerate()
        .map(|(i, v)| (v.as_str(), i))
        .collect();

    let mut matrix = Array2::<f64>::zeros((n, n));
    for contexts in pair_to_contexts.values() {
        let ids = contexts
            .iter()
            .map(|occurrence| {
                id_of.get(occurrence.verb.as_str()).copied().ok_or_else(|| {
                    PipelineError::Arithmetic {
                        reason: format!(
                            "context '{}' is missing from the unique context table",
                            occurrence.verb
                        ),
                    }
                })
            })
            .collect::<PipelineResult<Vec<usize>>>()?;

        for (position, &v1) in ids.iter().enumerate() {
            for &v2 in &ids[position..] {
                matrix[[v1, v2]] += 1.0;
                matrix[[v2, v1]] += 1.0;
            }
        }
    }

    Ok(matrix)
}

/// Normalize each row to sum to 1. All-zero rows are left untouched.
pub fn normalize_rows(matrix: &mut Array2<f64>) {
    for mut row in matrix.rows_mut() {
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|x| x / sum);
        }
    }
}
