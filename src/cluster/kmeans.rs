//! K-means over the normalized co-occurrence rows.
//!
//! Deterministic by construction: k-means++ seeding runs on a pinned RNG,
//! assignment ties go to the smallest cluster index, and the refinement
//! loop stops at a fixed iteration cap. Requesting more clusters than
//! there are rows silently clamps to the row count.

use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use rayon::prelude::*;

/// Result of one k-means fit.
#[derive(Debug)]
pub struct KMeansFit {
    /// Cluster id per row.
    pub groups: Vec<i64>,
    /// One centroid per cluster (k rows).
    pub centroids: Array2<f64>,
    /// Per cluster, the row closest to its centroid.
    pub medoids: Vec<usize>,
}

impl KMeansFit {
    pub fn cluster_count(&self) -> usize {
        self.centroids.nrows()
    }
}

fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// K-means++ seeding on a pinned RNG.
///
/// Rows already chosen carry zero mass and cannot be drawn twice; when all
/// remaining mass is zero (duplicate rows), the smallest unchosen index is
/// taken instead.
fn seed_centers(data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Vec<usize> {
    let n = data.nrows();
    let mut centers = vec![rng.random_range(0..n)];
    let mut distances: Vec<f64> = (0..n)
        .map(|i| squared_distance(&data.row(i), &data.row(centers[0])))
        .collect();

    while centers.len() < k {
        let total: f64 = distances.iter().sum();
        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (i, &mass) in distances.iter().enumerate() {
                if mass <= 0.0 {
                    continue;
                }
                cumulative += mass;
                if cumulative >= target {
                    chosen = Some(i);
                    break;
                }
            }
            chosen.unwrap_or_else(|| {
                // Float round-off can leave the walk just short of total.
                distances
                    .iter()
                    .rposition(|&mass| mass > 0.0)
                    .unwrap_or(0)
            })
        } else {
            (0..n).find(|i| !centers.contains(i)).unwrap_or(0)
        };

        centers.push(next);
        for i in 0..n {
            let d = squared_distance(&data.row(i), &data.row(next));
            if d < distances[i] {
                distances[i] = d;
            }
        }
    }

    centers
}

/// Nearest centroid per row; ties go to the smallest cluster index.
fn assign(data: &Array2<f64>, centroids: &Array2<f64>) -> Vec<i64> {
    (0..data.nrows())
        .into_par_iter()
        .map(|i| {
            let row = data.row(i);
            let mut best = 0usize;
            let mut best_distance = f64::INFINITY;
            for (c, centroid) in centroids.rows().into_iter().enumerate() {
                let d = squared_distance(&row, &centroid);
                if d < best_distance {
                    best_distance = d;
                    best = c;
                }
            }
            best as i64
        })
        .collect()
}

/// Fit k clusters to the rows of `data`.
pub fn fit(data: &Array2<f64>, k: usize, seed: u64, max_iterations: usize) -> KMeansFit {
    let n = data.nrows();
    let dims = data.ncols();
    if n == 0 || k == 0 {
        return KMeansFit {
            groups: Vec::new(),
            centroids: Array2::zeros((0, dims)),
            medoids: Vec::new(),
        };
    }
    let k = k.min(n);

    let mut rng = StdRng::seed_from_u64(seed);
    let centers = seed_centers(data, k, &mut rng);
    let mut centroids = Array2::zeros((k, dims));
    for (c, &row) in centers.iter().enumerate() {
        centroids.row_mut(c).assign(&data.row(row));
    }

    let mut groups = assign(data, &centroids);
    for _ in 0..max_iterations {
        // Recompute centroids as member means; empty clusters keep their
        // previous centroid.
        let mut sums = Array2::<f64>::zeros((k, dims));
        let mut sizes = vec![0usize; k];
        for (i, &g) in groups.iter().enumerate() {
            let mut sum_row = sums.row_mut(g as usize);
            sum_row += &data.row(i);
            sizes[g as usize] += 1;
        }
        for c in 0..k {
            if sizes[c] > 0 {
                let mut centroid = centroids.row_mut(c);
                centroid.assign(&sums.row(c));
                centroid.mapv_inplace(|x| x / sizes[c] as f64);
            }
        }

        let next = assign(data, &centroids);
        if next == groups {
            break;
        }
        groups = next;
    }

    // Medoid per cluster: the row nearest its centroid, over all rows
    // (smallest index wins ties).
    let medoids = centroids
        .axis_iter(Axis(0))
        .map(|centroid| {
            let mut best = 0usize;
            let mut best_distance = f64::INFINITY;
            for i in 0..n {
                let d = squared_distance(&data.row(i), &centroid);
                if d < best_distance {
                    best_distance = d;
                    best = i;
                }
            }
            best
        })
        .collect();

    KMeansFit {
        groups,
        centroids,
        medoids,
    }
}
