//! Matrix-path clustering stages: co-occurrence matrix, normalization,
//! k-means, instance ranking and evidence promotion.

use crate::cluster::{kmeans, matrix};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{Stage, StageContext, Value};
use crate::types::Pair;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::sync::Arc;

/// Build the dense verb-by-verb co-occurrence matrix.
pub struct BuildCooccurrenceMatrix {
    max_contexts: usize,
}

impl BuildCooccurrenceMatrix {
    pub fn new(max_contexts: usize) -> Self {
        Self { max_contexts }
    }
}

impl Stage for BuildCooccurrenceMatrix {
    fn identity(&self) -> String {
        "Build_cooccurrence_matrix".to_string()
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["pair_to_contexts", "unique_contexts"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["comatrix"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let pairs = ctx.state.pair_contexts("pair_to_contexts")?.clone();
        let contexts = ctx.state.contexts("unique_contexts")?.clone();
        let comatrix = matrix::build(&pairs, &contexts, self.max_contexts)?;
        ctx.state.insert("comatrix", Value::Matrix(Arc::new(comatrix)));
        Ok(())
    }
}

/// Row-normalize the co-occurrence matrix in the data bag.
pub struct NormalizeMatrix;

impl Stage for NormalizeMatrix {
    fn identity(&self) -> String {
        "Normalize_matrix".to_string()
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["comatrix"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["comatrix"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let mut comatrix = ctx.state.matrix("comatrix")?.as_ref().clone();
        matrix::normalize_rows(&mut comatrix);
        ctx.state.insert("comatrix", Value::Matrix(Arc::new(comatrix)));
        Ok(())
    }
}

/// Cluster the normalized rows and name each cluster by its medoid.
pub struct OntextKmeans {
    k: usize,
    seed: u64,
    max_iterations: usize,
}

impl OntextKmeans {
    pub fn new(k: usize, seed: u64, max_iterations: usize) -> Self {
        Self {
            k,
            seed,
            max_iterations,
        }
    }
}

impl Stage for OntextKmeans {
    fn identity(&self) -> String {
        format!("Ontext_kmeans_{}", self.k)
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["comatrix", "unique_contexts"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec![
            "groups",
            "centroids",
            "medoids",
            "relation_names",
            "relation_count",
        ]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let comatrix = ctx.state.matrix("comatrix")?.clone();
        let contexts = ctx.state.contexts("unique_contexts")?.clone();

        let fit = kmeans::fit(&comatrix, self.k, self.seed, self.max_iterations);
        let relation_names: Vec<String> = fit
            .medoids
            .iter()
            .map(|&medoid| contexts[medoid].clone())
            .collect();
        let relation_count = fit.cluster_count();
        tracing::debug!(
            target: "pipeline",
            "k-means produced {relation_count} clusters: {relation_names:?}"
        );

        ctx.state.insert("groups", Value::Groups(Arc::new(fit.groups)));
        ctx.state
            .insert("centroids", Value::Matrix(Arc::new(fit.centroids)));
        ctx.state.insert("medoids", Value::Medoids(Arc::new(fit.medoids)));
        ctx.state
            .insert("relation_names", Value::Names(Arc::new(relation_names)));
        ctx.state.insert("relation_count", Value::Count(relation_count));
        Ok(())
    }
}

/// Score every (S, O) pair against each cluster.
///
/// A context votes for the pairs it was observed with; the vote for a
/// pair observed `n` times under context `v` in cluster `k` is
/// `n / (1 + sigma)` with `sigma` the population standard deviation of
/// `row(v) - centroid(k)`. Tight cluster members therefore weigh more.
pub struct InstanceRanker;

impl Stage for InstanceRanker {
    fn identity(&self) -> String {
        "Instance_ranker".to_string()
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec![
            "contexts_to_pairs",
            "groups",
            "comatrix",
            "relation_count",
            "unique_contexts",
            "centroids",
        ]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["instances_scores"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let context_pairs = ctx.state.context_pairs("contexts_to_pairs")?.clone();
        let groups = ctx.state.groups("groups")?.clone();
        let comatrix = ctx.state.matrix("comatrix")?.clone();
        let centroids = ctx.state.matrix("centroids")?.clone();
        let contexts = ctx.state.contexts("unique_contexts")?.clone();
        let relation_count = ctx.state.count("relation_count")?;

        let row_of = |verb: &str| -> Option<usize> {
            contexts.binary_search_by(|v| v.as_str().cmp(verb)).ok()
        };

        let mut scores: Vec<IndexMap<Pair, f64>> = Vec::with_capacity(relation_count);
        for group_id in 0..relation_count {
            let centroid = centroids.row(group_id);
            let mut group_scores: IndexMap<Pair, f64> = IndexMap::new();

            for (verb, occurrences) in context_pairs.iter() {
                let Some(row_index) = row_of(verb) else {
                    continue;
                };
                if groups[row_index] != group_id as i64 {
                    continue;
                }

                let difference = &comatrix.row(row_index) - &centroid;
                let mean = difference.mean().unwrap_or(0.0);
                let variance = difference
                    .iter()
                    .map(|x| (x - mean) * (x - mean))
                    .sum::<f64>()
                    / difference.len().max(1) as f64;
                let sigma = variance.sqrt();

                for (pair, n) in occurrences {
                    *group_scores.entry(pair.clone()).or_insert(0.0) +=
                        *n as f64 / (1.0 + sigma);
                }
            }
            scores.push(group_scores);
        }

        ctx.state
            .insert("instances_scores", Value::Scores(Arc::new(scores)));
        Ok(())
    }
}

/// Sort each cluster's scored pairs and keep the top P as promoted
/// evidence, reconstructing the observed sentences for each.
pub struct EvidenceForPromotion {
    promoted_instances: usize,
}

impl EvidenceForPromotion {
    pub fn new(promoted_instances: usize) -> Self {
        Self { promoted_instances }
    }
}

/// Score-descending with pair-ascending tie-break; shared by both
/// clustering paths so promoted lists stay comparable.
pub fn sort_scored_pairs(scored: &mut [(Pair, f64)]) {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

impl Stage for EvidenceForPromotion {
    fn identity(&self) -> String {
        format!("Evidence_for_promotion_{}", self.promoted_instances)
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["instances_scores", "pair_to_contexts", "relation_count"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["promoted_pairs", "group_pairs", "evidence_sentences"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let scores = ctx.state.scores("instances_scores")?.clone();
        let pair_contexts = ctx.state.pair_contexts("pair_to_contexts")?.clone();
        let relation_count = ctx.state.count("relation_count")?;
        if scores.len() != relation_count {
            return Err(PipelineError::Arithmetic {
                reason: format!(
                    "instance scores cover {} clusters, expected {relation_count}",
                    scores.len()
                ),
            });
        }

        let mut group_pairs: Vec<Vec<Pair>> = Vec::with_capacity(relation_count);
        let mut promoted_pairs: Vec<Vec<Pair>> = Vec::with_capacity(relation_count);
        let mut evidence: Vec<Vec<String>> = Vec::with_capacity(relation_count);

        for group_scores in scores.iter() {
            let mut scored: Vec<(Pair, f64)> = group_scores
                .iter()
                .map(|(pair, score)| (pair.clone(), *score))
                .collect();
            sort_scored_pairs(&mut scored);

            let ordered: Vec<Pair> = scored.into_iter().map(|(pair, _)| pair).collect();
            let promoted: Vec<Pair> = ordered
                .iter()
                .take(self.promoted_instances)
                .cloned()
                .collect();

            let mut sentences = Vec::new();
            for pair in &promoted {
                if let Some(occurrences) = pair_contexts.get(pair) {
                    for occurrence in occurrences {
                        let (s, o) = if occurrence.is_forward {
                            (&pair.0, &pair.1)
                        } else {
                            (&pair.1, &pair.0)
                        };
                        sentences.push(format!("{s} {} {o}", occurrence.verb));
                    }
                }
            }

            group_pairs.push(ordered);
            promoted_pairs.push(promoted);
            evidence.push(sentences);
        }

        ctx.state
            .insert("promoted_pairs", Value::PairLists(Arc::new(promoted_pairs)));
        ctx.state
            .insert("group_pairs", Value::PairLists(Arc::new(group_pairs)));
        ctx.state
            .insert("evidence_sentences", Value::Sentences(Arc::new(evidence)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> Pair {
        Pair(a.to_string(), b.to_string())
    }

    #[test]
    fn scored_pairs_sort_by_score_then_pair() {
        let mut scored = vec![
            (pair("carol", "rome"), 4.0),
            (pair("bob", "paris"), 5.0),
            (pair("alice", "rome"), 4.0),
        ];
        sort_scored_pairs(&mut scored);
        assert_eq!(
            scored.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>(),
            vec![pair("bob", "paris"), pair("alice", "rome"), pair("carol", "rome")]
        );
    }
}
