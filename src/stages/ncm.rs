//! Graph-path clustering stages: co-occurrence graph, HCS clustering,
//! centrality medoids and dominance-based pair promotion.

use crate::cluster::{CoGraph, hcs};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{Stage, StageContext, Value};
use crate::stages::ontext::sort_scored_pairs;
use crate::types::Pair;
use std::sync::Arc;

/// Build the weighted verb co-occurrence graph.
pub struct BuildCooccurrenceGraph;

impl Stage for BuildCooccurrenceGraph {
    fn identity(&self) -> String {
        "Build_cooccurrence_graph".to_string()
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["pair_to_contexts", "unique_contexts"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["cograph"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let pairs = ctx.state.pair_contexts("pair_to_contexts")?.clone();
        let contexts = ctx.state.contexts("unique_contexts")?.clone();
        let cograph = CoGraph::build(&pairs, &contexts)?;
        tracing::debug!(
            target: "pipeline",
            "Co-occurrence graph: {} nodes, {} edges",
            cograph.node_count(),
            cograph.edge_count()
        );
        ctx.state.insert("cograph", Value::Graph(Arc::new(cograph)));
        Ok(())
    }
}

/// Partition the graph into highly connected subgraphs and label the
/// resulting components as clusters.
pub struct NcmHcsw {
    multiplier: f64,
}

impl NcmHcsw {
    pub fn new(multiplier: f64) -> PipelineResult<Self> {
        if multiplier <= 0.0 || !multiplier.is_finite() {
            return Err(PipelineError::StageConfig {
                reason: format!("hcs multiplier must be positive and finite, got {multiplier}"),
            });
        }
        Ok(Self { multiplier })
    }
}

impl Stage for NcmHcsw {
    fn identity(&self) -> String {
        "Ncm_hcsw".to_string()
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["cograph", "unique_contexts"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["groups"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let cograph = ctx.state.graph("cograph")?.clone();
        let contexts = ctx.state.contexts("unique_contexts")?.clone();

        let clusters = hcs::partition(&cograph.adjacency(), self.multiplier);
        let groups = hcs::label(&clusters, contexts.len());
        tracing::debug!(
            target: "pipeline",
            "HCS produced {} clusters over {} contexts",
            clusters.len(),
            contexts.len()
        );
        ctx.state.insert("groups", Value::Groups(Arc::new(groups)));
        Ok(())
    }
}

/// Name each cluster after its most central context.
///
/// Centrality is measured on the original graph, before any HCS cuts:
/// the representative should be the context best connected overall, not
/// merely within the surviving component.
pub struct NcmMedoids;

impl Stage for NcmMedoids {
    fn identity(&self) -> String {
        "Ncm_medoids".to_string()
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["cograph", "groups", "unique_contexts"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["medoids", "relation_names", "relation_count"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let cograph = ctx.state.graph("cograph")?.clone();
        let groups = ctx.state.groups("groups")?.clone();
        let contexts = ctx.state.contexts("unique_contexts")?.clone();

        let centrality = cograph.degree_centrality();
        let relation_count = groups.iter().copied().max().map_or(0, |m| (m + 1) as usize);

        let mut medoids = Vec::with_capacity(relation_count);
        let mut relation_names = Vec::with_capacity(relation_count);
        for group_id in 0..relation_count {
            let mut best: Option<usize> = None;
            for (i, &g) in groups.iter().enumerate() {
                if g != group_id as i64 {
                    continue;
                }
                // Strict comparison keeps the first occurrence on ties.
                if best.is_none_or(|b| centrality[i] > centrality[b]) {
                    best = Some(i);
                }
            }
            let medoid = best.ok_or_else(|| PipelineError::Arithmetic {
                reason: format!("cluster {group_id} has no member contexts"),
            })?;
            medoids.push(medoid);
            relation_names.push(contexts[medoid].clone());
        }

        ctx.state.insert("medoids", Value::Medoids(Arc::new(medoids)));
        ctx.state
            .insert("relation_names", Value::Names(Arc::new(relation_names)));
        ctx.state.insert("relation_count", Value::Count(relation_count));
        Ok(())
    }
}

/// Promote pairs by per-cluster dominance.
///
/// A pair's occurrences are tallied per cluster; its score for its best
/// cluster is `max / (sum - max + 1)`, i.e. how strongly the dominant
/// cluster outweighs the rest. With `only_commonest` set, pairs scoring
/// below 1 are dropped.
pub struct NcmPromotePairs {
    only_commonest: bool,
    pairs_to_promote: usize,
}

impl NcmPromotePairs {
    pub fn new(only_commonest: bool, pairs_to_promote: usize) -> Self {
        Self {
            only_commonest,
            pairs_to_promote,
        }
    }
}

impl Stage for NcmPromotePairs {
    fn identity(&self) -> String {
        format!("Ncm_promote_pairs_{}", self.pairs_to_promote)
    }

    fn required_data(&self) -> Vec<&'static str> {
        vec!["unique_contexts", "groups", "pair_to_contexts", "relation_count"]
    }

    fn returns(&self) -> Vec<&'static str> {
        vec!["promoted_pairs", "group_pairs", "groups_to_prune", "evidence_sentences"]
    }

    fn apply(&self, ctx: StageContext<'_>) -> PipelineResult<()> {
        let contexts = ctx.state.contexts("unique_contexts")?.clone();
        let groups = ctx.state.groups("groups")?.clone();
        let pair_contexts = ctx.state.pair_contexts("pair_to_contexts")?.clone();
        let relation_count = ctx.state.count("relation_count")?;

        let row_of = |verb: &str| -> Option<usize> {
            contexts.binary_search_by(|v| v.as_str().cmp(verb)).ok()
        };

        // Tally occurrences per (pair, cluster).
        let mut counts: Vec<Vec<f64>> = Vec::with_capacity(pair_contexts.len());
        for occurrences in pair_contexts.values() {
            let mut row = vec![0.0f64; relation_count];
            for occurrence in occurrences {
                let Some(context_index) = row_of(&occurrence.verb) else {
                    continue;
                };
                let group = groups[context_index];
                if group >= 0 {
                    row[group as usize] += occurrence.count as f64;
                }
            }
            counts.push(row);
        }

        // Dominance score for each pair's best cluster.
        let mut cluster_candidates: Vec<Vec<(Pair, f64)>> = vec![Vec::new(); relation_count];
        for (pair, row) in pair_contexts.keys().zip(counts.iter()) {
            if row.is_empty() {
                continue;
            }
            let mut best_group = 0usize;
            let mut maximum = row[0];
            for (g, &value) in row.iter().enumerate().skip(1) {
                if value > maximum {
                    maximum = value;
                    best_group = g;
                }
            }
            let total: f64 = row.iter().sum();
            let score = maximum / (total - maximum + 1.0);
            if self.only_commonest && score < 1.0 {
                continue;
            }
            cluster_candidates[best_group].push((pair.clone(), score));
        }

        let mut group_pairs: Vec<Vec<Pair>> = Vec::with_capacity(relation_count);
        let mut promoted_pairs: Vec<Vec<Pair>> = Vec::with_capacity(relation_count);
        let mut evidence: Vec<Vec<String>> = Vec::with_capacity(relation_count);
        let mut groups_to_prune: Vec<usize> = Vec::new();

        for (group_id, mut candidates) in cluster_candidates.into_iter().enumerate() {
            sort_scored_pairs(&mut candidates);
            let ordered: Vec<Pair> = candidates.into_iter().map(|(pair, _)| pair).collect();
            let promoted: Vec<Pair> = ordered
                .iter()
                .take(self.pairs_to_promote)
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

            if ordered.is_empty() {
                groups_to_prune.push(group_id);
            }
            group_pairs.push(ordered);
            promoted_pairs.push(promoted);
            evidence.push(sentences);
        }

        tracing::debug!(
            target: "pipeline",
            "Promoted pairs for {} clusters ({} pruned)",
            relation_count,
            groups_to_prune.len()
        );

        ctx.state
            .insert("promoted_pairs", Value::PairLists(Arc::new(promoted_pairs)));
        ctx.state
            .insert("group_pairs", Value::PairLists(Arc::new(group_pairs)));
        ctx.state
            .insert("groups_to_prune", Value::GroupIds(Arc::new(groups_to_prune)));
        ctx.state
            .insert("evidence_sentences", Value::Sentences(Arc::new(evidence)));
        Ok(())
    }
}
