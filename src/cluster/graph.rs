//! Weighted verb co-occurrence graph.
//!
//! Nodes are the unique contexts (insertion order follows the sorted
//! context table, so `NodeIndex::index()` equals the canonical context
//! id). Edge weight counts the combination-with-replacement visits shared
//! by the two endpoints; self-loops are allowed.

use crate::error::{PipelineError, PipelineResult};
use crate::types::PairContexts;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

#[derive(Debug)]
pub struct CoGraph {
    graph: UnGraph<String, f64>,
}

impl CoGraph {
    /// Build the graph from the pair index. Every context becomes a node
    /// even when it ends up isolated.
    pub fn build(
        pair_to_contexts: &PairContexts,
        unique_contexts: &[String],
    ) -> PipelineResult<Self> {
        let mut graph = UnGraph::<String, f64>::new_undirected();
        for context in unique_contexts {
            graph.add_node(context.clone());
        }

        let id_of: HashMap<&str, usize> = unique_contexts
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_str(), i))
            .collect();

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
                    let (a, b) = (NodeIndex::new(v1), NodeIndex::new(v2));
                    if let Some(edge) = graph.find_edge(a, b) {
                        if let Some(weight) = graph.edge_weight_mut(edge) {
                            *weight += 1.0;
                        }
                    } else {
                        graph.add_edge(a, b, 1.0);
                    }
                }
            }
        }

        Ok(Self { graph })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn weight(&self, v1: usize, v2: usize) -> f64 {
        self.graph
            .find_edge(NodeIndex::new(v1), NodeIndex::new(v2))
            .and_then(|e| self.graph.edge_weight(e))
            .copied()
            .unwrap_or(0.0)
    }

    /// Neighbor lists excluding self-loops, indexed by context id.
    ///
    /// This is the adjacency view the cut computation runs on: self-loops
    /// never cross a cut, so they are dropped here.
    pub fn adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        let mut neighbors = vec![Vec::new(); self.graph.node_count()];
        for edge in self.graph.edge_references() {
            let a = edge.source().index();
            let b = edge.target().index();
            if a == b {
                continue;
            }
            neighbors[a].push((b, *edge.weight()));
            neighbors[b].push((a, *edge.weight()));
        }
        neighbors
    }

    /// Unweighted degree centrality per context: incident edge count
    /// (self-loops count twice) over `n - 1`.
    pub fn degree_centrality(&self) -> Vec<f64> {
        let n = self.graph.node_count();
        let denominator = n.saturating_sub(1).max(1) as f64;
        (0..n)
            .map(|i| {
                let node = NodeIndex::new(i);
                let degree: usize = self
                    .graph
                    .edges(node)
                    .map(|e| if e.source() == e.target() { 2 } else { 1 })
                    .sum();
                degree as f64 / denominator
            })
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svo::{SvoIndex, SvoReader};
    use std::io::Cursor;
    use std::path::Path;

    fn graph(corpus: &str) -> (CoGraph, Vec<String>) {
        let idx = SvoIndex::build(SvoReader::new(
            Cursor::new(corpus.to_string()),
            Path::new("test.svo"),
        ))
        .unwrap();
        let g = CoGraph::build(&idx.pair_to_contexts, &idx.unique_contexts).unwrap();
        (g, idx.unique_contexts)
    }

    #[test]
    fn edge_weight_counts_shared_pairs() {
        let corpus = "a\tv\tb\t1\n\
                      a\tw\tb\t1\n\
                      c\tv\td\t1\n\
                      c\tw\td\t1\n\
                      e\tv\tf\t1\n";
        let (g, contexts) = graph(corpus);
        assert_eq!(contexts, vec!["v", "w"]);
        // v and w co-occur in two pairs.
        assert_eq!(g.weight(0, 1), 2.0);
        // Self-loops: one per pair the context appears in.
        assert_eq!(g.weight(0, 0), 3.0);
        assert_eq!(g.weight(1, 1), 2.0);
    }

    #[test]
    fn isolated_contexts_are_still_nodes() {
        let corpus = "a\tv\tb\t1\n\
                      c\tw\td\t1\n";
        let (g, contexts) = graph(corpus);
        assert_eq!(contexts.len(), 2);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.weight(0, 1), 0.0);
    }

    #[test]
    fn adjacency_excludes_self_loops() {
        let corpus = "a\tv\tb\t1\n\
                      a\tw\tb\t1\n";
        let (g, _) = graph(corpus);
        let adjacency = g.adjacency();
        assert_eq!(adjacency[0], vec![(1, 1.0)]);
        assert_eq!(adjacency[1], vec![(0, 1.0)]);
    }

    #[test]
    fn centrality_favors_the_best_connected_context() {
        // v co-occurs with w and x; w and x only with v.
        let corpus = "a\tv\tb\t1\n\
                      a\tw\tb\t1\n\
                      c\tv\td\t1\n\
                      c\tx\td\t1\n";
        let (g, contexts) = graph(corpus);
        let centrality = g.degree_centrality();
        let v = contexts.iter().position(|c| c == "v").unwrap();
        for (i, value) in centrality.iter().enumerate() {
            if i != v {
                assert!(centrality[v] > *value);
            }
        }
    }
}
