//! Highly Connected Subgraphs, weighted (HCSw).
//!
//! Recursively bipartitions a weighted undirected graph along its
//! minimum-weight cut until every remaining component is highly
//! connected: with threshold multiplier `t`, a component G is accepted
//! when `t * mincut(G) > |V(G)|`. The recursion is expressed as an
//! explicit work queue of node subsets so deep cut chains cannot
//! overflow the stack, and every tie-break is pinned (smallest context
//! id wins) so partitions are reproducible.
//!
//! Based on "A clustering algorithm based on graph connectivity",
//! Hartuv, E. and Shamir, R. (2000).

/// Neighbor lists excluding self-loops, as produced by
/// [`crate::cluster::CoGraph::adjacency`].
pub type Adjacency = Vec<Vec<(usize, f64)>>;

/// A global minimum cut: its total weight and the two sides.
#[derive(Debug)]
pub struct MinCut {
    pub weight: f64,
    pub side_a: Vec<usize>,
    pub side_b: Vec<usize>,
}

/// Stoer-Wagner minimum cut of the subgraph induced by `nodes`.
///
/// `nodes` must hold at least two vertices of a connected subgraph. Ties
/// in the maximum-adjacency ordering go to the smallest context id, so
/// equal-weight graphs cut deterministically.
pub fn stoer_wagner(adjacency: &Adjacency, nodes: &[usize]) -> MinCut {
    let n = nodes.len();
    debug_assert!(n >= 2, "stoer_wagner needs at least two nodes");

    let local_of: std::collections::HashMap<usize, usize> = nodes
        .iter()
        .enumerate()
        .map(|(local, &global)| (global, local))
        .collect();

    // Dense weights over the induced subgraph.
    let mut weight = vec![vec![0.0f64; n]; n];
    for (local, &global) in nodes.iter().enumerate() {
        for &(neighbor, w) in &adjacency[global] {
            if let Some(&other) = local_of.get(&neighbor) {
                weight[local][other] = w;
            }
        }
    }

    // Each surviving vertex represents the set of original vertices merged
    // into it.
    let mut merged: Vec<Vec<usize>> = nodes.iter().map(|&g| vec![g]).collect();
    let mut active: Vec<usize> = (0..n).collect();

    let mut best_weight = f64::INFINITY;
    let mut best_side: Vec<usize> = Vec::new();

    while active.len() > 1 {
        // Maximum-adjacency ordering starting from the first active vertex.
        let start = active[0];
        let mut in_a = vec![false; n];
        in_a[start] = true;
        let mut connectivity: Vec<f64> = (0..n).map(|v| weight[start][v]).collect();

        let mut order = vec![start];
        while order.len() < active.len() {
            let mut next = None;
            let mut next_connectivity = f64::NEG_INFINITY;
            for &v in &active {
                if in_a[v] {
                    continue;
                }
                let tighter = connectivity[v] > next_connectivity;
                let tie_smaller = connectivity[v] == next_connectivity
                    && next.is_some_and(|u: usize| merged[v][0] < merged[u][0]);
                if tighter || tie_smaller {
                    next_connectivity = connectivity[v];
                    next = Some(v);
                }
            }
            let Some(v) = next else { break };
            in_a[v] = true;
            order.push(v);
            for &u in &active {
                if !in_a[u] {
                    connectivity[u] += weight[v][u];
                }
            }
        }

        let t = order[order.len() - 1];
        let s = order[order.len() - 2];
        let cut_of_phase: f64 = active
            .iter()
            .filter(|&&v| v != t)
            .map(|&v| weight[t][v])
            .sum();

        if cut_of_phase < best_weight {
            best_weight = cut_of_phase;
            best_side = merged[t].clone();
        }

        // Merge t into s.
        let absorbed = std::mem::take(&mut merged[t]);
        merged[s].extend(absorbed);
        for v in 0..n {
            weight[s][v] += weight[t][v];
            weight[v][s] = weight[s][v];
        }
        weight[s][s] = 0.0;
        active.retain(|&v| v != t);
    }

    let side_a = best_side;
    let side_b: Vec<usize> = nodes
        .iter()
        .copied()
        .filter(|g| !side_a.contains(g))
        .collect();

    MinCut {
        weight: best_weight,
        side_a,
        side_b,
    }
}

/// The highly-connected acceptance predicate.
pub fn highly_connected(node_count: usize, cut_weight: f64, multiplier: f64) -> bool {
    multiplier * cut_weight > node_count as f64
}

/// Connected components within a node subset, ordered by smallest member.
fn components_within(adjacency: &Adjacency, nodes: &[usize]) -> Vec<Vec<usize>> {
    let member: std::collections::HashSet<usize> = nodes.iter().copied().collect();
    let mut seen = std::collections::HashSet::new();
    let mut components = Vec::new();

    let mut sorted = nodes.to_vec();
    sorted.sort_unstable();

    for &root in &sorted {
        if seen.contains(&root) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = std::collections::VecDeque::from([root]);
        seen.insert(root);
        while let Some(v) = queue.pop_front() {
            component.push(v);
            for &(u, _) in &adjacency[v] {
                if member.contains(&u) && seen.insert(u) {
                    queue.push_back(u);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

/// Partition a (possibly disconnected) graph into highly connected
/// clusters.
///
/// Returns the final node sets, ordered by their smallest context id;
/// within a set nodes are sorted.
pub fn partition(adjacency: &Adjacency, multiplier: f64) -> Vec<Vec<usize>> {
    let all: Vec<usize> = (0..adjacency.len()).collect();
    let mut queue: std::collections::VecDeque<Vec<usize>> =
        components_within(adjacency, &all).into();
    let mut clusters = Vec::new();

    while let Some(nodes) = queue.pop_front() {
        if nodes.len() < 2 {
            clusters.push(nodes);
            continue;
        }
        let cut = stoer_wagner(adjacency, &nodes);
        if highly_connected(nodes.len(), cut.weight, multiplier) {
            clusters.push(nodes);
        } else {
            // A cut side may itself fall apart once crossing edges are
            // gone; re-queue its components separately.
            for side in [cut.side_a, cut.side_b] {
                for component in components_within(adjacency, &side) {
                    queue.push_back(component);
                }
            }
        }
    }

    clusters.sort_by_key(|nodes| nodes.first().copied().unwrap_or(usize::MAX));
    clusters
}

/// Assign consecutive cluster ids over the context table.
///
/// Unclustered positions (none, by construction) stay -1.
pub fn label(clusters: &[Vec<usize>], context_count: usize) -> Vec<i64> {
    let mut groups = vec![-1i64; context_count];
    for (cluster_id, nodes) in clusters.iter().enumerate() {
        for &node in nodes {
            groups[node] = cluster_id as i64;
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency_from_edges(n: usize, edges: &[(usize, usize, f64)]) -> Adjacency {
        let mut adjacency = vec![Vec::new(); n];
        for &(a, b, w) in edges {
            adjacency[a].push((b, w));
            adjacency[b].push((a, w));
        }
        adjacency
    }

    #[test]
    fn min_cut_of_a_bridged_pair_of_triangles_is_the_bridge() {
        let adjacency = adjacency_from_edges(
            6,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (3, 5, 1.0),
                (2, 3, 1.0),
            ],
        );
        let nodes: Vec<usize> = (0..6).collect();
        let cut = stoer_wagner(&adjacency, &nodes);
        assert_eq!(cut.weight, 1.0);

        let mut side_a = cut.side_a.clone();
        let mut side_b = cut.side_b.clone();
        side_a.sort_unstable();
        side_b.sort_unstable();
        let mut sides = [side_a, side_b];
        sides.sort();
        assert_eq!(sides, [vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn min_cut_of_a_clique_isolates_one_vertex() {
        let adjacency = adjacency_from_edges(
            4,
            &[
                (0, 1, 1.0),
                (0, 2, 1.0),
                (0, 3, 1.0),
                (1, 2, 1.0),
                (1, 3, 1.0),
                (2, 3, 1.0),
            ],
        );
        let nodes: Vec<usize> = (0..4).collect();
        let cut = stoer_wagner(&adjacency, &nodes);
        assert_eq!(cut.weight, 3.0);
        assert_eq!(cut.side_a.len().min(cut.side_b.len()), 1);
    }

    #[test]
    fn equal_weight_clique_stays_one_cluster() {
        // mincut = 3, nodes = 4: 2 * 3 > 4.
        let adjacency = adjacency_from_edges(
            4,
            &[
                (0, 1, 1.0),
                (0, 2, 1.0),
                (0, 3, 1.0),
                (1, 2, 1.0),
                (1, 3, 1.0),
                (2, 3, 1.0),
            ],
        );
        let clusters = partition(&adjacency, 2.0);
        assert_eq!(clusters, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn lightly_bridged_triangles_split_into_two_clusters() {
        // The bridge is the mincut (1): 2 * 1 <= 6, so the graph splits;
        // each triangle then holds (mincut 2, 2 * 2 > 3).
        let adjacency = adjacency_from_edges(
            6,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (3, 5, 1.0),
                (2, 3, 1.0),
            ],
        );
        let clusters = partition(&adjacency, 2.0);
        assert_eq!(clusters, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn disconnected_components_partition_independently() {
        let adjacency = adjacency_from_edges(
            5,
            &[(0, 1, 5.0), (3, 4, 5.0)],
        );
        let clusters = partition(&adjacency, 2.0);
        // Each edge pair is highly connected (2 * 5 > 2); node 2 is isolated.
        assert_eq!(clusters, vec![vec![0, 1], vec![2], vec![3, 4]]);
    }

    #[test]
    fn partition_preserves_the_node_set() {
        let adjacency = adjacency_from_edges(
            7,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (2, 3, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (5, 6, 1.0),
            ],
        );
        let clusters = partition(&adjacency, 2.0);
        let mut all: Vec<usize> = clusters.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn label_assigns_consecutive_ids() {
        let clusters = vec![vec![0, 2], vec![1, 3]];
        assert_eq!(label(&clusters, 5), vec![0, 1, 0, 1, -1]);
    }

    #[test]
    fn singleton_graph_is_its_own_cluster() {
        let adjacency: Adjacency = vec![Vec::new()];
        assert_eq!(partition(&adjacency, 2.0), vec![vec![0]]);
    }
}
