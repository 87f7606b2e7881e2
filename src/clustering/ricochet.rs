// src/clustering/ricochet.rs - Ricochet Sequential-Rippling clustering

use log::debug;
use petgraph::graphmap::UnGraphMap;
use std::cmp::Ordering;

use crate::clustering::into_clusters;
use crate::models::matching::{Cluster, ScoredPair};
use crate::utils::pipeline_config::clears_threshold;

/// Per-record assignment state while rippling.
struct Assignment {
    center_of: Vec<Option<usize>>,
    similarity_to_center: Vec<f64>,
    is_center: Vec<bool>,
    /// Members of each center, the center itself excluded.
    member_count: Vec<usize>,
}

impl Assignment {
    fn new(n: usize) -> Self {
        Self {
            center_of: vec![None; n],
            similarity_to_center: vec![0.0; n],
            is_center: vec![false; n],
            member_count: vec![0; n],
        }
    }

    fn assign(&mut self, node: usize, center: usize, similarity: f64) {
        self.center_of[node] = Some(center);
        self.similarity_to_center[node] = similarity;
        self.member_count[center] += 1;
    }

    /// Detaches `node` from its current center; returns that center if it is
    /// left without members.
    fn detach(&mut self, node: usize) -> Option<usize> {
        let center = self.center_of[node].filter(|&c| c != node)?;
        self.member_count[center] -= 1;
        (self.member_count[center] == 0).then_some(center)
    }
}

#[derive(Debug, Clone)]
pub struct RicochetSrClustering {
    threshold: f64,
}

impl RicochetSrClustering {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn similarity_graph(&self, pairs: &[ScoredPair]) -> UnGraphMap<usize, f64> {
        let mut graph: UnGraphMap<usize, f64> = UnGraphMap::new();
        for pair in pairs {
            if pair.left != pair.right && clears_threshold(pair.similarity, self.threshold) {
                graph.add_edge(pair.left, pair.right, pair.similarity);
            }
        }
        graph
    }

    /// Partitions records `0..record_count`; records without a qualifying
    /// edge end up as singletons.
    pub fn cluster(&self, pairs: &[ScoredPair], record_count: usize) -> Vec<Cluster> {
        let graph = self.similarity_graph(pairs);
        let mut state = Assignment::new(record_count);

        for v in visiting_order(&graph) {
            let captured: Vec<(usize, f64)> = graph
                .edges(v)
                .filter(|&(_, u, &w)| !state.is_center[u] && w > state.similarity_to_center[u])
                .map(|(_, u, &w)| (u, w))
                .collect();
            if captured.is_empty() {
                continue;
            }

            let mut orphans = Vec::new();
            orphans.extend(state.detach(v));
            state.is_center[v] = true;
            state.center_of[v] = Some(v);
            state.similarity_to_center[v] = 1.0;

            for (u, w) in captured {
                orphans.extend(state.detach(u));
                state.assign(u, v, w);
            }

            for orphan in orphans {
                if state.is_center[orphan] && state.member_count[orphan] == 0 {
                    if let Some((center, w)) = best_center(&graph, &state, orphan) {
                        debug!("Ricochet: center {} orphaned, reattached to {}", orphan, center);
                        state.is_center[orphan] = false;
                        state.assign(orphan, center, w);
                    }
                }
            }
        }

        let mut unassigned: Vec<usize> = graph.nodes().filter(|&u| state.center_of[u].is_none()).collect();
        unassigned.sort_unstable();
        for u in unassigned {
            if let Some((center, w)) = best_center(&graph, &state, u) {
                state.assign(u, center, w);
            }
        }

        into_clusters(
            (0..record_count).map(|i| (state.center_of[i].unwrap_or(i), i)),
        )
    }
}

/// Descending average incident edge weight, ties by index.
fn visiting_order(graph: &UnGraphMap<usize, f64>) -> Vec<usize> {
    let mut weighted: Vec<(usize, f64)> = graph
        .nodes()
        .map(|v| {
            let (sum, degree) = graph
                .edges(v)
                .fold((0.0, 0usize), |(sum, degree), (_, _, &w)| (sum + w, degree + 1));
            (v, if degree == 0 { 0.0 } else { sum / degree as f64 })
        })
        .collect();
    weighted.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    weighted.into_iter().map(|(v, _)| v).collect()
}

/// Most similar neighbouring center of `node`, smallest index on ties.
fn best_center(graph: &UnGraphMap<usize, f64>, state: &Assignment, node: usize) -> Option<(usize, f64)> {
    graph
        .edges(node)
        .filter(|&(_, c, _)| c != node && state.is_center[c])
        .map(|(_, c, &w)| (c, w))
        .fold(None, |best: Option<(usize, f64)>, (c, w)| match best {
            Some((bc, bw)) if bw > w || (bw == w && bc < c) => Some((bc, bw)),
            _ => Some((c, w)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pair(left: usize, right: usize, similarity: f64) -> ScoredPair {
        ScoredPair { left, right, similarity }
    }

    #[test]
    fn test_no_pairs_gives_singletons() {
        let clusters = RicochetSrClustering::new(0.1).cluster(&[], 3);
        assert_eq!(clusters, vec![Cluster::singleton(0), Cluster::singleton(1), Cluster::singleton(2)]);
    }

    #[test]
    fn test_rippling_moves_members_and_reattaches_orphans() {
        let pairs = vec![pair(0, 1, 0.9), pair(0, 2, 0.8), pair(3, 4, 0.5)];
        // 3-4 falls below the threshold; 1 is visited first, then 0 captures 2
        // and the emptied center 1 rejoins 0
        let clusters = RicochetSrClustering::new(0.6).cluster(&pairs, 5);
        assert_eq!(
            clusters,
            vec![Cluster::new(vec![0, 1, 2]), Cluster::singleton(3), Cluster::singleton(4)]
        );
    }

    #[test]
    fn test_separate_components_stay_apart() {
        let pairs = vec![pair(0, 3, 0.7), pair(1, 4, 0.6)];
        let clusters = RicochetSrClustering::new(0.1).cluster(&pairs, 6);
        assert_eq!(
            clusters,
            vec![
                Cluster::new(vec![0, 3]),
                Cluster::new(vec![1, 4]),
                Cluster::singleton(2),
                Cluster::singleton(5),
            ]
        );
    }

    #[test]
    fn test_output_is_a_partition() {
        let pairs = vec![
            pair(0, 5, 0.9),
            pair(1, 5, 0.85),
            pair(1, 6, 0.4),
            pair(2, 6, 0.95),
            pair(2, 7, 0.3),
            pair(3, 7, 0.3),
            pair(4, 8, 0.05),
            pair(0, 6, 0.6),
        ];
        let clusters = RicochetSrClustering::new(0.1).cluster(&pairs, 10);
        let mut seen = HashSet::new();
        for cluster in &clusters {
            assert!(!cluster.is_empty());
            for &m in &cluster.members {
                assert!(seen.insert(m), "record {} in two clusters", m);
            }
        }
        assert_eq!(seen.len(), 10);
        // sorted by smallest member
        let firsts: Vec<usize> = clusters.iter().map(|c| c.members[0]).collect();
        let mut sorted = firsts.clone();
        sorted.sort_unstable();
        assert_eq!(firsts, sorted);
    }

    #[test]
    fn test_repeated_runs_agree() {
        let pairs = vec![pair(0, 2, 0.5), pair(1, 2, 0.5), pair(0, 3, 0.5), pair(1, 3, 0.5)];
        let a = RicochetSrClustering::new(0.1).cluster(&pairs, 4);
        let b = RicochetSrClustering::new(0.1).cluster(&pairs, 4);
        assert_eq!(a, b);
    }
}
