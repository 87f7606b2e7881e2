// src/clustering/unique_mapping.rs - Greedy one-to-one linkage for two-source data

use std::cmp::Ordering;

use crate::clustering::into_clusters;
use crate::models::matching::{Cluster, ScoredPair};
use crate::utils::pipeline_config::clears_threshold;

/// Accepts pairs by descending similarity as long as neither record has been
/// matched already, so every record ends up in at most one pair.
#[derive(Debug, Clone)]
pub struct UniqueMappingClustering {
    threshold: f64,
}

impl UniqueMappingClustering {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn cluster(&self, pairs: &[ScoredPair], record_count: usize) -> Vec<Cluster> {
        let mut candidates: Vec<&ScoredPair> = pairs
            .iter()
            .filter(|p| p.left != p.right && clears_threshold(p.similarity, self.threshold))
            .collect();
        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| (a.left, a.right).cmp(&(b.left, b.right)))
        });

        let mut partner: Vec<Option<usize>> = vec![None; record_count];
        for pair in candidates {
            if partner[pair.left].is_none() && partner[pair.right].is_none() {
                partner[pair.left] = Some(pair.right);
                partner[pair.right] = Some(pair.left);
            }
        }

        into_clusters(
            partner
                .iter()
                .enumerate()
                .map(|(i, p)| (p.map_or(i, |j| i.min(j)), i)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(left: usize, right: usize, similarity: f64) -> ScoredPair {
        ScoredPair { left, right, similarity }
    }

    #[test]
    fn test_strongest_pairs_win() {
        // records 0,1 in source A; 2,3 in source B
        let pairs = vec![pair(0, 2, 0.6), pair(0, 3, 0.9), pair(1, 3, 0.8), pair(1, 2, 0.3)];
        let clusters = UniqueMappingClustering::new(0.1).cluster(&pairs, 4);
        assert_eq!(clusters, vec![Cluster::new(vec![0, 3]), Cluster::new(vec![1, 2])]);
    }

    #[test]
    fn test_ties_resolved_by_indices() {
        let pairs = vec![pair(1, 2, 0.5), pair(0, 2, 0.5)];
        let clusters = UniqueMappingClustering::new(0.1).cluster(&pairs, 3);
        assert_eq!(clusters, vec![Cluster::new(vec![0, 2]), Cluster::singleton(1)]);
    }

    #[test]
    fn test_threshold_leaves_singletons() {
        let pairs = vec![pair(0, 1, 0.2)];
        let clusters = UniqueMappingClustering::new(0.5).cluster(&pairs, 2);
        assert_eq!(clusters, vec![Cluster::singleton(0), Cluster::singleton(1)]);
    }
}
