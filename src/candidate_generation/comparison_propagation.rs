// src/candidate_generation/comparison_propagation.rs - Removes redundant comparisons

// petgraph imports
use petgraph::graphmap::UnGraphMap;

use crate::models::matching::{Block, Comparison};

/// Co-occurrence graph: one node per blocked record, one edge per pair that
/// shares at least one block, weighted by the number of shared blocks.
pub fn co_occurrence_graph(blocks: &[Block]) -> UnGraphMap<usize, u32> {
    let mut graph: UnGraphMap<usize, u32> = UnGraphMap::new();
    for block in blocks {
        for comparison in block.comparisons() {
            match graph.edge_weight_mut(comparison.left, comparison.right) {
                Some(weight) => *weight += 1,
                None => {
                    graph.add_edge(comparison.left, comparison.right, 1);
                }
            }
        }
    }
    graph
}

/// Every distinct comparison implied by `blocks`, exactly once, sorted.
pub fn propagate(blocks: &[Block]) -> Vec<Comparison> {
    let graph = co_occurrence_graph(blocks);
    let mut comparisons: Vec<Comparison> = graph
        .all_edges()
        .map(|(a, b, _)| Comparison::new(a, b))
        .collect();
    comparisons.sort_unstable();
    comparisons
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_repeated_pairs_are_emitted_once() {
        let blocks = vec![
            Block::Bilateral { left: vec![0, 1], right: vec![3] },
            Block::Bilateral { left: vec![0], right: vec![3, 4] },
            Block::Bilateral { left: vec![1], right: vec![3] },
        ];
        let comparisons = propagate(&blocks);
        assert_eq!(
            comparisons,
            vec![Comparison::new(0, 3), Comparison::new(0, 4), Comparison::new(1, 3)]
        );
        let unique: HashSet<_> = comparisons.iter().collect();
        assert_eq!(unique.len(), comparisons.len());
    }

    #[test]
    fn test_edge_weights_count_shared_blocks() {
        let blocks = vec![
            Block::Unilateral { entities: vec![0, 1, 2] },
            Block::Unilateral { entities: vec![1, 2] },
        ];
        let graph = co_occurrence_graph(&blocks);
        assert_eq!(graph.edge_weight(1, 2), Some(&2));
        assert_eq!(graph.edge_weight(2, 0), Some(&1));
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_no_blocks_no_comparisons() {
        assert!(propagate(&[]).is_empty());
    }
}
