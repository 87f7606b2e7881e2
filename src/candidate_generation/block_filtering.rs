// src/candidate_generation/block_filtering.rs - Prunes records from their largest blocks

use std::collections::HashMap;

use crate::models::matching::Block;
use crate::utils::pipeline_config::BlockFilteringConfig;

/// Keeps each record only in the smallest `ratio` share of the blocks that
/// contain it.
#[derive(Debug, Clone)]
pub struct BlockFiltering {
    ratio: f64,
}

impl BlockFiltering {
    pub fn new(config: &BlockFilteringConfig) -> Self {
        Self {
            ratio: config.ratio(),
        }
    }

    /// Number of blocks a record appearing in `n` blocks is kept in.
    pub fn limit(&self, n: usize) -> usize {
        ((self.ratio * n as f64).round() as usize).max(1)
    }

    pub fn refine_blocks(&self, blocks: Vec<Block>) -> Vec<Block> {
        let mut ordered = blocks;
        // stable: equal cardinalities keep their building order
        ordered.sort_by_key(Block::cardinality);

        let mut appearances: HashMap<usize, usize> = HashMap::new();
        for block in &ordered {
            for entity in block.entities() {
                *appearances.entry(entity).or_insert(0) += 1;
            }
        }
        let limits: HashMap<usize, usize> = appearances
            .into_iter()
            .map(|(entity, n)| (entity, self.limit(n)))
            .collect();

        let mut kept: HashMap<usize, usize> = HashMap::with_capacity(limits.len());
        let mut retain = |entity: usize| {
            let count = kept.entry(entity).or_insert(0);
            if *count < limits[&entity] {
                *count += 1;
                true
            } else {
                false
            }
        };

        ordered
            .into_iter()
            .filter_map(|block| {
                let rebuilt = match block {
                    Block::Unilateral { entities } => Block::Unilateral {
                        entities: entities.into_iter().filter(|&e| retain(e)).collect(),
                    },
                    Block::Bilateral { left, right } => Block::Bilateral {
                        left: left.into_iter().filter(|&e| retain(e)).collect(),
                        right: right.into_iter().filter(|&e| retain(e)).collect(),
                    },
                };
                rebuilt.is_comparable().then_some(rebuilt)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filtering(ratio: f64) -> BlockFiltering {
        BlockFiltering::new(&BlockFilteringConfig::new(ratio).unwrap())
    }

    #[test]
    fn test_ratio_one_keeps_every_membership() {
        let blocks = vec![
            Block::Bilateral { left: vec![0, 1], right: vec![2, 3] },
            Block::Bilateral { left: vec![0], right: vec![2] },
        ];
        let refined = filtering(1.0).refine_blocks(blocks);
        // reordered by cardinality, contents untouched
        assert_eq!(
            refined,
            vec![
                Block::Bilateral { left: vec![0], right: vec![2] },
                Block::Bilateral { left: vec![0, 1], right: vec![2, 3] },
            ]
        );
    }

    #[test]
    fn test_records_leave_their_largest_blocks() {
        let blocks = vec![
            Block::Unilateral { entities: vec![0, 1, 2, 3] },
            Block::Unilateral { entities: vec![0, 1] },
        ];
        // records 0 and 1 appear twice: round(0.5 * 2) = 1, kept in the small block only
        let refined = filtering(0.5).refine_blocks(blocks);
        assert_eq!(
            refined,
            vec![
                Block::Unilateral { entities: vec![0, 1] },
                Block::Unilateral { entities: vec![2, 3] },
            ]
        );
    }

    #[test]
    fn test_every_record_keeps_at_least_one_block() {
        let f = filtering(0.1);
        assert_eq!(f.limit(1), 1);
        assert_eq!(f.limit(3), 1);
        assert_eq!(f.limit(20), 2);
    }

    #[test]
    fn test_blocks_emptied_on_one_side_are_dropped() {
        let blocks = vec![
            Block::Bilateral { left: vec![0], right: vec![2] },
            Block::Bilateral { left: vec![0], right: vec![3] },
        ];
        // record 0 keeps round(0.4 * 2) = 1 block, leaving the second one-sided
        let refined = filtering(0.4).refine_blocks(blocks);
        assert_eq!(refined, vec![Block::Bilateral { left: vec![0], right: vec![2] }]);
    }

    #[test]
    fn test_empty_input() {
        assert!(filtering(0.8).refine_blocks(Vec::new()).is_empty());
    }
}
