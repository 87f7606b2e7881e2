// src/candidate_generation/sorted_neighborhood.rs - Sorted-neighborhood block building

use std::collections::{BTreeMap, BTreeSet};

use crate::models::core::{DatasetKind, EntityProfile, ProfileStore};
use crate::models::matching::Block;
use crate::utils::pipeline_config::{BlockingConfig, BlockingMethod};
use crate::utils::text::tokenize;

/// Slides a window of `window_size` consecutive slots over a sorted slot list.
/// Each slot holds record indices (one record per slot for classic sorted
/// neighborhood, all records sharing a key for the extended variant).
#[derive(Debug, Clone)]
pub struct WindowBlocks {
    kind: DatasetKind,
    split: usize,
    slots: Vec<Vec<usize>>,
    window_size: usize,
    position: usize,
}

impl WindowBlocks {
    fn new(store: &ProfileStore, slots: Vec<Vec<usize>>, window_size: usize) -> Self {
        Self {
            kind: store.kind(),
            split: store.split(),
            slots,
            window_size: window_size.max(1),
            position: 0,
        }
    }

    /// Window positions; a list shorter than the window is covered once.
    fn positions(&self) -> usize {
        if self.slots.is_empty() {
            0
        } else {
            self.slots.len().saturating_sub(self.window_size) + 1
        }
    }

    fn block_at(&self, position: usize) -> Block {
        let end = (position + self.window_size).min(self.slots.len());
        let members: BTreeSet<usize> = self.slots[position..end]
            .iter()
            .flat_map(|slot| slot.iter().copied())
            .collect();

        match self.kind {
            DatasetKind::Unilateral => Block::Unilateral {
                entities: members.into_iter().collect(),
            },
            DatasetKind::Bilateral => {
                let (left, right): (Vec<usize>, Vec<usize>) =
                    members.into_iter().partition(|&i| i < self.split);
                Block::Bilateral { left, right }
            }
        }
    }
}

impl Iterator for WindowBlocks {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        while self.position < self.positions() {
            let block = self.block_at(self.position);
            self.position += 1;
            if block.is_comparable() {
                return Some(block);
            }
        }
        None
    }
}

/// Windows over the sorted list of distinct blocking keys. Every token of
/// every attribute value is a key.
#[derive(Debug, Clone)]
pub struct ExtendedSortedNeighborhood {
    window_size: usize,
}

impl ExtendedSortedNeighborhood {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn blocks(&self, store: &ProfileStore) -> WindowBlocks {
        let mut postings: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, profile) in store.profiles().iter().enumerate() {
            let keys: BTreeSet<String> = profile.values().flat_map(tokenize).collect();
            for key in keys {
                postings.entry(key).or_default().push(index);
            }
        }
        WindowBlocks::new(store, postings.into_values().collect(), self.window_size)
    }
}

/// Windows over records sorted by a single key per record; ties are broken by
/// global index.
#[derive(Debug, Clone)]
pub struct SortedNeighborhood {
    window_size: usize,
    key_attributes: Vec<String>,
}

impl SortedNeighborhood {
    pub fn new(window_size: usize, key_attributes: Vec<String>) -> Self {
        Self {
            window_size,
            key_attributes,
        }
    }

    pub fn sort_key(&self, profile: &EntityProfile) -> String {
        profile
            .attributes
            .iter()
            .filter(|a| self.key_attributes.is_empty() || self.key_attributes.contains(&a.name))
            .flat_map(|a| tokenize(&a.value))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn blocks(&self, store: &ProfileStore) -> WindowBlocks {
        let mut keyed: Vec<(String, usize)> = store
            .profiles()
            .iter()
            .enumerate()
            .map(|(index, profile)| (self.sort_key(profile), index))
            .collect();
        keyed.sort();
        let slots = keyed.into_iter().map(|(_, index)| vec![index]).collect();
        WindowBlocks::new(store, slots, self.window_size)
    }
}

/// Lazy block sequence for the configured blocking method.
pub fn block_builder(config: &BlockingConfig, store: &ProfileStore) -> WindowBlocks {
    match config.method() {
        BlockingMethod::ExtendedSortedNeighborhood => {
            ExtendedSortedNeighborhood::new(config.window_size()).blocks(store)
        }
        BlockingMethod::SortedNeighborhood => {
            SortedNeighborhood::new(config.window_size(), config.sort_key_attributes().to_vec())
                .blocks(store)
        }
    }
}
