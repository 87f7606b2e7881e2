// src/models/matching.rs

use serde::{Deserialize, Serialize};

/// An unordered pair of global record indices, stored with `left < right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Comparison {
    pub left: usize,
    pub right: usize,
}

impl Comparison {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { left: a, right: b }
        } else {
            Self { left: b, right: a }
        }
    }
}

/// A comparison after the matcher has scored it. `similarity` is in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredPair {
    pub left: usize,
    pub right: usize,
    pub similarity: f64,
}

impl ScoredPair {
    pub fn comparison(&self) -> Comparison {
        Comparison::new(self.left, self.right)
    }
}

/// A group of records believed to co-occur. Member lists are sorted and
/// deduplicated global indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Block {
    Unilateral { entities: Vec<usize> },
    Bilateral { left: Vec<usize>, right: Vec<usize> },
}

impl Block {
    /// Number of comparisons the block implies.
    pub fn cardinality(&self) -> u64 {
        match self {
            Block::Unilateral { entities } => {
                let n = entities.len() as u64;
                n * n.saturating_sub(1) / 2
            }
            Block::Bilateral { left, right } => left.len() as u64 * right.len() as u64,
        }
    }

    pub fn is_comparable(&self) -> bool {
        self.cardinality() > 0
    }

    pub fn entity_count(&self) -> usize {
        match self {
            Block::Unilateral { entities } => entities.len(),
            Block::Bilateral { left, right } => left.len() + right.len(),
        }
    }

    pub fn entities(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match self {
            Block::Unilateral { entities } => Box::new(entities.iter().copied()),
            Block::Bilateral { left, right } => Box::new(left.iter().chain(right.iter()).copied()),
        }
    }

    /// All comparisons implied by the block, in member order.
    pub fn comparisons(&self) -> Vec<Comparison> {
        let mut out = Vec::with_capacity(self.cardinality() as usize);
        match self {
            Block::Unilateral { entities } => {
                for (i, &a) in entities.iter().enumerate() {
                    for &b in &entities[i + 1..] {
                        out.push(Comparison::new(a, b));
                    }
                }
            }
            Block::Bilateral { left, right } => {
                for &a in left {
                    for &b in right {
                        out.push(Comparison::new(a, b));
                    }
                }
            }
        }
        out
    }
}

/// A set of records judged to refer to the same real-world entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Cluster {
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn new(mut members: Vec<usize>) -> Self {
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    pub fn singleton(index: usize) -> Self {
        Self { members: vec![index] }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}
