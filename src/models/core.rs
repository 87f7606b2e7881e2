// src/models/core.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{DedupeError, DedupeResult};

/// A single attribute of a profile. Empty values are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An entity record: identifier plus ordered attribute-value pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityProfile {
    pub id: String,
    pub attributes: Vec<Attribute>,
}

impl EntityProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Vec::new(),
        }
    }

    /// Builder-style helper, mostly for fixtures.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(name, value);
        self
    }

    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.attributes.push(Attribute {
            name: name.into(),
            value,
        });
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DatasetKind {
    /// Dirty ER: one collection deduplicated against itself.
    Unilateral,
    /// Clean-clean ER: two duplicate-free collections linked to each other.
    Bilateral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Source {
    A,
    B,
}

/// Holds the loaded profiles of one or two sources in a single index space.
///
/// Source A occupies global indices `0..split`, source B `split..len`.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    profiles: Vec<EntityProfile>,
    split: usize,
    kind: DatasetKind,
    ids_a: HashMap<String, usize>,
    ids_b: HashMap<String, usize>,
}

impl ProfileStore {
    pub fn unilateral(profiles: Vec<EntityProfile>) -> DedupeResult<Self> {
        let ids_a = index_ids(&profiles, 0, "source A")?;
        let split = profiles.len();
        Ok(Self {
            profiles,
            split,
            kind: DatasetKind::Unilateral,
            ids_a,
            ids_b: HashMap::new(),
        })
    }

    pub fn bilateral(source_a: Vec<EntityProfile>, source_b: Vec<EntityProfile>) -> DedupeResult<Self> {
        let split = source_a.len();
        let ids_a = index_ids(&source_a, 0, "source A")?;
        let ids_b = index_ids(&source_b, split, "source B")?;
        let mut profiles = source_a;
        profiles.extend(source_b);
        Ok(Self {
            profiles,
            split,
            kind: DatasetKind::Bilateral,
            ids_a,
            ids_b,
        })
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Number of profiles in source A.
    pub fn split(&self) -> usize {
        self.split
    }

    pub fn len_of(&self, source: Source) -> usize {
        match source {
            Source::A => self.split,
            Source::B => self.profiles.len() - self.split,
        }
    }

    pub fn profiles(&self) -> &[EntityProfile] {
        &self.profiles
    }

    pub fn profile(&self, index: usize) -> Option<&EntityProfile> {
        self.profiles.get(index)
    }

    pub fn id_of(&self, index: usize) -> &str {
        &self.profiles[index].id
    }

    pub fn source_of(&self, index: usize) -> Source {
        if index < self.split {
            Source::A
        } else {
            Source::B
        }
    }

    pub fn index_of(&self, source: Source, id: &str) -> Option<usize> {
        match source {
            Source::A => self.ids_a.get(id).copied(),
            Source::B => self.ids_b.get(id).copied(),
        }
    }

    /// Whether two records may be compared under this dataset kind.
    pub fn is_comparable(&self, i: usize, j: usize) -> bool {
        match self.kind {
            DatasetKind::Unilateral => i != j,
            DatasetKind::Bilateral => self.source_of(i) != self.source_of(j),
        }
    }
}

fn index_ids(
    profiles: &[EntityProfile],
    offset: usize,
    label: &str,
) -> DedupeResult<HashMap<String, usize>> {
    let mut ids = HashMap::with_capacity(profiles.len());
    for (i, profile) in profiles.iter().enumerate() {
        if ids.insert(profile.id.clone(), offset + i).is_some() {
            return Err(DedupeError::Parse {
                path: label.to_string(),
                row: (i + 1) as u64,
                reason: format!("duplicate identifier '{}'", profile.id),
            });
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilateral_index_space() {
        let store = ProfileStore::bilateral(
            vec![EntityProfile::new("a1"), EntityProfile::new("a2")],
            vec![EntityProfile::new("b1")],
        )
        .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.split(), 2);
        assert_eq!(store.len_of(Source::B), 1);
        assert_eq!(store.source_of(1), Source::A);
        assert_eq!(store.source_of(2), Source::B);
        assert_eq!(store.index_of(Source::B, "b1"), Some(2));
        assert_eq!(store.index_of(Source::A, "b1"), None);
        assert!(store.is_comparable(0, 2));
        assert!(!store.is_comparable(0, 1));
    }

    #[test]
    fn test_duplicate_ids_are_parse_errors() {
        let result = ProfileStore::unilateral(vec![EntityProfile::new("x"), EntityProfile::new("x")]);
        assert!(matches!(result, Err(DedupeError::Parse { row: 2, .. })));

        let result = ProfileStore::bilateral(
            vec![EntityProfile::new("a1")],
            vec![EntityProfile::new("b1"), EntityProfile::new("b2"), EntityProfile::new("b1")],
        );
        match result {
            Err(DedupeError::Parse { path, row, .. }) => {
                assert_eq!(path, "source B");
                assert_eq!(row, 3);
            }
            other => panic!("expected a parse error, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_empty_values_are_not_stored() {
        let profile = EntityProfile::new("p")
            .with_attribute("title", "ipod")
            .with_attribute("price", "  ");
        assert_eq!(profile.attributes.len(), 1);
    }
}
