// src/loading/ground_truth.rs - Known duplicate pairs, used only for evaluation

use log::{info, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{DedupeError, DedupeResult};
use crate::models::core::{DatasetKind, ProfileStore, Source};
use crate::models::matching::Comparison;

#[derive(Debug, Clone)]
pub struct GroundTruthOptions {
    pub separator: u8,
    /// Skip the first row (a header) of the file.
    pub ignore_first_row: bool,
}

impl Default for GroundTruthOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            ignore_first_row: true,
        }
    }
}

/// Duplicate pairs expressed in the store's global index space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundTruth {
    duplicates: HashSet<Comparison>,
}

impl GroundTruth {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self {
            duplicates: pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| Comparison::new(a, b))
                .collect(),
        }
    }

    /// Resolves (id, id) rows against the store. Unknown identifiers are skipped.
    pub fn from_id_pairs<'a>(
        store: &ProfileStore,
        id_pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> (Self, usize) {
        let mut duplicates = HashSet::new();
        let mut unresolved = 0;
        for (id1, id2) in id_pairs {
            match resolve_pair(store, id1, id2) {
                Some(comparison) => {
                    duplicates.insert(comparison);
                }
                None => unresolved += 1,
            }
        }
        (Self { duplicates }, unresolved)
    }

    pub fn len(&self) -> usize {
        self.duplicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comparison> {
        self.duplicates.iter()
    }

    pub fn contains(&self, comparison: &Comparison) -> bool {
        self.duplicates.contains(comparison)
    }

    pub fn is_duplicate(&self, a: usize, b: usize) -> bool {
        a != b && self.duplicates.contains(&Comparison::new(a, b))
    }
}

fn resolve_pair(store: &ProfileStore, id1: &str, id2: &str) -> Option<Comparison> {
    match store.kind() {
        DatasetKind::Unilateral => {
            let a = store.index_of(Source::A, id1)?;
            let b = store.index_of(Source::A, id2)?;
            (a != b).then(|| Comparison::new(a, b))
        }
        DatasetKind::Bilateral => {
            let direct = store
                .index_of(Source::A, id1)
                .zip(store.index_of(Source::B, id2));
            let swapped = || {
                store
                    .index_of(Source::A, id2)
                    .zip(store.index_of(Source::B, id1))
            };
            direct.or_else(swapped).map(|(a, b)| Comparison::new(a, b))
        }
    }
}

pub fn load_ground_truth(
    path: &Path,
    store: &ProfileStore,
    options: &GroundTruthOptions,
) -> DedupeResult<GroundTruth> {
    let file = File::open(path).map_err(|e| DedupeError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.separator)
        .has_headers(options.ignore_first_row)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let row = e.position().map(|p| p.line()).unwrap_or(0);
            DedupeError::parse(path, row, e.to_string())
        })?;
        let row = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() < 2 {
            return Err(DedupeError::parse(
                path,
                row,
                format!("expected 2 columns, found {}", record.len()),
            ));
        }
        let id1 = record[0].trim().to_string();
        let id2 = record[1].trim().to_string();
        if id1.is_empty() || id2.is_empty() {
            return Err(DedupeError::parse(path, row, "missing identifier"));
        }
        rows.push((id1, id2));
    }

    let (ground_truth, unresolved) =
        GroundTruth::from_id_pairs(store, rows.iter().map(|(a, b)| (a.as_str(), b.as_str())));
    if unresolved > 0 {
        warn!(
            "⚠️ {} ground-truth rows in {} reference unknown profiles and were skipped",
            unresolved,
            path.display()
        );
    }
    info!(
        "📥 Loaded {} duplicate pairs from {}",
        ground_truth.len(),
        path.display()
    );
    Ok(ground_truth)
}
