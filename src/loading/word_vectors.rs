// src/loading/word_vectors.rs - Pretrained word embeddings in text format

use log::info;
use ndarray::Array1;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{DedupeError, DedupeResult};

/// Word → dense vector lookup; all vectors share one dimension.
#[derive(Debug, Clone)]
pub struct WordVectors {
    dimension: usize,
    vectors: HashMap<String, Array1<f32>>,
}

impl WordVectors {
    /// Builds a table from in-memory vectors; every vector must share a dimension.
    pub fn from_entries(entries: Vec<(String, Vec<f32>)>) -> DedupeResult<Self> {
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut vectors = HashMap::with_capacity(entries.len());
        for (word, values) in entries {
            if values.len() != dimension {
                return Err(DedupeError::config(format!(
                    "vector for '{}' has dimension {}, expected {}",
                    word,
                    values.len(),
                    dimension
                )));
            }
            vectors.insert(word.to_lowercase(), Array1::from(values));
        }
        Ok(Self { dimension, vectors })
    }

    /// Reads `word v1 v2 ...` lines. A leading `count dimension` header line,
    /// as written by word2vec, is recognised and skipped.
    pub fn load(path: &Path) -> DedupeResult<Self> {
        let file = File::open(path).map_err(|e| DedupeError::io(path, e))?;
        let reader = BufReader::new(file);

        let mut dimension = 0usize;
        let mut vectors = HashMap::new();
        for (i, line) in reader.lines().enumerate() {
            let row = i as u64 + 1;
            let line = line.map_err(|e| DedupeError::io(path, e))?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let values: Vec<&str> = parts.collect();

            if row == 1 && values.len() == 1 && word.parse::<usize>().is_ok() && values[0].parse::<usize>().is_ok() {
                continue;
            }

            let parsed: Result<Vec<f32>, _> = values.iter().map(|v| v.parse::<f32>()).collect();
            let parsed = parsed.map_err(|e| DedupeError::parse(path, row, format!("invalid vector component: {}", e)))?;
            if parsed.is_empty() {
                return Err(DedupeError::parse(path, row, format!("no vector for word '{}'", word)));
            }
            if dimension == 0 {
                dimension = parsed.len();
            } else if parsed.len() != dimension {
                return Err(DedupeError::parse(
                    path,
                    row,
                    format!("expected {} components, found {}", dimension, parsed.len()),
                ));
            }
            vectors.insert(word.to_lowercase(), Array1::from(parsed));
        }

        info!(
            "📥 Loaded {} word vectors of dimension {} from {}",
            vectors.len(),
            dimension,
            path.display()
        );
        Ok(Self { dimension, vectors })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<&Array1<f32>> {
        self.vectors.get(word)
    }

    /// Mean vector of the known tokens, or None when no token is known.
    pub fn average<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> Option<Array1<f32>> {
        let mut sum = Array1::<f32>::zeros(self.dimension);
        let mut found = 0usize;
        for token in tokens {
            if let Some(vector) = self.vectors.get(token) {
                sum += vector;
                found += 1;
            }
        }
        (found > 0).then(|| sum / found as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "2 3\nipod 1.0 0.0 0.0\nNano 0.0 1.0 0.0\n").unwrap();

        let vectors = WordVectors::load(&path).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors.dimension(), 3);
        let avg = vectors.average(["ipod", "nano", "unknown"]).unwrap();
        assert_eq!(avg.to_vec(), vec![0.5, 0.5, 0.0]);
        assert!(vectors.average(["unknown"]).is_none());
    }

    #[test]
    fn test_inconsistent_dimension_reports_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "a 1 2\nb 1 2 3\n").unwrap();
        assert!(matches!(WordVectors::load(&path), Err(DedupeError::Parse { row: 2, .. })));
    }
}
