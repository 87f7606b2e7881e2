// src/matching/group_linkage.rs - Group Linkage similarity between attribute groups

use indicatif::MultiProgress;
use log::{debug, info};
use rayon::prelude::*;
use std::cmp::Ordering;

use crate::error::DedupeResult;
use crate::loading::WordVectors;
use crate::matching::representation::{StoreRepresentations, ValueRepresentation};
use crate::matching::similarity::value_similarity;
use crate::models::core::ProfileStore;
use crate::models::matching::{Comparison, ScoredPair};
use crate::utils::pipeline_config::{MatcherConfig, ModelFamily};
use crate::utils::progress_bars::stage_progress_bar;

/// Scored pairs that cleared the matching threshold, plus execution counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchingOutcome {
    /// In comparison order.
    pub pairs: Vec<ScoredPair>,
    pub comparisons_executed: usize,
    pub below_threshold: usize,
}

/// Treats each record as a group of attribute-value representations and
/// scores two groups by a greedy maximum-weight bipartite matching.
pub struct GroupLinkage {
    config: MatcherConfig,
    representations: StoreRepresentations,
}

impl GroupLinkage {
    /// Builds representations for every record in `store`, loading the word
    /// vectors first when the model needs them.
    pub fn new(config: &MatcherConfig, store: &ProfileStore) -> DedupeResult<Self> {
        let word_vectors = Self::load_word_vectors(config)?;
        Self::with_word_vectors(config, store, word_vectors.as_ref())
    }

    /// Reads the configured word-vector file for dense models; None for the
    /// other model families.
    pub fn load_word_vectors(config: &MatcherConfig) -> DedupeResult<Option<WordVectors>> {
        match (config.model().family(), config.embeddings_path()) {
            (ModelFamily::DenseEmbedding, Some(path)) => Ok(Some(WordVectors::load(path)?)),
            _ => Ok(None),
        }
    }

    pub fn with_word_vectors(
        config: &MatcherConfig,
        store: &ProfileStore,
        word_vectors: Option<&WordVectors>,
    ) -> DedupeResult<Self> {
        let representations = StoreRepresentations::build(config.model(), store, word_vectors)?;
        debug!(
            "Represented {} records with {} ({} vocabulary entries)",
            representations.len(),
            config.model(),
            representations.vocabulary_size()
        );
        Ok(Self {
            config: config.clone(),
            representations,
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Group similarity of two records, in `[0, 1]`.
    pub fn score(&self, comparison: Comparison) -> f64 {
        group_similarity(
            self.representations.record(comparison.left),
            self.representations.record(comparison.right),
            &self.config,
        )
    }

    /// Scores every comparison on the current rayon pool and keeps the pairs
    /// clearing the threshold, preserving input order.
    pub fn execute_comparisons(
        &self,
        comparisons: &[Comparison],
        multi_progress: Option<MultiProgress>,
    ) -> MatchingOutcome {
        let pb = stage_progress_bar(
            &multi_progress,
            comparisons.len() as u64,
            "Group linkage: scoring comparisons...",
        );

        let scored: Vec<(Comparison, f64)> = comparisons
            .par_iter()
            .map(|&comparison| {
                let similarity = self.score(comparison);
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
                (comparison, similarity)
            })
            .collect();

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        let mut outcome = MatchingOutcome {
            comparisons_executed: scored.len(),
            ..Default::default()
        };
        for (comparison, similarity) in scored {
            if self.config.clears(similarity) {
                outcome.pairs.push(ScoredPair {
                    left: comparison.left,
                    right: comparison.right,
                    similarity,
                });
            } else {
                outcome.below_threshold += 1;
            }
        }

        info!(
            "⚖️ Group linkage retained {}/{} pairs ({} below threshold {})",
            outcome.pairs.len(),
            outcome.comparisons_executed,
            outcome.below_threshold,
            self.config.threshold()
        );
        outcome
    }
}

/// `Σ matched weights / (|a| + |b| − |matched|)`. Only attribute pairs
/// clearing the threshold are eligible edges; edges are taken greedily by
/// descending weight, ties by attribute positions.
pub fn group_similarity(
    a: &[ValueRepresentation],
    b: &[ValueRepresentation],
    config: &MatcherConfig,
) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut edges: Vec<(usize, usize, f64)> = Vec::new();
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            let similarity = value_similarity(config.metric(), x, y);
            if config.clears(similarity) {
                edges.push((i, j, similarity));
            }
        }
    }
    if edges.is_empty() {
        return 0.0;
    }

    edges.sort_by(|x, y| {
        y.2.partial_cmp(&x.2)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (x.0, x.1).cmp(&(y.0, y.1)))
    });

    let mut used_a = vec![false; a.len()];
    let mut used_b = vec![false; b.len()];
    let mut matched = 0usize;
    let mut total = 0.0;
    for (i, j, similarity) in edges {
        if used_a[i] || used_b[j] {
            continue;
        }
        used_a[i] = true;
        used_b[j] = true;
        matched += 1;
        total += similarity;
    }

    let denominator = (a.len() + b.len() - matched) as f64;
    (total / denominator).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::EntityProfile;
    use crate::utils::pipeline_config::{RepresentationModel, SimilarityMetric};

    fn config(threshold: f64) -> MatcherConfig {
        MatcherConfig::new(
            RepresentationModel::TokenUnigramsTfIdf,
            SimilarityMetric::Cosine,
            threshold,
            None,
        )
        .unwrap()
    }

    fn bag(entries: &[(u32, f64)]) -> ValueRepresentation {
        ValueRepresentation::Bag(entries.to_vec())
    }

    #[test]
    fn test_identical_groups_score_one() {
        let store = ProfileStore::bilateral(
            vec![EntityProfile::new("a1")
                .with_attribute("title", "adobe photoshop cs3")
                .with_attribute("maker", "adobe")],
            vec![EntityProfile::new("g1")
                .with_attribute("name", "Adobe Photoshop CS3")
                .with_attribute("manufacturer", "Adobe")],
        )
        .unwrap();
        let matcher = GroupLinkage::new(&config(0.0), &store).unwrap();
        assert!((matcher.score(Comparison::new(0, 1)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_greedy_matching_and_denominator() {
        let a = vec![bag(&[(0, 1.0)]), bag(&[(1, 1.0)])];
        let b = vec![bag(&[(0, 1.0)]), bag(&[(2, 1.0)]), bag(&[(3, 1.0)])];
        // one matched edge of weight 1 over 2 + 3 - 1 group members
        assert!((group_similarity(&a, &b, &config(0.1)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_each_attribute_is_used_once() {
        let a = vec![bag(&[(0, 1.0)])];
        let b = vec![bag(&[(0, 1.0)]), bag(&[(0, 1.0)])];
        assert!((group_similarity(&a, &b, &config(0.1)) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_weak_edges_are_ignored_and_empty_groups_score_zero() {
        let a = vec![bag(&[(0, 1.0), (1, 1.0)])];
        let b = vec![bag(&[(1, 1.0), (2, 1.0)])];
        // cosine 0.5 does not clear 0.6
        assert_eq!(group_similarity(&a, &b, &config(0.6)), 0.0);
        assert!((group_similarity(&a, &b, &config(0.5)) - 0.5).abs() < 1e-12);
        assert_eq!(group_similarity(&[], &b, &config(0.0)), 0.0);
    }

    #[test]
    fn test_execute_comparisons_counts_and_filters() {
        let store = ProfileStore::bilateral(
            vec![
                EntityProfile::new("a1").with_attribute("title", "canon powershot"),
                EntityProfile::new("a2").with_attribute("title", "garmin nuvi"),
            ],
            vec![EntityProfile::new("g1").with_attribute("name", "canon powershot sd1000")],
        )
        .unwrap();
        let matcher = GroupLinkage::new(&config(0.1), &store).unwrap();
        let outcome = matcher.execute_comparisons(&[Comparison::new(0, 2), Comparison::new(1, 2)], None);

        assert_eq!(outcome.comparisons_executed, 2);
        assert_eq!(outcome.below_threshold, 1);
        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!((outcome.pairs[0].left, outcome.pairs[0].right), (0, 2));
        assert!(outcome.pairs[0].similarity > 0.1 && outcome.pairs[0].similarity <= 1.0);
    }
}
