// src/evaluation/performance.rs - Stage quality against the ground truth
//
// Every function here reads its inputs only; none of them changes a stage output.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

use crate::loading::GroundTruth;
use crate::matching::MatchingOutcome;
use crate::models::core::{DatasetKind, ProfileStore};
use crate::models::matching::{Block, Cluster, Comparison};
use crate::models::stats_models::{CandidateStatistics, ClusteringStatistics, MatchStatistics};

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn f_measure(precision: f64, recall: f64) -> f64 {
    safe_ratio(2.0 * precision * recall, precision + recall)
}

/// Blocks as a candidate set. A ground-truth pair counts once no matter how
/// many blocks it shares.
pub fn evaluate_blocks(blocks: &[Block], ground_truth: &GroundTruth, store: &ProfileStore) -> CandidateStatistics {
    let mut memberships: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut comparisons = 0u64;
    for (block_id, block) in blocks.iter().enumerate() {
        comparisons += block.cardinality();
        for entity in block.entities() {
            memberships.entry(entity).or_default().push(block_id);
        }
    }

    let detected = ground_truth
        .iter()
        .filter(|pair| store.is_comparable(pair.left, pair.right))
        .filter(|pair| match (memberships.get(&pair.left), memberships.get(&pair.right)) {
            (Some(a), Some(b)) => share_any(a, b),
            _ => false,
        })
        .count();

    candidate_statistics(blocks.len(), comparisons, memberships.len(), detected, ground_truth.len())
}

/// Comparisons as a candidate set; each comparison is its own block.
pub fn evaluate_comparisons(comparisons: &[Comparison], ground_truth: &GroundTruth) -> CandidateStatistics {
    let distinct: HashSet<&Comparison> = comparisons.iter().collect();
    let detected = distinct.iter().filter(|c| ground_truth.contains(**c)).count();
    let covered: HashSet<usize> = comparisons.iter().flat_map(|c| [c.left, c.right]).collect();
    candidate_statistics(
        comparisons.len(),
        comparisons.len() as u64,
        covered.len(),
        detected,
        ground_truth.len(),
    )
}

fn candidate_statistics(
    blocks: usize,
    comparisons: u64,
    entities_covered: usize,
    detected: usize,
    existing: usize,
) -> CandidateStatistics {
    let pair_completeness = safe_ratio(detected as f64, existing as f64);
    let pair_quality = safe_ratio(detected as f64, comparisons as f64);
    CandidateStatistics {
        blocks,
        comparisons,
        entities_covered,
        detected_duplicates: detected,
        existing_duplicates: existing,
        pair_completeness,
        pair_quality,
        f_measure: f_measure(pair_quality, pair_completeness),
    }
}

/// Both lists are ascending block ids.
fn share_any(a: &[usize], b: &[usize]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => return true,
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    false
}

pub fn evaluate_matches(outcome: &MatchingOutcome, ground_truth: &GroundTruth) -> MatchStatistics {
    let detected: HashSet<Comparison> = outcome
        .pairs
        .iter()
        .map(|p| p.comparison())
        .filter(|c| ground_truth.contains(c))
        .collect();
    let precision = safe_ratio(detected.len() as f64, outcome.pairs.len() as f64);
    let recall = safe_ratio(detected.len() as f64, ground_truth.len() as f64);
    MatchStatistics {
        comparisons_executed: outcome.comparisons_executed,
        pairs_retained: outcome.pairs.len(),
        detected_duplicates: detected.len(),
        existing_duplicates: ground_truth.len(),
        precision,
        recall,
        f_measure: f_measure(precision, recall),
    }
}

/// Pairs a cluster implies: cross-source pairs for bilateral data, all pairs
/// otherwise.
pub fn implied_matches(cluster: &Cluster, store: &ProfileStore) -> u64 {
    let n = cluster.len() as u64;
    match store.kind() {
        DatasetKind::Unilateral => n * n.saturating_sub(1) / 2,
        DatasetKind::Bilateral => {
            let from_a = cluster.members.iter().filter(|&&m| m < store.split()).count() as u64;
            from_a * (n - from_a)
        }
    }
}

pub fn evaluate_clusters(clusters: &[Cluster], ground_truth: &GroundTruth, store: &ProfileStore) -> ClusteringStatistics {
    let mut cluster_of: HashMap<usize, usize> = HashMap::new();
    for (id, cluster) in clusters.iter().enumerate() {
        for &member in &cluster.members {
            cluster_of.insert(member, id);
        }
    }

    let total_matches: u64 = clusters.iter().map(|c| implied_matches(c, store)).sum();
    let detected = ground_truth
        .iter()
        .filter(|pair| store.is_comparable(pair.left, pair.right))
        .filter(|pair| match (cluster_of.get(&pair.left), cluster_of.get(&pair.right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        })
        .count();

    let precision = safe_ratio(detected as f64, total_matches as f64);
    let recall = safe_ratio(detected as f64, ground_truth.len() as f64);
    ClusteringStatistics {
        clusters: clusters.len(),
        non_singleton_clusters: clusters.iter().filter(|c| c.len() > 1).count(),
        total_matches,
        detected_duplicates: detected,
        existing_duplicates: ground_truth.len(),
        precision,
        recall,
        f_measure: f_measure(precision, recall),
    }
}

/// SHA-256 over the cluster partition. Clusters arrive sorted, so equal
/// partitions hash equally.
pub fn fingerprint(clusters: &[Cluster]) -> String {
    let mut hasher = Sha256::new();
    for cluster in clusters {
        for member in &cluster.members {
            hasher.update(member.to_le_bytes());
        }
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}
