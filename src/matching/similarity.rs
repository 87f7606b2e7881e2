// src/matching/similarity.rs - Value-level similarity metrics, all mapped into [0, 1]

use ndarray::Array1;

use crate::matching::representation::{SparseVector, ValueRepresentation};
use crate::utils::pipeline_config::SimilarityMetric;

/// Similarity of two attribute-value representations under `metric`.
/// Representations of different kinds never match.
pub fn value_similarity(
    metric: SimilarityMetric,
    a: &ValueRepresentation,
    b: &ValueRepresentation,
) -> f64 {
    let raw = match (a, b) {
        (ValueRepresentation::Bag(x), ValueRepresentation::Bag(y)) => match metric {
            SimilarityMetric::Cosine => sparse_cosine(x, y),
            SimilarityMetric::Jaccard => sparse_jaccard(x, y),
            SimilarityMetric::GeneralizedJaccard => generalized_jaccard(x, y),
            _ => 0.0,
        },
        (ValueRepresentation::Dense(Some(x)), ValueRepresentation::Dense(Some(y))) => match metric {
            SimilarityMetric::Cosine => dense_cosine(x, y),
            SimilarityMetric::Euclidean => euclidean_similarity(x, y),
            _ => 0.0,
        },
        (ValueRepresentation::Text(x), ValueRepresentation::Text(y)) => {
            if x.is_empty() || y.is_empty() {
                0.0
            } else {
                match metric {
                    SimilarityMetric::JaroWinkler => strsim::jaro_winkler(x, y),
                    SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(x, y),
                    _ => 0.0,
                }
            }
        }
        _ => 0.0,
    };
    raw.clamp(0.0, 1.0)
}

fn norm(v: &SparseVector) -> f64 {
    v.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
}

/// Walks two id-sorted vectors in step. `visit` receives both weights for a
/// shared id and one weight for an id present on a single side.
fn merge_join(a: &SparseVector, b: &SparseVector, mut visit: impl FnMut(Option<f64>, Option<f64>)) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (ta, wa) = a[i];
        let (tb, wb) = b[j];
        if ta == tb {
            visit(Some(wa), Some(wb));
            i += 1;
            j += 1;
        } else if ta < tb {
            visit(Some(wa), None);
            i += 1;
        } else {
            visit(None, Some(wb));
            j += 1;
        }
    }
    a[i..].iter().for_each(|&(_, w)| visit(Some(w), None));
    b[j..].iter().for_each(|&(_, w)| visit(None, Some(w)));
}

pub fn sparse_cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let denominator = norm(a) * norm(b);
    if denominator == 0.0 {
        return 0.0;
    }
    let mut dot = 0.0;
    merge_join(a, b, |x, y| {
        if let (Some(x), Some(y)) = (x, y) {
            dot += x * y;
        }
    });
    dot / denominator
}

/// Set overlap of the terms, ignoring weights.
pub fn sparse_jaccard(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut shared, mut union) = (0usize, 0usize);
    merge_join(a, b, |x, y| {
        union += 1;
        if x.is_some() && y.is_some() {
            shared += 1;
        }
    });
    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

/// Σ min(w) / Σ max(w) over the union of terms.
pub fn generalized_jaccard(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut minimum, mut maximum) = (0.0, 0.0);
    merge_join(a, b, |x, y| {
        let (x, y) = (x.unwrap_or(0.0), y.unwrap_or(0.0));
        minimum += x.min(y);
        maximum += x.max(y);
    });
    if maximum == 0.0 {
        0.0
    } else {
        minimum / maximum
    }
}

/// Cosine of two embeddings; opposed vectors are floored to 0.
pub fn dense_cosine(a: &Array1<f32>, b: &Array1<f32>) -> f64 {
    let denominator = (a.dot(a) as f64).sqrt() * (b.dot(b) as f64).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    (a.dot(b) as f64 / denominator).max(0.0)
}

/// `1 / (1 + d)` for Euclidean distance `d`.
pub fn euclidean_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f64 {
    let distance = (a - b).mapv(|x| (x as f64) * (x as f64)).sum().sqrt();
    1.0 / (1.0 + distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn bag(entries: &[(u32, f64)]) -> ValueRepresentation {
        ValueRepresentation::Bag(entries.to_vec())
    }

    #[test]
    fn test_sparse_metrics() {
        let a = vec![(0, 1.0), (1, 1.0)];
        let b = vec![(1, 1.0), (2, 1.0)];
        assert!((sparse_cosine(&a, &b) - 0.5).abs() < 1e-12);
        assert!((sparse_jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-12);
        assert!((sparse_cosine(&a, &a) - 1.0).abs() < 1e-12);

        let weighted_a = vec![(0, 0.5), (1, 0.5)];
        let weighted_b = vec![(0, 0.25), (1, 0.75)];
        // (0.25 + 0.5) / (0.5 + 0.75)
        assert!((generalized_jaccard(&weighted_a, &weighted_b) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_empty_bags_score_zero() {
        let empty = Vec::new();
        let some = vec![(3, 1.0)];
        assert_eq!(sparse_cosine(&empty, &some), 0.0);
        assert_eq!(sparse_jaccard(&empty, &empty), 0.0);
        assert_eq!(generalized_jaccard(&empty, &some), 0.0);
    }

    #[test]
    fn test_dense_metrics() {
        let x = array![1.0f32, 0.0];
        let y = array![-1.0f32, 0.0];
        assert_eq!(dense_cosine(&x, &y), 0.0);
        assert!((dense_cosine(&x, &x) - 1.0).abs() < 1e-9);
        assert_eq!(euclidean_similarity(&x, &x), 1.0);
        assert!((euclidean_similarity(&x, &y) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_string_metrics_and_mismatched_kinds() {
        let a = ValueRepresentation::Text("adobe photoshop".to_string());
        let b = ValueRepresentation::Text("adobe photoshop".to_string());
        assert_eq!(value_similarity(SimilarityMetric::Levenshtein, &a, &b), 1.0);
        assert_eq!(value_similarity(SimilarityMetric::JaroWinkler, &a, &b), 1.0);

        let empty = ValueRepresentation::Text(String::new());
        assert_eq!(value_similarity(SimilarityMetric::JaroWinkler, &empty, &empty), 0.0);

        assert_eq!(value_similarity(SimilarityMetric::Cosine, &a, &bag(&[(0, 1.0)])), 0.0);
        assert_eq!(
            value_similarity(
                SimilarityMetric::Cosine,
                &ValueRepresentation::Dense(None),
                &ValueRepresentation::Dense(Some(array![1.0f32]))
            ),
            0.0
        );
    }

    #[test]
    fn test_results_stay_in_unit_interval() {
        let a = bag(&[(0, 0.3), (4, 0.1)]);
        let b = bag(&[(0, 0.3), (4, 0.1)]);
        for metric in [SimilarityMetric::Cosine, SimilarityMetric::Jaccard, SimilarityMetric::GeneralizedJaccard] {
            let s = value_similarity(metric, &a, &b);
            assert!((0.0..=1.0).contains(&s));
            assert!((s - 1.0).abs() < 1e-9);
        }
    }
}
