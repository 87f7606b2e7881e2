// src/matching/representation.rs - Attribute-value representation models

use log::debug;
use ndarray::Array1;
use std::collections::{BTreeMap, HashMap};

use crate::error::{DedupeError, DedupeResult};
use crate::loading::WordVectors;
use crate::models::core::ProfileStore;
use crate::utils::pipeline_config::{ModelFamily, RepresentationModel};
use crate::utils::text::{char_ngrams, normalize, token_ngrams, tokenize};

/// Term weights sorted by term id.
pub type SparseVector = Vec<(u32, f64)>;

#[derive(Debug, Clone, PartialEq)]
pub enum ValueRepresentation {
    Bag(SparseVector),
    /// None when no token of the value has a known embedding.
    Dense(Option<Array1<f32>>),
    Text(String),
}

/// Representations of every attribute value in a store, indexed by global
/// record index and then attribute position.
#[derive(Debug, Clone)]
pub struct StoreRepresentations {
    records: Vec<Vec<ValueRepresentation>>,
    vocabulary_size: usize,
}

impl StoreRepresentations {
    pub fn build(
        model: RepresentationModel,
        store: &ProfileStore,
        word_vectors: Option<&WordVectors>,
    ) -> DedupeResult<Self> {
        match model.family() {
            ModelFamily::BagOfGrams => Ok(build_bags(model, store)),
            ModelFamily::DenseEmbedding => {
                let vectors = word_vectors.ok_or_else(|| {
                    DedupeError::config(format!("representation model '{}' requires word vectors", model))
                })?;
                let records = store
                    .profiles()
                    .iter()
                    .map(|p| {
                        p.values()
                            .map(|v| {
                                let tokens = tokenize(v);
                                ValueRepresentation::Dense(vectors.average(tokens.iter().map(String::as_str)))
                            })
                            .collect()
                    })
                    .collect();
                Ok(Self {
                    records,
                    vocabulary_size: vectors.len(),
                })
            }
            ModelFamily::RawString => {
                let records = store
                    .profiles()
                    .iter()
                    .map(|p| p.values().map(|v| ValueRepresentation::Text(normalize(v))).collect())
                    .collect();
                Ok(Self {
                    records,
                    vocabulary_size: 0,
                })
            }
        }
    }

    pub fn record(&self, index: usize) -> &[ValueRepresentation] {
        self.records.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct terms (bag models) or known words (embeddings).
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }
}

/// The n-grams a bag model extracts from one value.
pub fn grams(model: RepresentationModel, value: &str) -> Vec<String> {
    use RepresentationModel::*;
    match model {
        TokenUnigrams | TokenUnigramsTfIdf => token_ngrams(value, 1),
        TokenBigrams | TokenBigramsTfIdf => token_ngrams(value, 2),
        TokenTrigrams | TokenTrigramsTfIdf => token_ngrams(value, 3),
        CharacterBigrams => char_ngrams(value, 2),
        CharacterTrigrams | CharacterTrigramsTfIdf => char_ngrams(value, 3),
        PretrainedWordVectors | NormalizedString => tokenize(value),
    }
}

/// Term ids are assigned in first-seen order over the store, so vectors do
/// not depend on hash iteration order. Every attribute value is one document
/// for document frequencies.
fn build_bags(model: RepresentationModel, store: &ProfileStore) -> StoreRepresentations {
    let mut vocabulary: HashMap<String, u32> = HashMap::new();
    let mut document_frequency: Vec<u32> = Vec::new();
    let mut total_documents = 0usize;

    let documents: Vec<Vec<Vec<u32>>> = store
        .profiles()
        .iter()
        .map(|profile| {
            profile
                .values()
                .map(|value| {
                    total_documents += 1;
                    let ids: Vec<u32> = grams(model, value)
                        .into_iter()
                        .map(|gram| {
                            let next = vocabulary.len() as u32;
                            let id = *vocabulary.entry(gram).or_insert(next);
                            if id as usize == document_frequency.len() {
                                document_frequency.push(0);
                            }
                            id
                        })
                        .collect();
                    let mut distinct = ids.clone();
                    distinct.sort_unstable();
                    distinct.dedup();
                    for id in distinct {
                        document_frequency[id as usize] += 1;
                    }
                    ids
                })
                .collect()
        })
        .collect();

    let idf: Option<Vec<f64>> = model.uses_idf().then(|| {
        document_frequency
            .iter()
            .map(|&df| (1.0 + total_documents as f64 / df as f64).ln())
            .collect()
    });

    debug!(
        "Built {} vocabulary over {} attribute values (idf: {})",
        vocabulary.len(),
        total_documents,
        idf.is_some()
    );

    let records = documents
        .into_iter()
        .map(|values| {
            values
                .into_iter()
                .map(|ids| ValueRepresentation::Bag(weigh(&ids, idf.as_deref())))
                .collect()
        })
        .collect();

    StoreRepresentations {
        records,
        vocabulary_size: vocabulary.len(),
    }
}

/// Term frequency normalized by the value's term count, optionally scaled by idf.
fn weigh(ids: &[u32], idf: Option<&[f64]>) -> SparseVector {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for &id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    let total = ids.len() as f64;
    counts
        .into_iter()
        .map(|(id, count)| {
            let tf = count as f64 / total;
            let weight = idf.map_or(tf, |idf| tf * idf[id as usize]);
            (id, weight)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::EntityProfile;

    fn store() -> ProfileStore {
        ProfileStore::bilateral(
            vec![EntityProfile::new("a1")
                .with_attribute("title", "ipod nano ipod")
                .with_attribute("maker", "apple")],
            vec![EntityProfile::new("g1").with_attribute("name", "Apple iPod")],
        )
        .unwrap()
    }

    #[test]
    fn test_term_frequencies() {
        let reps = StoreRepresentations::build(RepresentationModel::TokenUnigrams, &store(), None).unwrap();
        // ids: ipod=0, nano=1, apple=2
        assert_eq!(reps.vocabulary_size(), 3);
        assert_eq!(
            reps.record(0)[0],
            ValueRepresentation::Bag(vec![(0, 2.0 / 3.0), (1, 1.0 / 3.0)])
        );
        assert_eq!(reps.record(1)[0], ValueRepresentation::Bag(vec![(0, 0.5), (2, 0.5)]));
    }

    #[test]
    fn test_idf_is_smoothed() {
        let reps = StoreRepresentations::build(RepresentationModel::TokenUnigramsTfIdf, &store(), None).unwrap();
        // three documents; "apple" appears in two of them
        let ValueRepresentation::Bag(maker) = &reps.record(0)[1] else {
            panic!("expected a bag");
        };
        assert_eq!(maker.len(), 1);
        assert!((maker[0].1 - (1.0f64 + 3.0 / 2.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_identical_values_share_vectors() {
        let store = ProfileStore::bilateral(
            vec![EntityProfile::new("a").with_attribute("t", "canon eos")],
            vec![EntityProfile::new("b").with_attribute("t", "Canon EOS")],
        )
        .unwrap();
        let reps =
            StoreRepresentations::build(RepresentationModel::CharacterTrigramsTfIdf, &store, None).unwrap();
        assert_eq!(reps.record(0), reps.record(1));
    }

    #[test]
    fn test_dense_model_needs_vectors() {
        assert!(matches!(
            StoreRepresentations::build(RepresentationModel::PretrainedWordVectors, &store(), None),
            Err(DedupeError::Configuration(_))
        ));

        let vectors = WordVectors::from_entries(vec![("apple".to_string(), vec![1.0, 0.0])]).unwrap();
        let reps =
            StoreRepresentations::build(RepresentationModel::PretrainedWordVectors, &store(), Some(&vectors))
                .unwrap();
        assert_eq!(reps.record(0)[0], ValueRepresentation::Dense(None));
        assert_eq!(
            reps.record(0)[1],
            ValueRepresentation::Dense(Some(Array1::from(vec![1.0f32, 0.0])))
        );
    }

    #[test]
    fn test_raw_strings_are_normalized() {
        let reps = StoreRepresentations::build(RepresentationModel::NormalizedString, &store(), None).unwrap();
        assert_eq!(reps.record(1)[0], ValueRepresentation::Text("apple ipod".to_string()));
        assert!(reps.record(7).is_empty());
    }
}
