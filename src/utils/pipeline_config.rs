// src/utils/pipeline_config.rs - Method selection and validated stage parameters

use log::info;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{DedupeError, DedupeResult};
use crate::utils::env::{list_env_var, parse_env_var};

pub const DEFAULT_WINDOW_SIZE: usize = 2;
pub const DEFAULT_FILTER_RATIO: f64 = 0.8;
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.1;
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.1;

/// Generates `name()`, `Display` and a forgiving `FromStr` for a fieldless enum.
macro_rules! named_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase().replace('-', "_");
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == wanted)
                    .ok_or_else(|| {
                        let options: Vec<&str> = $ty::ALL.iter().map(|v| v.name()).collect();
                        format!("unknown {} '{}', expected one of: {}", stringify!($ty), s, options.join(", "))
                    })
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockingMethod {
    ExtendedSortedNeighborhood,
    SortedNeighborhood,
}

named_enum!(BlockingMethod {
    ExtendedSortedNeighborhood => "extended_sorted_neighborhood",
    SortedNeighborhood => "sorted_neighborhood",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationModel {
    TokenUnigrams,
    TokenBigrams,
    TokenTrigrams,
    CharacterBigrams,
    CharacterTrigrams,
    TokenUnigramsTfIdf,
    TokenBigramsTfIdf,
    TokenTrigramsTfIdf,
    CharacterTrigramsTfIdf,
    PretrainedWordVectors,
    NormalizedString,
}

named_enum!(RepresentationModel {
    TokenUnigrams => "token_unigrams",
    TokenBigrams => "token_bigrams",
    TokenTrigrams => "token_trigrams",
    CharacterBigrams => "character_bigrams",
    CharacterTrigrams => "character_trigrams",
    TokenUnigramsTfIdf => "token_unigrams_tf_idf",
    TokenBigramsTfIdf => "token_bigrams_tf_idf",
    TokenTrigramsTfIdf => "token_trigrams_tf_idf",
    CharacterTrigramsTfIdf => "character_trigrams_tf_idf",
    PretrainedWordVectors => "pretrained_word_vectors",
    NormalizedString => "normalized_string",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimilarityMetric {
    Cosine,
    Jaccard,
    GeneralizedJaccard,
    Euclidean,
    JaroWinkler,
    Levenshtein,
}

named_enum!(SimilarityMetric {
    Cosine => "cosine",
    Jaccard => "jaccard",
    GeneralizedJaccard => "generalized_jaccard",
    Euclidean => "euclidean",
    JaroWinkler => "jaro_winkler",
    Levenshtein => "levenshtein",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusteringMethod {
    RicochetSr,
    UniqueMapping,
}

named_enum!(ClusteringMethod {
    RicochetSr => "ricochet_sr",
    UniqueMapping => "unique_mapping",
});

/// How a representation model encodes an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    BagOfGrams,
    DenseEmbedding,
    RawString,
}

/// Metrics each model family supports; the first entry is the family default.
const COMPATIBILITY: &[(ModelFamily, &[SimilarityMetric])] = &[
    (
        ModelFamily::BagOfGrams,
        &[
            SimilarityMetric::Cosine,
            SimilarityMetric::Jaccard,
            SimilarityMetric::GeneralizedJaccard,
        ],
    ),
    (
        ModelFamily::DenseEmbedding,
        &[SimilarityMetric::Cosine, SimilarityMetric::Euclidean],
    ),
    (
        ModelFamily::RawString,
        &[SimilarityMetric::JaroWinkler, SimilarityMetric::Levenshtein],
    ),
];

impl RepresentationModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            RepresentationModel::PretrainedWordVectors => ModelFamily::DenseEmbedding,
            RepresentationModel::NormalizedString => ModelFamily::RawString,
            _ => ModelFamily::BagOfGrams,
        }
    }

    pub fn compatible_metrics(&self) -> &'static [SimilarityMetric] {
        let family = self.family();
        COMPATIBILITY
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, metrics)| *metrics)
            .unwrap_or(&[])
    }

    pub fn default_metric(&self) -> SimilarityMetric {
        self.compatible_metrics()
            .first()
            .copied()
            .unwrap_or(SimilarityMetric::Cosine)
    }

    pub fn is_compatible_with(&self, metric: SimilarityMetric) -> bool {
        self.compatible_metrics().contains(&metric)
    }

    pub fn uses_idf(&self) -> bool {
        matches!(
            self,
            RepresentationModel::TokenUnigramsTfIdf
                | RepresentationModel::TokenBigramsTfIdf
                | RepresentationModel::TokenTrigramsTfIdf
                | RepresentationModel::CharacterTrigramsTfIdf
        )
    }
}

fn check_threshold(name: &str, value: f64) -> DedupeResult<()> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(DedupeError::config(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockingConfig {
    method: BlockingMethod,
    window_size: usize,
    sort_key_attributes: Vec<String>,
}

impl BlockingConfig {
    pub fn new(
        method: BlockingMethod,
        window_size: usize,
        sort_key_attributes: Vec<String>,
    ) -> DedupeResult<Self> {
        if window_size < 1 {
            return Err(DedupeError::config(format!(
                "window size must be at least 1, got {}",
                window_size
            )));
        }
        Ok(Self {
            method,
            window_size,
            sort_key_attributes,
        })
    }

    pub fn method(&self) -> BlockingMethod {
        self.method
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Attributes whose values form the sort key; empty means all attributes.
    pub fn sort_key_attributes(&self) -> &[String] {
        &self.sort_key_attributes
    }

    pub fn describe(&self) -> String {
        if self.sort_key_attributes.is_empty() {
            format!("window size={}", self.window_size)
        } else {
            format!(
                "window size={}, sort key={}",
                self.window_size,
                self.sort_key_attributes.join("+")
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockFilteringConfig {
    ratio: f64,
}

impl BlockFilteringConfig {
    pub fn new(ratio: f64) -> DedupeResult<Self> {
        if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
            return Err(DedupeError::config(format!(
                "filter ratio must lie in (0, 1], got {}",
                ratio
            )));
        }
        Ok(Self { ratio })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn describe(&self) -> String {
        format!("ratio={}", self.ratio)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    model: RepresentationModel,
    metric: SimilarityMetric,
    threshold: f64,
    embeddings_path: Option<PathBuf>,
}

impl MatcherConfig {
    /// Validates the model/metric pair against the compatibility table.
    pub fn new(
        model: RepresentationModel,
        metric: SimilarityMetric,
        threshold: f64,
        embeddings_path: Option<PathBuf>,
    ) -> DedupeResult<Self> {
        if !model.is_compatible_with(metric) {
            let supported: Vec<&str> = model.compatible_metrics().iter().map(|m| m.name()).collect();
            return Err(DedupeError::config(format!(
                "similarity metric '{}' is not compatible with representation model '{}' (supported: {})",
                metric,
                model,
                supported.join(", ")
            )));
        }
        check_threshold("matching threshold", threshold)?;
        if model.family() == ModelFamily::DenseEmbedding && embeddings_path.is_none() {
            return Err(DedupeError::config(format!(
                "representation model '{}' requires an embeddings file",
                model
            )));
        }
        Ok(Self {
            model,
            metric,
            threshold,
            embeddings_path,
        })
    }

    pub fn model(&self) -> RepresentationModel {
        self.model
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn embeddings_path(&self) -> Option<&PathBuf> {
        self.embeddings_path.as_ref()
    }

    /// Whether a similarity is strong enough to count as evidence.
    pub fn clears(&self, similarity: f64) -> bool {
        clears_threshold(similarity, self.threshold)
    }

    pub fn describe(&self) -> String {
        format!(
            "model={}, metric={}, threshold={}",
            self.model, self.metric, self.threshold
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringConfig {
    method: ClusteringMethod,
    threshold: f64,
}

impl ClusteringConfig {
    pub fn new(method: ClusteringMethod, threshold: f64) -> DedupeResult<Self> {
        check_threshold("clustering threshold", threshold)?;
        Ok(Self { method, threshold })
    }

    pub fn method(&self) -> ClusteringMethod {
        self.method
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn describe(&self) -> String {
        format!("threshold={}", self.threshold)
    }
}

/// Zero-similarity pairs carry no evidence, whatever the threshold.
pub fn clears_threshold(similarity: f64, threshold: f64) -> bool {
    similarity > 0.0 && similarity >= threshold
}

/// Fully validated configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub blocking: BlockingConfig,
    pub block_filtering: BlockFilteringConfig,
    pub matching: MatcherConfig,
    pub clustering: ClusteringConfig,
    pub worker_threads: usize,
    /// Evaluate intermediate stages against the ground truth.
    pub evaluate_stages: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            blocking: BlockingConfig {
                method: BlockingMethod::ExtendedSortedNeighborhood,
                window_size: DEFAULT_WINDOW_SIZE,
                sort_key_attributes: Vec::new(),
            },
            block_filtering: BlockFilteringConfig {
                ratio: DEFAULT_FILTER_RATIO,
            },
            matching: MatcherConfig {
                model: RepresentationModel::TokenUnigramsTfIdf,
                metric: SimilarityMetric::Cosine,
                threshold: DEFAULT_MATCH_THRESHOLD,
                embeddings_path: None,
            },
            clustering: ClusteringConfig {
                method: ClusteringMethod::RicochetSr,
                threshold: DEFAULT_CLUSTER_THRESHOLD,
            },
            worker_threads: num_cpus::get(),
            evaluate_stages: true,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// One-line summary used in run reports and result files.
    pub fn describe(&self) -> String {
        format!(
            "{}({}) -> block_filtering({}) -> comparison_propagation -> group_linkage({}) -> {}({})",
            self.blocking.method,
            self.blocking.describe(),
            self.block_filtering.describe(),
            self.matching.describe(),
            self.clustering.method,
            self.clustering.describe()
        )
    }

    pub fn log_config(&self) {
        info!("⚙️  Pipeline configuration");
        info!("   Blocking: {} ({})", self.blocking.method, self.blocking.describe());
        info!("   Block filtering: {}", self.block_filtering.describe());
        info!("   Matching: group linkage ({})", self.matching.describe());
        if let Some(path) = self.matching.embeddings_path() {
            info!("   Embeddings: {}", path.display());
        }
        info!("   Clustering: {} ({})", self.clustering.method, self.clustering.describe());
        info!("   Worker threads: {}", self.worker_threads);
        info!("   Stage evaluation: {}", self.evaluate_stages);
    }
}

/// Unvalidated options collected from defaults, the environment and the CLI.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    pub blocking_method: Option<BlockingMethod>,
    pub window_size: Option<usize>,
    pub sort_key_attributes: Option<Vec<String>>,
    pub filter_ratio: Option<f64>,
    pub representation_model: Option<RepresentationModel>,
    pub similarity_metric: Option<SimilarityMetric>,
    pub match_threshold: Option<f64>,
    pub embeddings_path: Option<PathBuf>,
    pub clustering_method: Option<ClusteringMethod>,
    pub cluster_threshold: Option<f64>,
    pub worker_threads: Option<usize>,
    pub evaluate_stages: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Reads the `DEDUPE_*` variables. Unparseable values are errors.
    pub fn from_env() -> DedupeResult<Self> {
        Ok(Self {
            blocking_method: parse_env_var("DEDUPE_BLOCKING_METHOD")?,
            window_size: parse_env_var("DEDUPE_WINDOW_SIZE")?,
            sort_key_attributes: list_env_var("DEDUPE_SORT_KEY_ATTRIBUTES"),
            filter_ratio: parse_env_var("DEDUPE_FILTER_RATIO")?,
            representation_model: parse_env_var("DEDUPE_REPRESENTATION_MODEL")?,
            similarity_metric: parse_env_var("DEDUPE_SIMILARITY_METRIC")?,
            match_threshold: parse_env_var("DEDUPE_MATCH_THRESHOLD")?,
            embeddings_path: parse_env_var("DEDUPE_EMBEDDINGS_PATH")?,
            clustering_method: parse_env_var("DEDUPE_CLUSTERING_METHOD")?,
            cluster_threshold: parse_env_var("DEDUPE_CLUSTER_THRESHOLD")?,
            worker_threads: parse_env_var("DEDUPE_WORKER_THREADS")?,
            evaluate_stages: parse_env_var("DEDUPE_EVALUATE_STAGES")?,
        })
    }

    /// Values set in `overrides` win over values set here.
    pub fn merge(self, overrides: PipelineConfigBuilder) -> Self {
        Self {
            blocking_method: overrides.blocking_method.or(self.blocking_method),
            window_size: overrides.window_size.or(self.window_size),
            sort_key_attributes: overrides.sort_key_attributes.or(self.sort_key_attributes),
            filter_ratio: overrides.filter_ratio.or(self.filter_ratio),
            representation_model: overrides.representation_model.or(self.representation_model),
            similarity_metric: overrides.similarity_metric.or(self.similarity_metric),
            match_threshold: overrides.match_threshold.or(self.match_threshold),
            embeddings_path: overrides.embeddings_path.or(self.embeddings_path),
            clustering_method: overrides.clustering_method.or(self.clustering_method),
            cluster_threshold: overrides.cluster_threshold.or(self.cluster_threshold),
            worker_threads: overrides.worker_threads.or(self.worker_threads),
            evaluate_stages: overrides.evaluate_stages.or(self.evaluate_stages),
        }
    }

    pub fn window_size(mut self, window_size: usize) -> Self {
        self.window_size = Some(window_size);
        self
    }

    pub fn filter_ratio(mut self, ratio: f64) -> Self {
        self.filter_ratio = Some(ratio);
        self
    }

    pub fn representation_model(mut self, model: RepresentationModel) -> Self {
        self.representation_model = Some(model);
        self
    }

    pub fn similarity_metric(mut self, metric: SimilarityMetric) -> Self {
        self.similarity_metric = Some(metric);
        self
    }

    pub fn match_threshold(mut self, threshold: f64) -> Self {
        self.match_threshold = Some(threshold);
        self
    }

    pub fn clustering_method(mut self, method: ClusteringMethod) -> Self {
        self.clustering_method = Some(method);
        self
    }

    pub fn cluster_threshold(mut self, threshold: f64) -> Self {
        self.cluster_threshold = Some(threshold);
        self
    }

    pub fn blocking_method(mut self, method: BlockingMethod) -> Self {
        self.blocking_method = Some(method);
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn evaluate_stages(mut self, evaluate: bool) -> Self {
        self.evaluate_stages = Some(evaluate);
        self
    }

    pub fn build(self) -> DedupeResult<PipelineConfig> {
        let blocking = BlockingConfig::new(
            self.blocking_method
                .unwrap_or(BlockingMethod::ExtendedSortedNeighborhood),
            self.window_size.unwrap_or(DEFAULT_WINDOW_SIZE),
            self.sort_key_attributes.unwrap_or_default(),
        )?;
        let block_filtering =
            BlockFilteringConfig::new(self.filter_ratio.unwrap_or(DEFAULT_FILTER_RATIO))?;

        let model = self
            .representation_model
            .unwrap_or(RepresentationModel::TokenUnigramsTfIdf);
        let metric = self
            .similarity_metric
            .unwrap_or_else(|| model.default_metric());
        let matching = MatcherConfig::new(
            model,
            metric,
            self.match_threshold.unwrap_or(DEFAULT_MATCH_THRESHOLD),
            self.embeddings_path,
        )?;

        let clustering = ClusteringConfig::new(
            self.clustering_method.unwrap_or(ClusteringMethod::RicochetSr),
            self.cluster_threshold.unwrap_or(DEFAULT_CLUSTER_THRESHOLD),
        )?;

        let worker_threads = self.worker_threads.unwrap_or_else(num_cpus::get);
        if worker_threads == 0 {
            return Err(DedupeError::config("worker threads must be at least 1"));
        }

        Ok(PipelineConfig {
            blocking,
            block_filtering,
            matching,
            clustering,
            worker_threads,
            evaluate_stages: self.evaluate_stages.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_explicit() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.blocking.window_size(), DEFAULT_WINDOW_SIZE);
        assert_eq!(config.block_filtering.ratio(), DEFAULT_FILTER_RATIO);
        assert_eq!(config.matching.model(), RepresentationModel::TokenUnigramsTfIdf);
        assert_eq!(config.matching.metric(), SimilarityMetric::Cosine);
        assert_eq!(config.clustering.method(), ClusteringMethod::RicochetSr);
        assert_eq!(config, PipelineConfig {
            worker_threads: config.worker_threads,
            ..PipelineConfig::default()
        });
    }

    #[test]
    fn test_incompatible_model_and_metric_fail_fast() {
        let err = MatcherConfig::new(
            RepresentationModel::TokenTrigramsTfIdf,
            SimilarityMetric::Euclidean,
            0.1,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DedupeError::Configuration(_)));

        assert!(MatcherConfig::new(
            RepresentationModel::NormalizedString,
            SimilarityMetric::Cosine,
            0.1,
            None
        )
        .is_err());
    }

    #[test]
    fn test_every_model_accepts_its_default_metric() {
        for model in RepresentationModel::ALL {
            assert!(model.is_compatible_with(model.default_metric()), "{}", model);
        }
    }

    #[test]
    fn test_embeddings_require_a_path() {
        assert!(MatcherConfig::new(
            RepresentationModel::PretrainedWordVectors,
            SimilarityMetric::Cosine,
            0.1,
            None
        )
        .is_err());
        assert!(MatcherConfig::new(
            RepresentationModel::PretrainedWordVectors,
            SimilarityMetric::Euclidean,
            0.1,
            Some(PathBuf::from("vectors.txt"))
        )
        .is_ok());
    }

    #[test]
    fn test_out_of_range_values_are_rejected_not_clamped() {
        assert!(PipelineConfig::builder().window_size(0).build().is_err());
        assert!(PipelineConfig::builder().filter_ratio(0.0).build().is_err());
        assert!(PipelineConfig::builder().filter_ratio(1.2).build().is_err());
        assert!(PipelineConfig::builder().match_threshold(-0.1).build().is_err());
        assert!(PipelineConfig::builder().cluster_threshold(f64::NAN).build().is_err());
        assert!(PipelineConfig::builder().worker_threads(0).build().is_err());
        assert!(PipelineConfig::builder().filter_ratio(1.0).match_threshold(0.0).build().is_ok());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!(
            "Token-Unigrams-TF-IDF".parse::<RepresentationModel>().unwrap(),
            RepresentationModel::TokenUnigramsTfIdf
        );
        assert_eq!("ricochet_sr".parse::<ClusteringMethod>().unwrap(), ClusteringMethod::RicochetSr);
        assert!("nope".parse::<SimilarityMetric>().is_err());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = PipelineConfig::builder().window_size(3).filter_ratio(0.5);
        let overrides = PipelineConfig::builder().window_size(5);
        let merged = base.merge(overrides);
        assert_eq!(merged.window_size, Some(5));
        assert_eq!(merged.filter_ratio, Some(0.5));
    }

    #[test]
    fn test_threshold_rule() {
        assert!(clears_threshold(0.5, 0.5));
        assert!(clears_threshold(0.01, 0.0));
        assert!(!clears_threshold(0.0, 0.0));
        assert!(!clears_threshold(0.49, 0.5));
    }
}
