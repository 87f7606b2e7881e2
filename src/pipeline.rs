// src/pipeline.rs - Runs the five stages in order and collects their traces

use chrono::Utc;
use indicatif::MultiProgress;
use log::info;
use rayon::ThreadPool;
use std::time::Instant;
use uuid::Uuid;

use crate::candidate_generation::{block_builder, propagate, BlockFiltering};
use crate::clustering::{cluster_entities, validate_clustering};
use crate::error::{DedupeError, DedupeResult};
use crate::evaluation::{evaluate_blocks, evaluate_clusters, evaluate_comparisons, evaluate_matches, fingerprint};
use crate::loading::{GroundTruth, WordVectors};
use crate::matching::{GroupLinkage, MatchingOutcome};
use crate::models::core::ProfileStore;
use crate::models::matching::{Block, Cluster, Comparison};
use crate::models::stats_models::{ClusteringStatistics, RunReport, Stage, StageMetrics, StageTrace};
use crate::utils::get_memory_usage;
use crate::utils::pipeline_config::PipelineConfig;
use crate::utils::progress_bars::logging::StageLogger;
use crate::utils::progress_bars::progress_config::ProgressConfig;

/// One configured run over a loaded store. The store and ground truth are
/// borrowed and never modified.
pub struct Pipeline<'a> {
    config: PipelineConfig,
    store: &'a ProfileStore,
    ground_truth: &'a GroundTruth,
    progress: ProgressConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, store: &'a ProfileStore, ground_truth: &'a GroundTruth) -> Self {
        Self {
            config,
            store,
            ground_truth,
            progress: ProgressConfig::disabled(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> DedupeResult<RunReport> {
        // option checks that depend on the data happen before any stage
        validate_clustering(&self.config.clustering, self.store)?;
        let word_vectors = GroupLinkage::load_word_vectors(&self.config.matching)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .build()
            .map_err(|e| DedupeError::config(format!("cannot start {} worker threads: {}", self.config.worker_threads, e)))?;

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let multi_progress = self.progress.create_multi_progress();
        info!(
            "🚀 Run {} over {} profiles ({:?})",
            run_id,
            self.store.len(),
            self.store.kind()
        );

        let mut traces = Vec::with_capacity(5);

        let (blocks, trace) = self.build_blocks();
        traces.push(trace);
        self.log_memory();

        let (blocks, trace) = self.filter_blocks(blocks);
        traces.push(trace);

        let (comparisons, trace) = self.propagate_comparisons(&blocks);
        traces.push(trace);
        drop(blocks);
        self.log_memory();

        let (outcome, trace) = self.match_comparisons(&comparisons, word_vectors.as_ref(), &pool, multi_progress)?;
        traces.push(trace);
        self.log_memory();

        let (clusters, cluster_statistics, trace) = self.cluster_pairs(&outcome)?;
        traces.push(trace);

        let report = RunReport {
            run_id,
            started_at,
            configuration: self.config.describe(),
            traces,
            cluster_statistics,
            fingerprint: fingerprint(&clusters),
            clusters,
        };
        info!(
            "🏁 Run {} finished in {:.2?} (fingerprint {})",
            report.run_id,
            report.total_duration(),
            &report.fingerprint[..12]
        );
        Ok(report)
    }

    fn build_blocks(&self) -> (Vec<Block>, StageTrace) {
        let logger = StageLogger::new(Stage::BlockBuilding);
        let method = self.config.blocking.method().to_string();
        logger.log_start(&method, &self.config.blocking.describe());
        let start = Instant::now();

        let blocks: Vec<Block> = block_builder(&self.config.blocking, self.store).collect();

        let duration = start.elapsed();
        let trace = self.candidate_trace(
            Stage::BlockBuilding,
            method,
            self.config.blocking.describe(),
            duration,
            self.store.len(),
            &blocks,
            &logger,
        );
        (blocks, trace)
    }

    fn filter_blocks(&self, blocks: Vec<Block>) -> (Vec<Block>, StageTrace) {
        let logger = StageLogger::new(Stage::BlockCleaning);
        logger.log_start("block_filtering", &self.config.block_filtering.describe());
        let start = Instant::now();
        let input_size = blocks.len();

        let refined = BlockFiltering::new(&self.config.block_filtering).refine_blocks(blocks);
        logger.log_debug(&format!("{} blocks no longer comparable", input_size - refined.len()));

        let duration = start.elapsed();
        let trace = self.candidate_trace(
            Stage::BlockCleaning,
            "block_filtering".to_string(),
            self.config.block_filtering.describe(),
            duration,
            input_size,
            &refined,
            &logger,
        );
        (refined, trace)
    }

    #[allow(clippy::too_many_arguments)]
    fn candidate_trace(
        &self,
        stage: Stage,
        method: String,
        configuration: String,
        duration: std::time::Duration,
        input_size: usize,
        blocks: &[Block],
        logger: &StageLogger,
    ) -> StageTrace {
        let metrics = self
            .config
            .evaluate_stages
            .then(|| StageMetrics::Candidates(evaluate_blocks(blocks, self.ground_truth, self.store)));
        logger.log_complete(duration, input_size, blocks.len());
        if let Some(metrics) = &metrics {
            logger.log_metrics(metrics);
        }
        logger.log_samples("block", blocks.iter().map(|b| self.describe_block(b)));
        StageTrace {
            stage,
            method,
            configuration,
            duration,
            input_size,
            output_size: blocks.len(),
            metrics,
        }
    }

    fn propagate_comparisons(&self, blocks: &[Block]) -> (Vec<Comparison>, StageTrace) {
        let logger = StageLogger::new(Stage::ComparisonCleaning);
        logger.log_start("comparison_propagation", "co-occurrence graph");
        let start = Instant::now();

        let comparisons = propagate(blocks);

        let duration = start.elapsed();
        let metrics = self
            .config
            .evaluate_stages
            .then(|| StageMetrics::Candidates(evaluate_comparisons(&comparisons, self.ground_truth)));
        logger.log_complete(duration, blocks.len(), comparisons.len());
        if let Some(metrics) = &metrics {
            logger.log_metrics(metrics);
        }
        logger.log_samples(
            "comparison",
            comparisons
                .iter()
                .map(|c| format!("{} <-> {}", self.store.id_of(c.left), self.store.id_of(c.right))),
        );
        let trace = StageTrace {
            stage: Stage::ComparisonCleaning,
            method: "comparison_propagation".to_string(),
            configuration: String::new(),
            duration,
            input_size: blocks.len(),
            output_size: comparisons.len(),
            metrics,
        };
        (comparisons, trace)
    }

    fn match_comparisons(
        &self,
        comparisons: &[Comparison],
        word_vectors: Option<&WordVectors>,
        pool: &ThreadPool,
        multi_progress: Option<MultiProgress>,
    ) -> DedupeResult<(MatchingOutcome, StageTrace)> {
        let logger = StageLogger::new(Stage::EntityMatching);
        logger.log_start("group_linkage", &self.config.matching.describe());
        let start = Instant::now();

        logger.log_phase("representing profiles", Some(self.config.matching.model().name()));
        let matcher = GroupLinkage::with_word_vectors(&self.config.matching, self.store, word_vectors)?;
        logger.log_phase(
            "scoring comparisons",
            Some(format!("{} on {} threads", comparisons.len(), self.config.worker_threads).as_str()),
        );
        let outcome = pool.install(|| matcher.execute_comparisons(comparisons, multi_progress));

        let duration = start.elapsed();
        let metrics = self
            .config
            .evaluate_stages
            .then(|| StageMetrics::Matches(evaluate_matches(&outcome, self.ground_truth)));
        logger.log_complete(duration, comparisons.len(), outcome.pairs.len());
        if let Some(metrics) = &metrics {
            logger.log_metrics(metrics);
        }
        logger.log_samples(
            "pair",
            outcome.pairs.iter().map(|p| {
                format!("{} <-> {} ({:.4})", self.store.id_of(p.left), self.store.id_of(p.right), p.similarity)
            }),
        );
        let trace = StageTrace {
            stage: Stage::EntityMatching,
            method: "group_linkage".to_string(),
            configuration: self.config.matching.describe(),
            duration,
            input_size: comparisons.len(),
            output_size: outcome.pairs.len(),
            metrics,
        };
        Ok((outcome, trace))
    }

    fn cluster_pairs(&self, outcome: &MatchingOutcome) -> DedupeResult<(Vec<Cluster>, ClusteringStatistics, StageTrace)> {
        let logger = StageLogger::new(Stage::EntityClustering);
        let method = self.config.clustering.method().to_string();
        logger.log_start(&method, &self.config.clustering.describe());
        let start = Instant::now();
        let clusters = cluster_entities(&self.config.clustering, &outcome.pairs, self.store)?;
        let duration = start.elapsed();

        // final statistics are always computed, stage switch or not
        let cluster_statistics = evaluate_clusters(&clusters, self.ground_truth, self.store);
        let metrics = StageMetrics::Clusters(cluster_statistics.clone());
        logger.log_complete(duration, outcome.pairs.len(), clusters.len());
        logger.log_metrics(&metrics);
        logger.log_samples(
            "cluster",
            clusters
                .iter()
                .filter(|c| !c.is_singleton())
                .map(|c| self.describe_cluster(c)),
        );
        let trace = StageTrace {
            stage: Stage::EntityClustering,
            method,
            configuration: self.config.clustering.describe(),
            duration,
            input_size: outcome.pairs.len(),
            output_size: clusters.len(),
            metrics: Some(metrics),
        };
        Ok((clusters, cluster_statistics, trace))
    }

    fn describe_block(&self, block: &Block) -> String {
        let ids = |members: &[usize]| -> String {
            members.iter().map(|&i| self.store.id_of(i)).collect::<Vec<_>>().join(", ")
        };
        match block {
            Block::Unilateral { entities } => format!("[{}]", ids(entities)),
            Block::Bilateral { left, right } => format!("[{}] x [{}]", ids(left), ids(right)),
        }
    }

    fn describe_cluster(&self, cluster: &Cluster) -> String {
        let ids: Vec<&str> = cluster.members.iter().map(|&i| self.store.id_of(i)).collect();
        format!("{{{}}}", ids.join(", "))
    }

    fn log_memory(&self) {
        if self.progress.should_show_memory() {
            info!("📈 Memory usage: {} MB", get_memory_usage());
        }
    }
}
