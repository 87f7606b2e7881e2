// src/utils/progress_bars/logging.rs - Logging helpers shared by the pipeline stages
use log::{debug, info};
use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::models::stats_models::{
    CandidateStatistics, ClusteringStatistics, MatchStatistics, Stage, StageMetrics,
};

#[derive(Clone)]
pub struct StageLogger {
    tag: &'static str,
    emoji: &'static str,
    start_time: Instant,
}

impl StageLogger {
    pub fn new(stage: Stage) -> Self {
        Self {
            tag: stage.tag(),
            emoji: stage.emoji(),
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, method: &str, configuration: &str) {
        info!(
            "[{}] {} 🚀 Starting {} ({})",
            self.tag, self.emoji, method, configuration
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.tag, self.emoji, phase, details, elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.tag, self.emoji, phase, elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_complete(&self, duration: Duration, input_size: usize, output_size: usize) {
        info!(
            "[{}] {} ✅ Complete in {:.2?}: {} in → {} out",
            self.tag, self.emoji, duration, input_size, output_size
        );
    }

    pub fn log_metrics(&self, metrics: &StageMetrics) {
        match metrics {
            StageMetrics::Candidates(s) => self.log_candidates(s),
            StageMetrics::Matches(s) => self.log_matches(s),
            StageMetrics::Clusters(s) => self.log_clusters(s),
        }
    }

    fn log_candidates(&self, s: &CandidateStatistics) {
        info!(
            "[{}] {} 📊 {} blocks, {} comparisons, {} entities covered",
            self.tag, self.emoji, s.blocks, s.comparisons, s.entities_covered
        );
        info!(
            "[{}] {} 🎯 Detected {}/{} duplicates | PC {:.4} | PQ {:.6} | F1 {:.4}",
            self.tag,
            self.emoji,
            s.detected_duplicates,
            s.existing_duplicates,
            s.pair_completeness,
            s.pair_quality,
            s.f_measure
        );
    }

    fn log_matches(&self, s: &MatchStatistics) {
        info!(
            "[{}] {} 📊 {} comparisons executed, {} pairs retained",
            self.tag, self.emoji, s.comparisons_executed, s.pairs_retained
        );
        info!(
            "[{}] {} 🎯 Detected {}/{} duplicates | P {:.4} | R {:.4} | F1 {:.4}",
            self.tag,
            self.emoji,
            s.detected_duplicates,
            s.existing_duplicates,
            s.precision,
            s.recall,
            s.f_measure
        );
    }

    fn log_clusters(&self, s: &ClusteringStatistics) {
        info!(
            "[{}] {} 📊 {} clusters ({} non-singleton), {} implied matches",
            self.tag, self.emoji, s.clusters, s.non_singleton_clusters, s.total_matches
        );
        info!(
            "[{}] {} 🎯 Detected {}/{} duplicates | P {:.4} | R {:.4} | F1 {:.4}",
            self.tag,
            self.emoji,
            s.detected_duplicates,
            s.existing_duplicates,
            s.precision,
            s.recall,
            s.f_measure
        );
    }

    /// Logs the first few items of a stage output at debug level.
    pub fn log_samples<T: Display>(&self, label: &str, items: impl IntoIterator<Item = T>) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        for (i, item) in items.into_iter().take(SAMPLE_SIZE).enumerate() {
            debug!("[{}] {} 🔎 {} #{}: {}", self.tag, self.emoji, label, i, item);
        }
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.tag, self.emoji, message);
    }
}

const SAMPLE_SIZE: usize = 5;
