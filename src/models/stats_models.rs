// src/models/stats_models.rs

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::models::matching::Cluster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    BlockBuilding,
    BlockCleaning,
    ComparisonCleaning,
    EntityMatching,
    EntityClustering,
}

impl Stage {
    pub fn tag(&self) -> &'static str {
        match self {
            Stage::BlockBuilding => "BLOCKING",
            Stage::BlockCleaning => "FILTERING",
            Stage::ComparisonCleaning => "PROPAGATION",
            Stage::EntityMatching => "MATCHING",
            Stage::EntityClustering => "CLUSTERING",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Stage::BlockBuilding => "🧱",
            Stage::BlockCleaning => "🧹",
            Stage::ComparisonCleaning => "🔗",
            Stage::EntityMatching => "⚖️",
            Stage::EntityClustering => "🫧",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BlockBuilding => "Block Building",
            Stage::BlockCleaning => "Block Cleaning",
            Stage::ComparisonCleaning => "Comparison Cleaning",
            Stage::EntityMatching => "Entity Matching",
            Stage::EntityClustering => "Entity Clustering",
        };
        f.write_str(name)
    }
}

/// Quality of a candidate set (blocks or comparisons) against the ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateStatistics {
    pub blocks: usize,
    pub comparisons: u64,
    pub entities_covered: usize,
    pub detected_duplicates: usize,
    pub existing_duplicates: usize,
    /// Recall of the candidate set.
    pub pair_completeness: f64,
    /// Precision of the candidate set.
    pub pair_quality: f64,
    pub f_measure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchStatistics {
    pub comparisons_executed: usize,
    pub pairs_retained: usize,
    pub detected_duplicates: usize,
    pub existing_duplicates: usize,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringStatistics {
    pub clusters: usize,
    pub non_singleton_clusters: usize,
    pub total_matches: u64,
    pub detected_duplicates: usize,
    pub existing_duplicates: usize,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum StageMetrics {
    Candidates(CandidateStatistics),
    Matches(MatchStatistics),
    Clusters(ClusteringStatistics),
}

/// What a stage did, returned to the caller instead of printed.
#[derive(Debug, Clone, Serialize)]
pub struct StageTrace {
    pub stage: Stage,
    pub method: String,
    pub configuration: String,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub input_size: usize,
    pub output_size: usize,
    pub metrics: Option<StageMetrics>,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub configuration: String,
    pub traces: Vec<StageTrace>,
    pub cluster_statistics: ClusteringStatistics,
    /// SHA-256 over the cluster partition; equal across identical runs.
    pub fingerprint: String,
    #[serde(skip)]
    pub clusters: Vec<Cluster>,
}

impl RunReport {
    pub fn total_duration(&self) -> Duration {
        self.traces.iter().map(|t| t.duration).sum()
    }

    pub fn trace(&self, stage: Stage) -> Option<&StageTrace> {
        self.traces.iter().find(|t| t.stage == stage)
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
