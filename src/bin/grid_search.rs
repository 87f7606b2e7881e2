// src/bin/grid_search.rs - Runs the pipeline over a parameter grid and records the scores
use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use dedupe_lib::loading::{load_ground_truth, load_store, GroundTruthOptions, ProfileReaderOptions};
use dedupe_lib::pipeline::Pipeline;
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::pipeline_config::{
    BlockingMethod, ClusteringMethod, PipelineConfig, RepresentationModel, SimilarityMetric,
};
use dedupe_lib::utils::progress_bars::progress_config::ProgressConfig;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about = "Grid search over blocking, matching and clustering parameters", long_about = None)]
struct GridArgs {
    #[arg(long)]
    source_a: PathBuf,

    #[arg(long)]
    source_b: Option<PathBuf>,

    #[arg(long)]
    ground_truth: PathBuf,

    #[arg(long, default_value_t = ',')]
    separator: char,

    #[arg(long, default_value_t = 0)]
    id_column: usize,

    /// Directory receiving `<timestamp>_results.csv`
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    #[arg(long, default_value_t = BlockingMethod::ExtendedSortedNeighborhood)]
    blocking: BlockingMethod,

    #[arg(long, value_delimiter = ',', default_value = "2,3,4")]
    window_sizes: Vec<usize>,

    #[arg(long, value_delimiter = ',', default_value = "0.5,0.8,1.0")]
    filter_ratios: Vec<f64>,

    #[arg(long, value_delimiter = ',', default_value = "token_unigrams_tf_idf")]
    models: Vec<RepresentationModel>,

    /// Metrics to try; every model's compatible metrics when omitted
    #[arg(long, value_delimiter = ',')]
    metrics: Option<Vec<SimilarityMetric>>,

    #[arg(long, value_delimiter = ',', default_value = "0.1,0.3,0.5")]
    match_thresholds: Vec<f64>,

    #[arg(long, value_delimiter = ',', default_value = "0.1,0.3,0.5")]
    cluster_thresholds: Vec<f64>,

    #[arg(long, default_value_t = ClusteringMethod::RicochetSr)]
    clustering: ClusteringMethod,

    #[arg(long)]
    embeddings: Option<PathBuf>,

    #[arg(long)]
    threads: Option<usize>,
}

/// One point of the grid.
struct GridPoint {
    window_size: usize,
    filter_ratio: f64,
    model: RepresentationModel,
    metric: SimilarityMetric,
    match_threshold: f64,
    cluster_threshold: f64,
}

impl GridArgs {
    fn grid(&self) -> Vec<GridPoint> {
        let mut points = Vec::new();
        for &window_size in &self.window_sizes {
            for &filter_ratio in &self.filter_ratios {
                for &model in &self.models {
                    let metrics: Vec<SimilarityMetric> = match &self.metrics {
                        Some(requested) => requested
                            .iter()
                            .copied()
                            .filter(|m| model.is_compatible_with(*m))
                            .collect(),
                        None => model.compatible_metrics().to_vec(),
                    };
                    for metric in metrics {
                        for &match_threshold in &self.match_thresholds {
                            for &cluster_threshold in &self.cluster_thresholds {
                                points.push(GridPoint {
                                    window_size,
                                    filter_ratio,
                                    model,
                                    metric,
                                    match_threshold,
                                    cluster_threshold,
                                });
                            }
                        }
                    }
                }
            }
        }
        points
    }

    fn config_for(&self, point: &GridPoint) -> Result<PipelineConfig> {
        let mut builder = PipelineConfig::builder()
            .blocking_method(self.blocking)
            .window_size(point.window_size)
            .filter_ratio(point.filter_ratio)
            .representation_model(point.model)
            .similarity_metric(point.metric)
            .match_threshold(point.match_threshold)
            .clustering_method(self.clustering)
            .cluster_threshold(point.cluster_threshold)
            .evaluate_stages(false);
        builder.embeddings_path = self.embeddings.clone();
        if let Some(threads) = self.threads {
            builder = builder.worker_threads(threads);
        }
        Ok(builder.build()?)
    }

    /// Every grid point with its validated configuration. Fails on the first
    /// invalid point, before any run starts.
    fn validated_grid(&self) -> Result<Vec<(GridPoint, PipelineConfig)>> {
        let grid = self.grid();
        if grid.is_empty() {
            bail!("parameter grid is empty; check that the requested metrics suit the requested models");
        }
        grid.into_iter()
            .map(|point| {
                let config = self.config_for(&point).with_context(|| {
                    format!(
                        "Invalid grid point: window {} ratio {} {}/{} thresholds {}/{}",
                        point.window_size,
                        point.filter_ratio,
                        point.model,
                        point.metric,
                        point.match_threshold,
                        point.cluster_threshold
                    )
                })?;
                Ok((point, config))
            })
            .collect()
    }
}

fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = GridArgs::parse();

    let progress_config =
        ProgressConfig::from_env().context("Failed to read progress configuration from environment")?;
    let runs = args.validated_grid()?;
    info!("Grid search over {} configurations", runs.len());

    if !args.separator.is_ascii() {
        bail!("separator must be a single ASCII character, got '{}'", args.separator);
    }
    let separator = args.separator as u8;
    let reader_options = ProfileReaderOptions {
        separator,
        id_column: args.id_column,
    };
    let store = load_store(&args.source_a, args.source_b.as_deref(), &reader_options)
        .context("Failed to load profiles")?;
    let ground_truth = load_ground_truth(
        &args.ground_truth,
        &store,
        &GroundTruthOptions {
            separator,
            ..Default::default()
        },
    )
    .context("Failed to load ground truth")?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let results_path = args.output_dir.join(format!("{}_results.csv", timestamp));
    let mut writer = csv::Writer::from_path(&results_path)
        .with_context(|| format!("Failed to create {}", results_path.display()))?;
    writer.write_record([
        "elapsed_ms",
        "window_size",
        "filter_ratio",
        "model",
        "metric",
        "match_threshold",
        "cluster_threshold",
        "precision",
        "recall",
        "f_measure",
    ])?;

    let pb = if progress_config.enabled {
        let pb = ProgressBar::new(runs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        Some(pb)
    } else {
        None
    };

    let mut best: Option<(f64, String)> = None;
    for (point, config) in runs {
        let description = config.describe();
        if let Some(pb) = &pb {
            pb.set_message(format!(
                "w={} r={} {}/{} t={}/{}",
                point.window_size,
                point.filter_ratio,
                point.model,
                point.metric,
                point.match_threshold,
                point.cluster_threshold
            ));
        }

        let start = Instant::now();
        let report = Pipeline::new(config, &store, &ground_truth)
            .run()
            .with_context(|| format!("Run failed for {}", description))?;
        let elapsed_ms = start.elapsed().as_millis();
        let stats = &report.cluster_statistics;

        writer.write_record([
            elapsed_ms.to_string(),
            point.window_size.to_string(),
            point.filter_ratio.to_string(),
            point.model.to_string(),
            point.metric.to_string(),
            point.match_threshold.to_string(),
            point.cluster_threshold.to_string(),
            stats.precision.to_string(),
            stats.recall.to_string(),
            stats.f_measure.to_string(),
        ])?;
        writer.flush()?;

        if best.as_ref().map_or(true, |(f, _)| stats.f_measure > *f) {
            best = Some((stats.f_measure, description));
        }
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = &pb {
        pb.finish_with_message("Grid search complete");
    }
    info!("Results written to {}", results_path.display());
    if let Some((f_measure, description)) = best {
        info!("Best F1 {:.4}: {}", f_measure, description);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> GridArgs {
        let mut argv = vec!["grid_search", "--source-a", "a.csv", "--ground-truth", "gt.csv"];
        argv.extend_from_slice(extra);
        GridArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_grid_is_valid() {
        let runs = args(&[]).validated_grid().unwrap();
        // 3 windows x 3 ratios x 3 metrics x 3 x 3 thresholds
        assert_eq!(runs.len(), 3 * 3 * 3 * 3 * 3);
    }

    #[test]
    fn test_out_of_range_values_reject_the_whole_grid() {
        assert!(args(&["--filter-ratios", "0.5,1.5"]).validated_grid().is_err());
        assert!(args(&["--filter-ratios", "0"]).validated_grid().is_err());
        assert!(args(&["--window-sizes", "0,2"]).validated_grid().is_err());
    }

    #[test]
    fn test_incompatible_metrics_leave_an_empty_grid() {
        let result = args(&["--models", "token_unigrams_tf_idf", "--metrics", "euclidean"]).validated_grid();
        assert!(result.is_err());
    }
}
