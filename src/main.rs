use anyhow::{bail, Context, Result};
use clap::Parser;
use dedupe_lib::evaluation::{write_matches_csv, write_report_json};
use dedupe_lib::loading::{load_ground_truth, load_store, GroundTruth, GroundTruthOptions, ProfileReaderOptions};
use dedupe_lib::pipeline::Pipeline;
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::get_memory_usage;
use dedupe_lib::utils::pipeline_config::{
    BlockingMethod, ClusteringMethod, PipelineConfigBuilder, RepresentationModel, SimilarityMetric,
};
use dedupe_lib::utils::progress_bars::progress_config::ProgressConfig;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Links duplicate records across one or two product catalogs", long_about = None)]
struct Args {
    /// Profiles of the first (or only) source
    #[arg(long)]
    source_a: PathBuf,

    /// Profiles of the second source; omit for single-source deduplication
    #[arg(long)]
    source_b: Option<PathBuf>,

    /// Known duplicate pairs (idA,idB) used for evaluation
    #[arg(long)]
    ground_truth: Option<PathBuf>,

    /// Field separator of the delimited input files
    #[arg(long, default_value_t = ',')]
    separator: char,

    /// Column holding the record identifier
    #[arg(long, default_value_t = 0)]
    id_column: usize,

    /// The ground-truth file has no header row
    #[arg(long)]
    ground_truth_no_header: bool,

    /// Write matched id pairs (cluster,id_a,id_b) to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report_json: Option<PathBuf>,

    #[arg(long)]
    blocking: Option<BlockingMethod>,

    #[arg(long)]
    window_size: Option<usize>,

    /// Attributes forming the sorted-neighborhood key (comma separated)
    #[arg(long, value_delimiter = ',')]
    sort_key: Option<Vec<String>>,

    #[arg(long)]
    filter_ratio: Option<f64>,

    #[arg(long)]
    model: Option<RepresentationModel>,

    #[arg(long)]
    metric: Option<SimilarityMetric>,

    #[arg(long)]
    match_threshold: Option<f64>,

    /// Word-vector file for the pretrained_word_vectors model
    #[arg(long)]
    embeddings: Option<PathBuf>,

    #[arg(long)]
    clustering: Option<ClusteringMethod>,

    #[arg(long)]
    cluster_threshold: Option<f64>,

    /// Worker threads for comparison scoring
    #[arg(long)]
    threads: Option<usize>,

    /// Only evaluate the final clusters
    #[arg(long)]
    skip_stage_stats: bool,
}

impl Args {
    fn overrides(&self) -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            blocking_method: self.blocking,
            window_size: self.window_size,
            sort_key_attributes: self.sort_key.clone(),
            filter_ratio: self.filter_ratio,
            representation_model: self.model,
            similarity_metric: self.metric,
            match_threshold: self.match_threshold,
            embeddings_path: self.embeddings.clone(),
            clustering_method: self.clustering,
            cluster_threshold: self.cluster_threshold,
            worker_threads: self.threads,
            evaluate_stages: self.skip_stage_stats.then_some(false),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = Args::parse();
    info!("Starting catalog deduplication pipeline");

    let config = PipelineConfigBuilder::from_env()
        .context("Failed to read pipeline configuration from environment")?
        .merge(args.overrides())
        .build()
        .context("Invalid pipeline configuration")?;
    config.log_config();

    let progress_config =
        ProgressConfig::from_env().context("Failed to read progress configuration from environment")?;
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );

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

    let ground_truth = match &args.ground_truth {
        Some(path) => {
            let options = GroundTruthOptions {
                separator,
                ignore_first_row: !args.ground_truth_no_header,
            };
            load_ground_truth(path, &store, &options).context("Failed to load ground truth")?
        }
        None => {
            warn!("No ground truth given; precision and recall will be reported as 0");
            GroundTruth::default()
        }
    };

    let report = Pipeline::new(config, &store, &ground_truth)
        .with_progress(progress_config.clone())
        .run()
        .context("Pipeline run failed")?;

    info!("Pipeline run {} summary:", report.run_id);
    for trace in &report.traces {
        info!(
            "  {:<20} {:>10.2?}  {} -> {}",
            trace.stage.to_string(),
            trace.duration,
            trace.input_size,
            trace.output_size
        );
    }
    let stats = &report.cluster_statistics;
    info!(
        "  Final: {} clusters | P {:.4} | R {:.4} | F1 {:.4}",
        stats.clusters, stats.precision, stats.recall, stats.f_measure
    );
    if progress_config.should_show_memory() {
        info!("  Memory usage: {} MB", get_memory_usage());
    }

    if let Some(path) = &args.export {
        write_matches_csv(path, &report.clusters, &store).context("Failed to export matched pairs")?;
    }
    if let Some(path) = &args.report_json {
        write_report_json(path, &report).context("Failed to write run report")?;
    }

    info!("Pipeline completed in {:.2?}", report.total_duration());
    Ok(())
}
