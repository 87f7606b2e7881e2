pub mod export;
pub mod performance;

pub use export::{write_matches_csv, write_report_json};
pub use performance::{
    evaluate_blocks, evaluate_clusters, evaluate_comparisons, evaluate_matches, fingerprint,
};
