pub mod ground_truth;
pub mod profiles;
pub mod word_vectors;

use log::info;
use std::path::Path;

use crate::error::DedupeResult;
use crate::models::core::ProfileStore;

pub use ground_truth::{load_ground_truth, GroundTruth, GroundTruthOptions};
pub use profiles::{load_profiles, ProfileFormat, ProfileReaderOptions};
pub use word_vectors::WordVectors;

/// Loads one source (dirty ER) or two sources (clean-clean ER) into a store.
pub fn load_store(
    source_a: &Path,
    source_b: Option<&Path>,
    options: &ProfileReaderOptions,
) -> DedupeResult<ProfileStore> {
    let profiles_a = load_profiles(source_a, options)?;
    let store = match source_b {
        Some(path) => ProfileStore::bilateral(profiles_a, load_profiles(path, options)?)?,
        None => ProfileStore::unilateral(profiles_a)?,
    };
    info!(
        "📚 Profile store ready: {} profiles ({:?}, {} in source A)",
        store.len(),
        store.kind(),
        store.split()
    );
    Ok(store)
}
