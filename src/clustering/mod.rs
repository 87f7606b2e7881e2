pub mod ricochet;
pub mod unique_mapping;

use std::collections::BTreeMap;

use crate::error::{DedupeError, DedupeResult};
use crate::models::core::{DatasetKind, ProfileStore};
use crate::models::matching::{Cluster, ScoredPair};
use crate::utils::pipeline_config::{ClusteringConfig, ClusteringMethod};

pub use ricochet::RicochetSrClustering;
pub use unique_mapping::UniqueMappingClustering;

/// Fails when the clustering method cannot run on this kind of dataset.
/// Called before any stage starts.
pub fn validate_clustering(config: &ClusteringConfig, store: &ProfileStore) -> DedupeResult<()> {
    if config.method() == ClusteringMethod::UniqueMapping && store.kind() != DatasetKind::Bilateral {
        return Err(DedupeError::config(
            "unique_mapping clustering requires two sources (bilateral data)",
        ));
    }
    Ok(())
}

/// Groups every record of `store` into exactly one cluster.
pub fn cluster_entities(
    config: &ClusteringConfig,
    pairs: &[ScoredPair],
    store: &ProfileStore,
) -> DedupeResult<Vec<Cluster>> {
    validate_clustering(config, store)?;
    let clusters = match config.method() {
        ClusteringMethod::RicochetSr => RicochetSrClustering::new(config.threshold()).cluster(pairs, store.len()),
        ClusteringMethod::UniqueMapping => {
            UniqueMappingClustering::new(config.threshold()).cluster(pairs, store.len())
        }
    };
    Ok(clusters)
}

/// Builds clusters from `(cluster key, record)` assignments, sorted by their
/// smallest member.
pub(crate) fn into_clusters(assignments: impl IntoIterator<Item = (usize, usize)>) -> Vec<Cluster> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (key, record) in assignments {
        groups.entry(key).or_default().push(record);
    }
    let mut clusters: Vec<Cluster> = groups.into_values().map(Cluster::new).collect();
    clusters.sort_by_key(|c| c.members.first().copied());
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::EntityProfile;

    #[test]
    fn test_unique_mapping_rejects_single_source() {
        let store = ProfileStore::unilateral(vec![EntityProfile::new("x"), EntityProfile::new("y")]).unwrap();
        let config = ClusteringConfig::new(ClusteringMethod::UniqueMapping, 0.1).unwrap();
        assert!(matches!(
            cluster_entities(&config, &[], &store),
            Err(DedupeError::Configuration(_))
        ));
    }

    #[test]
    fn test_into_clusters_orders_by_smallest_member() {
        let clusters = into_clusters(vec![(9, 4), (9, 1), (2, 3), (2, 2), (0, 0)]);
        assert_eq!(
            clusters,
            vec![Cluster::singleton(0), Cluster::new(vec![1, 4]), Cluster::new(vec![2, 3])]
        );
    }
}
