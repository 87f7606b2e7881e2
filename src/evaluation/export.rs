// src/evaluation/export.rs - Writes matched pairs and run reports to disk

use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{DedupeError, DedupeResult};
use crate::models::core::{ProfileStore, Source};
use crate::models::matching::Cluster;
use crate::models::stats_models::RunReport;

/// One row per comparable pair inside each non-singleton cluster:
/// `cluster,id_a,id_b`. Bilateral rows put the source A id first.
pub fn write_matches_csv(path: &Path, clusters: &[Cluster], store: &ProfileStore) -> DedupeResult<usize> {
    let file = File::create(path).map_err(|e| DedupeError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer.write_record(["cluster", "id_a", "id_b"])?;

    let mut rows = 0usize;
    for (cluster_id, cluster) in clusters.iter().enumerate().filter(|(_, c)| !c.is_singleton()) {
        let label = cluster_id.to_string();
        for (i, &a) in cluster.members.iter().enumerate() {
            for &b in &cluster.members[i + 1..] {
                if !store.is_comparable(a, b) {
                    continue;
                }
                let (first, second) = match store.source_of(a) {
                    Source::A => (a, b),
                    Source::B => (b, a),
                };
                writer.write_record([label.as_str(), store.id_of(first), store.id_of(second)])?;
                rows += 1;
            }
        }
    }
    writer.flush().map_err(|e| DedupeError::io(path, e))?;

    info!("💾 Wrote {} matched pairs to {}", rows, path.display());
    Ok(rows)
}

pub fn write_report_json(path: &Path, report: &RunReport) -> DedupeResult<()> {
    let file = File::create(path).map_err(|e| DedupeError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    info!("💾 Wrote run report {} to {}", report.run_id, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::EntityProfile;
    use tempfile::TempDir;

    #[test]
    fn test_matches_csv_lists_cross_source_pairs() {
        let store = ProfileStore::bilateral(
            vec![EntityProfile::new("a1"), EntityProfile::new("a2")],
            vec![EntityProfile::new("g1"), EntityProfile::new("g2")],
        )
        .unwrap();
        let clusters = vec![
            Cluster::new(vec![0, 1, 3]),
            Cluster::singleton(2),
        ];
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("matches.csv");

        let rows = write_matches_csv(&path, &clusters, &store).unwrap();
        assert_eq!(rows, 2);
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "cluster,id_a,id_b\n0,a1,g2\n0,a2,g2\n");
    }
}
