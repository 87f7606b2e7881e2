// src/loading/profiles.rs - Entity profile readers (delimited text or JSON)

use log::{debug, info};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{DedupeError, DedupeResult};
use crate::models::core::EntityProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    Csv,
    Json,
}

impl ProfileFormat {
    /// `.json` files hold pre-serialized profiles; anything else is delimited text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ProfileFormat::Json,
            _ => ProfileFormat::Csv,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileReaderOptions {
    pub separator: u8,
    pub id_column: usize,
}

impl Default for ProfileReaderOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            id_column: 0,
        }
    }
}

pub fn load_profiles(path: &Path, options: &ProfileReaderOptions) -> DedupeResult<Vec<EntityProfile>> {
    let profiles = match ProfileFormat::from_path(path) {
        ProfileFormat::Csv => read_csv_profiles(path, options)?,
        ProfileFormat::Json => read_json_profiles(path)?,
    };
    info!("📥 Loaded {} profiles from {}", profiles.len(), path.display());
    Ok(profiles)
}

/// Reads a delimited file whose first row holds attribute names. Any row with
/// the wrong number of columns, an empty identifier, or a repeated identifier
/// aborts the whole load.
pub fn read_csv_profiles(path: &Path, options: &ProfileReaderOptions) -> DedupeResult<Vec<EntityProfile>> {
    let file = File::open(path).map_err(|e| DedupeError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.separator)
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DedupeError::parse(path, 1, e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Ok(Vec::new());
    }
    if options.id_column >= headers.len() {
        return Err(DedupeError::parse(
            path,
            1,
            format!(
                "id column {} out of range for {} columns",
                options.id_column,
                headers.len()
            ),
        ));
    }

    let mut profiles = Vec::new();
    let mut seen_ids = HashSet::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let row = e.position().map(|p| p.line()).unwrap_or(0);
            DedupeError::parse(path, row, e.to_string())
        })?;
        let row = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != headers.len() {
            return Err(DedupeError::parse(
                path,
                row,
                format!("expected {} columns, found {}", headers.len(), record.len()),
            ));
        }

        let id = record.get(options.id_column).unwrap_or("").trim();
        if id.is_empty() {
            return Err(DedupeError::parse(path, row, "missing identifier"));
        }
        if !seen_ids.insert(id.to_string()) {
            return Err(DedupeError::parse(path, row, format!("duplicate identifier '{}'", id)));
        }

        let mut profile = EntityProfile::new(id);
        for (column, value) in record.iter().enumerate() {
            if column == options.id_column {
                continue;
            }
            profile.add_attribute(headers[column].clone(), value.trim());
        }
        profiles.push(profile);
    }

    debug!("Parsed {} rows with attributes {:?}", profiles.len(), headers);
    Ok(profiles)
}

/// Reads profiles previously written with [`write_json_profiles`].
pub fn read_json_profiles(path: &Path) -> DedupeResult<Vec<EntityProfile>> {
    let file = File::open(path).map_err(|e| DedupeError::io(path, e))?;
    let profiles: Vec<EntityProfile> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| DedupeError::parse(path, e.line() as u64, e.to_string()))?;

    let mut seen_ids = HashSet::new();
    for (i, profile) in profiles.iter().enumerate() {
        let row = i as u64 + 1;
        if profile.id.trim().is_empty() {
            return Err(DedupeError::parse(path, row, "missing identifier"));
        }
        if !seen_ids.insert(profile.id.as_str()) {
            return Err(DedupeError::parse(
                path,
                row,
                format!("duplicate identifier '{}'", profile.id),
            ));
        }
    }
    Ok(profiles)
}

pub fn write_json_profiles(path: &Path, profiles: &[EntityProfile]) -> DedupeResult<()> {
    let file = File::create(path).map_err(|e| DedupeError::io(path, e))?;
    serde_json::to_writer(std::io::BufWriter::new(file), profiles)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_csv_profiles() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "amazon.csv",
            "id,title,description,manufacturer,price\n\
             b000jz4hqo,clickart 950 000 - premier image pack,,broderbund,0\n\
             b0006zf55o,\"ca international - arcserve backup r11.1\",backup software,computer associates,0\n",
        );

        let profiles = load_profiles(&path, &ProfileReaderOptions::default()).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].id, "b000jz4hqo");
        // empty description is skipped
        assert_eq!(profiles[0].attributes.len(), 3);
        assert_eq!(profiles[1].attributes[0].name, "title");
        assert_eq!(profiles[1].attributes[0].value, "ca international - arcserve backup r11.1");
    }

    #[test]
    fn test_wrong_column_count_reports_row() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bad.csv", "id,name\na,one\nb,two,extra\n");

        match load_profiles(&path, &ProfileReaderOptions::default()) {
            Err(DedupeError::Parse { row, path: p, .. }) => {
                assert_eq!(row, 3);
                assert!(p.ends_with("bad.csv"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_identifier_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "noid.csv", "id,name\n,one\n");
        assert!(matches!(
            load_profiles(&path, &ProfileReaderOptions::default()),
            Err(DedupeError::Parse { row: 2, .. })
        ));
    }

    #[test]
    fn test_header_only_file_is_empty_not_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.csv", "id,name\n");
        assert!(load_profiles(&path, &ProfileReaderOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_json_profiles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profiles.json");
        let profiles = vec![
            EntityProfile::new("g1").with_attribute("name", "adobe photoshop"),
            EntityProfile::new("g2").with_attribute("name", "norton antivirus"),
        ];
        write_json_profiles(&path, &profiles).unwrap();

        let loaded = load_profiles(&path, &ProfileReaderOptions::default()).unwrap();
        assert_eq!(loaded, profiles);

        let bad = write_file(&dir, "dupes.json", r#"[{"id":"x","attributes":[]},{"id":"x","attributes":[]}]"#);
        assert!(matches!(read_json_profiles(&bad), Err(DedupeError::Parse { row: 2, .. })));
    }

    #[test]
    fn test_semicolon_separator_and_id_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "semi.csv", "name;id\nwidget;w1\n");
        let options = ProfileReaderOptions {
            separator: b';',
            id_column: 1,
        };
        let profiles = load_profiles(&path, &options).unwrap();
        assert_eq!(profiles[0].id, "w1");
        assert_eq!(profiles[0].attributes[0].value, "widget");
    }
}
