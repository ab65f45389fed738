// 📂 Text Extractor - governorate folders → city files → town records
// Walks the listing tree and tracks the "current subdistrict" cursor per file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Marker that opens a subdistrict block ("towns and villages of subdistrict")
pub const DEFAULT_HEADER_MARKER: &str = "بلدات وقرى ناحية";

/// Extension of the per-city listing files
pub const DEFAULT_EXTENSION: &str = "txt";

// ============================================================================
// CORE TYPES
// ============================================================================

/// TownRecord - one (governorate, city, district, town) tuple
///
/// In the flat-file backend this tuple *is* the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TownRecord {
    #[serde(rename = "Governorate")]
    pub governorate: String,

    #[serde(rename = "City")]
    pub city: String,

    /// Empty when no header line preceded the town
    #[serde(rename = "District")]
    pub district: String,

    #[serde(rename = "Town")]
    pub town: String,
}

impl TownRecord {
    pub fn new(governorate: &str, city: &str, district: &str, town: &str) -> Self {
        TownRecord {
            governorate: governorate.to_string(),
            city: city.to_string(),
            district: district.to_string(),
            town: town.to_string(),
        }
    }
}

/// SourceFile - a city listing inside a governorate folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub governorate: String,
    pub city: String,
    pub path: PathBuf,
}

impl SourceFile {
    /// Report key: "Governorate - City"
    pub fn key(&self) -> String {
        format!("{} - {}", self.governorate, self.city)
    }

    /// Read the file and extract its town records in line order
    pub fn read_records(&self, header_marker: &str) -> Result<Vec<TownRecord>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        Ok(TownLines::new(&self.governorate, &self.city, &content, header_marker).collect())
    }
}

// ============================================================================
// LINE GRAMMAR
// ============================================================================

/// Lazy iterator over the town lines of one listing
///
/// Header lines move the subdistrict cursor, blank lines are skipped and
/// every other line becomes a record under the current cursor.
pub struct TownLines<'a> {
    governorate: &'a str,
    city: &'a str,
    header_marker: &'a str,
    subdistrict: String,
    lines: std::str::Lines<'a>,
}

impl<'a> TownLines<'a> {
    pub fn new(governorate: &'a str, city: &'a str, content: &'a str, header_marker: &'a str) -> Self {
        TownLines {
            governorate,
            city,
            header_marker,
            subdistrict: String::new(),
            lines: content.lines(),
        }
    }
}

impl<'a> Iterator for TownLines<'a> {
    type Item = TownRecord;

    fn next(&mut self) -> Option<TownRecord> {
        for line in self.lines.by_ref() {
            let stripped = line.trim();

            if let Some(rest) = stripped.strip_prefix(self.header_marker) {
                self.subdistrict = rest.trim().to_string();
            } else if !stripped.is_empty() {
                return Some(TownRecord::new(
                    self.governorate,
                    self.city,
                    &self.subdistrict,
                    stripped,
                ));
            }
        }

        None
    }
}

// ============================================================================
// DIRECTORY WALK
// ============================================================================

/// Enumerate city files under `root`, in sorted order.
///
/// Only immediate subdirectories count as governorates, and only files
/// ending in `.{extension}` count as cities; anything else is skipped.
/// Calling this again re-walks the tree from scratch.
pub fn discover_sources(root: &Path, extension: &str) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();

    for governorate_path in sorted_entries(root)
        .with_context(|| format!("Failed to read input directory {}", root.display()))?
    {
        if !governorate_path.is_dir() {
            continue;
        }
        let Some(governorate) = file_name(&governorate_path) else {
            continue;
        };

        let city_paths = match sorted_entries(&governorate_path) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Skipping governorate {}: {}", governorate_path.display(), e);
                continue;
            }
        };

        for city_path in city_paths {
            if !city_path.is_file() {
                continue;
            }
            let Some(city) = city_name(&city_path, extension) else {
                continue;
            };

            debug!("Found listing {} / {}", governorate, city);
            sources.push(SourceFile {
                governorate: governorate.trim().to_string(),
                city: city.trim().to_string(),
                path: city_path,
            });
        }
    }

    Ok(sources)
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
}

/// City name = file name minus `.{extension}`
fn city_name(path: &Path, extension: &str) -> Option<String> {
    let name = file_name(path)?;
    let suffix = format!(".{}", extension);
    name.strip_suffix(&suffix).map(|stem| stem.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> Vec<TownRecord> {
        TownLines::new("Aleppo", "Aleppo", content, DEFAULT_HEADER_MARKER).collect()
    }

    #[test]
    fn test_header_sets_district_for_following_lines() {
        let content = "بلدات وقرى ناحية جبل سمعان\nدير حافر\nحيان\nبلدات وقرى ناحية الباب\nدير حافر\n";
        let records = parse(content);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], TownRecord::new("Aleppo", "Aleppo", "جبل سمعان", "دير حافر"));
        assert_eq!(records[1].district, "جبل سمعان");
        assert_eq!(records[1].town, "حيان");
        assert_eq!(records[2], TownRecord::new("Aleppo", "Aleppo", "الباب", "دير حافر"));
    }

    #[test]
    fn test_town_before_any_header_has_empty_district() {
        let records = parse("عندان\nبلدات وقرى ناحية الباب\nتادف\n");

        assert_eq!(records[0].district, "");
        assert_eq!(records[0].town, "عندان");
        assert_eq!(records[1].district, "الباب");
    }

    #[test]
    fn test_blank_lines_and_whitespace_are_ignored() {
        let records = parse("\n   \n  بلدات وقرى ناحية   الباب  \r\n\n  تادف  \r\n\t\n");

        assert_eq!(records, vec![TownRecord::new("Aleppo", "Aleppo", "الباب", "تادف")]);
    }

    #[test]
    fn test_header_only_file_yields_nothing() {
        assert!(parse("بلدات وقرى ناحية الباب\n").is_empty());
    }

    #[test]
    fn test_discover_sources_skips_non_matching_entries() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::create_dir(root.join("Idlib")).unwrap();
        fs::create_dir(root.join("Aleppo")).unwrap();
        fs::write(root.join("Aleppo").join("Manbij.txt"), "x\n").unwrap();
        fs::write(root.join("Aleppo").join("Aleppo.txt"), "x\n").unwrap();
        fs::write(root.join("Aleppo").join("notes.md"), "x\n").unwrap();
        fs::create_dir(root.join("Aleppo").join("nested.txt")).unwrap();
        fs::write(root.join("Idlib").join("Harem.txt"), "x\n").unwrap();
        fs::write(root.join("README.txt"), "top-level file\n").unwrap();

        let sources = discover_sources(root, DEFAULT_EXTENSION).unwrap();
        let keys: Vec<String> = sources.iter().map(|s| s.key()).collect();

        assert_eq!(
            keys,
            vec!["Aleppo - Aleppo", "Aleppo - Manbij", "Idlib - Harem"]
        );
    }

    #[test]
    fn test_discover_sources_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let result = discover_sources(&dir.path().join("missing"), DEFAULT_EXTENSION);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_records_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Aleppo.txt");
        fs::write(&path, "بلدات وقرى ناحية الباب\nتادف\n").unwrap();

        let source = SourceFile {
            governorate: "Aleppo".to_string(),
            city: "Aleppo".to_string(),
            path,
        };

        let records = source.read_records(DEFAULT_HEADER_MARKER).unwrap();
        assert_eq!(records, vec![TownRecord::new("Aleppo", "Aleppo", "الباب", "تادف")]);
        assert_eq!(source.key(), "Aleppo - Aleppo");
    }
}
