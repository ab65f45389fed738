// 🔄 Import Pipeline - Extractor → Ledger → Sink, with the report alongside

use crate::config::SourceConfig;
use crate::parser::{discover_sources, SourceFile};
use crate::report::ImportReport;
use crate::sink::Sink;
use anyhow::Result;
use tracing::{info, warn};

/// Walk `config.input_dir` and push every record through `sink`.
///
/// Unreadable files are skipped with a warning; sink errors abort the run
/// before `finish`, leaving the destination untouched.
pub fn run_import<S: Sink>(config: &SourceConfig, sink: S) -> Result<ImportReport> {
    let sources = discover_sources(&config.input_dir, &config.extension)?;
    info!(
        "Found {} listing files under {}",
        sources.len(),
        config.input_dir.display()
    );

    import_sources(&sources, &config.header_marker, sink)
}

/// Import an already discovered set of files
pub fn import_sources<S: Sink>(
    sources: &[SourceFile],
    header_marker: &str,
    mut sink: S,
) -> Result<ImportReport> {
    let mut report = ImportReport::new(&sink.destination());

    for source in sources {
        let records = match source.read_records(header_marker) {
            Ok(records) => records,
            Err(e) => {
                warn!("Skipping {}: {:#}", source.path.display(), e);
                continue;
            }
        };

        let mut new_towns = 0;
        for record in &records {
            if sink.accept(record)? {
                new_towns += 1;
            }
        }

        info!(
            "{}: {} lines, {} new towns",
            source.key(),
            records.len(),
            new_towns
        );

        sink.file_done(source, new_towns)?;
        report.record(&source.key(), new_towns);
    }

    let written = sink.finish()?;
    debug_assert_eq!(written, report.total());

    info!(
        "Processing completed. {} new rows added to {}",
        written, report.destination
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TownRecord;
    use std::fs;
    use tempfile::TempDir;

    /// Collects admitted records in memory
    #[derive(Default)]
    struct MemorySink {
        rows: Vec<TownRecord>,
    }

    impl Sink for MemorySink {
        fn destination(&self) -> String {
            "memory".to_string()
        }

        fn accept(&mut self, record: &TownRecord) -> Result<bool> {
            if self.rows.contains(record) {
                return Ok(false);
            }
            self.rows.push(record.clone());
            Ok(true)
        }

        fn finish(self) -> Result<usize> {
            Ok(self.rows.len())
        }
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("Aleppo.txt");
        fs::write(&good, "تادف\n").unwrap();

        let sources = vec![
            SourceFile {
                governorate: "Aleppo".to_string(),
                city: "Ghost".to_string(),
                path: dir.path().join("missing.txt"),
            },
            SourceFile {
                governorate: "Aleppo".to_string(),
                city: "Aleppo".to_string(),
                path: good,
            },
        ];

        let report = import_sources(&sources, "بلدات وقرى ناحية", MemorySink::default()).unwrap();

        assert_eq!(report.to_map().len(), 1);
        assert_eq!(report.get("Aleppo - Aleppo"), Some(1));
        assert_eq!(report.destination, "memory");
    }

    #[test]
    fn test_repeated_lines_count_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Aleppo.txt");
        fs::write(&path, "تادف\nتادف\n\nتادف\n").unwrap();

        let sources = vec![SourceFile {
            governorate: "Aleppo".to_string(),
            city: "Aleppo".to_string(),
            path,
        }];

        let report = import_sources(&sources, "بلدات وقرى ناحية", MemorySink::default()).unwrap();
        assert_eq!(report.get("Aleppo - Aleppo"), Some(1));
    }
}
