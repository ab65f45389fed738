// 💾 Sinks - persist admitted town records
// Two backends behind one trait: append-only CSV and transactional SQLite

use crate::db::{self, Event, TownKey};
use crate::ledger::DedupLedger;
use crate::parser::{SourceFile, TownRecord};
use crate::resolver;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Header row of the flat-file output
pub const CSV_HEADER: [&str; 4] = ["Governorate", "City", "District", "Town"];

// ============================================================================
// SINK TRAIT
// ============================================================================

/// Sink - "persist admitted records, seeded from existing state"
///
/// Each implementation owns its dedup ledger; `accept` returns true only
/// for records that will end up in the destination.
pub trait Sink {
    /// Human-readable destination (file path)
    fn destination(&self) -> String;

    /// Offer one record; true if it was new and is being persisted
    fn accept(&mut self, record: &TownRecord) -> Result<bool>;

    /// Called after each source file with the number of records it added
    fn file_done(&mut self, _source: &SourceFile, _new_towns: usize) -> Result<()> {
        Ok(())
    }

    /// Make everything durable; returns the number of rows written
    fn finish(self) -> Result<usize>
    where
        Self: Sized;
}

// ============================================================================
// CSV SINK
// ============================================================================

/// Append-only CSV sink keyed on the full 4-tuple
pub struct CsvSink {
    path: PathBuf,
    ledger: DedupLedger<TownRecord>,
    pending: Vec<TownRecord>,
    /// Existing file does not end in a newline
    needs_newline: bool,
}

impl CsvSink {
    /// Load every existing row of `path` (if any) into the ledger
    pub fn open(path: &Path) -> Result<Self> {
        let (existing, needs_newline) = if path.exists() {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read existing CSV {}", path.display()))?;
            let needs_newline = !bytes.is_empty() && !bytes.ends_with(b"\n");
            (load_csv_rows(&bytes)?, needs_newline)
        } else {
            (Vec::new(), false)
        };

        info!("Loaded {} existing rows from {}", existing.len(), path.display());

        Ok(CsvSink {
            path: path.to_path_buf(),
            ledger: DedupLedger::seeded(existing),
            pending: Vec::new(),
            needs_newline,
        })
    }

    /// Rows admitted so far and waiting for `finish`
    pub fn pending(&self) -> &[TownRecord] {
        &self.pending
    }
}

/// Parse existing CSV content, skipping the header row when present
fn load_csv_rows(bytes: &[u8]) -> Result<Vec<TownRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result.context("Failed to parse existing CSV row")?;

        if index == 0 && record.iter().eq(CSV_HEADER.iter().copied()) {
            continue;
        }

        if record.len() != CSV_HEADER.len() {
            warn!("Ignoring malformed CSV row {} ({} fields)", index + 1, record.len());
            continue;
        }

        rows.push(TownRecord::new(&record[0], &record[1], &record[2], &record[3]));
    }

    Ok(rows)
}

impl Sink for CsvSink {
    fn destination(&self) -> String {
        self.path.display().to_string()
    }

    fn accept(&mut self, record: &TownRecord) -> Result<bool> {
        if !self.ledger.admit(record.clone()) {
            return Ok(false);
        }
        self.pending.push(record.clone());
        Ok(true)
    }

    fn finish(self) -> Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {} for append", self.path.display()))?;

        let is_empty = file.metadata()?.len() == 0;
        if self.needs_newline {
            file.write_all(b"\n")?;
        }

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_empty {
            wtr.write_record(CSV_HEADER)?;
        }

        for row in &self.pending {
            wtr.write_record([&row.governorate, &row.city, &row.district, &row.town])?;
        }

        wtr.flush()
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        Ok(self.pending.len())
    }
}

// ============================================================================
// SQLITE SINK
// ============================================================================

/// Relational sink: one transaction for the whole walk
///
/// Dropping the sink without calling `finish` rolls everything back.
pub struct SqliteSink<'conn> {
    tx: rusqlite::Transaction<'conn>,
    ledger: DedupLedger<TownKey>,
    inserted: usize,
    label: String,
}

impl<'conn> SqliteSink<'conn> {
    /// Begin the run transaction and seed the ledger from the town table
    pub fn begin(conn: &'conn mut Connection) -> Result<Self> {
        let label = db::database_file(conn)?.unwrap_or_else(|| ":memory:".to_string());

        let tx = conn.transaction().context("Failed to begin transaction")?;
        let existing = db::load_town_keys(&tx)?;

        info!("Loaded {} existing towns from {}", existing.len(), label);

        Ok(SqliteSink {
            tx,
            ledger: DedupLedger::seeded(existing),
            inserted: 0,
            label,
        })
    }
}

impl<'conn> Sink for SqliteSink<'conn> {
    fn destination(&self) -> String {
        self.label.clone()
    }

    fn accept(&mut self, record: &TownRecord) -> Result<bool> {
        let district_id =
            resolver::resolve_chain(&self.tx, &record.governorate, &record.city, &record.district)?;

        if !self.ledger.admit((district_id, record.town.clone())) {
            return Ok(false);
        }

        match db::insert_town_if_absent(&self.tx, &record.town, district_id)? {
            Some(town_id) => {
                debug!("Inserted town ID: {} for town: {}", town_id.0, record.town);
                self.inserted += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn file_done(&mut self, source: &SourceFile, new_towns: usize) -> Result<()> {
        if new_towns == 0 {
            return Ok(());
        }

        let event = Event::new(
            "towns_added",
            "source_file",
            &source.key(),
            serde_json::json!({
                "governorate": source.governorate,
                "city": source.city,
                "new_towns": new_towns,
            }),
            "directory_import",
        );
        db::insert_event(&self.tx, &event)
    }

    fn finish(self) -> Result<usize> {
        self.tx.commit().context("Failed to commit import transaction")?;
        Ok(self.inserted)
    }
}
