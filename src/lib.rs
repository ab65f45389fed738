// Town Ledger - Core Library
// Incremental import of governorate/city/district/town listings into CSV or SQLite

pub mod config;
pub mod db;
pub mod ledger;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod sink;
pub mod translate;

// Re-export commonly used types
pub use config::{Config, SourceConfig, TranslationConfig};
pub use db::{
    CityId, DistrictId, GovernorateId, TownId, Event, TableCounts,
    open_database, setup_database, table_counts, get_recent_events,
};
pub use ledger::DedupLedger;
pub use parser::{SourceFile, TownRecord, TownLines, discover_sources};
pub use pipeline::{run_import, import_sources};
pub use report::{ImportReport, ReportEntry};
pub use resolver::{resolve_governorate, resolve_city, resolve_district, resolve_chain};
pub use sink::{Sink, CsvSink, SqliteSink, CSV_HEADER};
pub use translate::{Translator, GoogleTranslator, Passthrough, TranslateError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
