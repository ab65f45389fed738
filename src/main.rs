use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use town_ledger::config::LogLevel;
use town_ledger::{
    get_recent_events, open_database, run_import, table_counts, Config, CsvSink, GoogleTranslator,
    ImportReport, Passthrough, SqliteSink, Translator,
};

#[derive(Parser)]
#[command(name = "town-ledger")]
#[command(about = "Incremental import of governorate/city/district/town listings")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "town-ledger.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Show report labels untranslated
    #[arg(long)]
    no_translate: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append new towns to a CSV file
    Csv {
        /// Root directory with one folder per governorate
        input_dir: Option<PathBuf>,

        /// CSV destination
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Insert new towns into a SQLite database
    Sqlite {
        /// Root directory with one folder per governorate
        input_dir: Option<PathBuf>,

        /// Database file
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Show table counts and recent imports
    Stats {
        /// Database file
        #[arg(long)]
        db: Option<PathBuf>,

        /// Number of audit events to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config)?;

    let log_level = match cli.verbose {
        0 => match config.logging.level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        },
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if cli.no_translate {
        config.translation.enabled = false;
    }

    match cli.command {
        Commands::Csv { input_dir, output } => {
            if let Some(dir) = input_dir {
                config.source.input_dir = dir;
            }
            if let Some(path) = output {
                config.csv.output = path;
            }

            let sink = CsvSink::open(&config.csv.output)?;
            let report = run_import(&config.source, sink)?;
            print_report(&config, &report, cli.json)?;
        }
        Commands::Sqlite { input_dir, db } => {
            if let Some(dir) = input_dir {
                config.source.input_dir = dir;
            }
            if let Some(path) = db {
                config.database.path = path;
            }

            let mut conn = open_database(&config.database.path)?;
            let sink = SqliteSink::begin(&mut conn)?;
            let report = run_import(&config.source, sink)?;
            print_report(&config, &report, cli.json)?;
        }
        Commands::Stats { db, limit } => {
            if let Some(path) = db {
                config.database.path = path;
            }
            run_stats(&config, limit, cli.json)?;
        }
    }

    Ok(())
}

fn translator_for(config: &Config) -> Box<dyn Translator> {
    if !config.translation.enabled {
        return Box::new(Passthrough);
    }

    match GoogleTranslator::new(&config.translation) {
        Ok(translator) => Box::new(translator),
        Err(e) => {
            warn!("Translation disabled: {}", e);
            Box::new(Passthrough)
        }
    }
}

fn print_report(config: &Config, report: &ImportReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "✓ Processing completed. {} new rows added to {}",
        report.total(),
        report.destination
    );

    if !report.is_empty() {
        let translator = translator_for(config);
        println!("\n📊 Report: Number of new towns added per file:");
        for line in report.render(translator.as_ref()) {
            println!("{}", line);
        }
    }

    Ok(())
}

fn run_stats(config: &Config, limit: usize, json: bool) -> Result<()> {
    let conn = open_database(&config.database.path)?;
    let counts = table_counts(&conn)?;
    let events = get_recent_events(&conn, limit)?;

    if json {
        let out = serde_json::json!({ "counts": counts, "events": events });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("🗄️  {}", config.database.path.display());
    println!("   Governorates: {}", counts.governorates);
    println!("   Cities:       {}", counts.cities);
    println!("   Districts:    {}", counts.districts);
    println!("   Towns:        {}", counts.towns);

    if !events.is_empty() {
        println!("\nRecent imports:");
        for event in &events {
            println!(
                "   {}  {}  {}",
                event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                event.entity_id,
                event.data["new_towns"]
            );
        }
    }

    Ok(())
}
