//! Refwrite CLI - apply multi-table write requests

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use refwrite::config::{self, RefwriteConfig};
use refwrite::output::is_quiet;
use refwrite::storage::{RecordingConnection, SqliteConnection};
use refwrite::ui::{self, Icons};
use refwrite::{Dialect, OperationKind, WriteOrchestrator, WriteReport, WriteRequest};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "refwrite")]
#[command(version)]
#[command(about = "Multi-table write orchestration with symbolic cross-table references")]
#[command(long_about = r#"
Refwrite applies one JSON request describing writes to several related tables.
Columns may reference identifiers produced earlier in the same request:

  {
    "user": { "columnVals": { "name": "amirtha" } },
    "address_details": {
      "columnVals": { "city": "saun" },
      "referenceKey": { "user_id": "$user.id" }
    }
  }

Example usage:
  refwrite apply --method insert --request request.json --database app.db
  refwrite render --method update --request request.json --dialect postgres
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a request to a SQLite database inside one transaction
    Apply {
        /// Operation kind (insert/post or update/patch)
        #[arg(short, long)]
        method: String,

        /// Request file, or `-` for stdin
        #[arg(short, long)]
        request: PathBuf,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// SQL script to run before the request
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Record statements instead of executing them
        #[arg(long)]
        dry_run: bool,

        /// Dialect used to render statements in dry-run mode
        #[arg(long)]
        dialect: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Render the statements a request would produce, without a database
    Render {
        /// Operation kind (insert/post or update/patch)
        #[arg(short, long)]
        method: String,

        /// Request file, or `-` for stdin
        #[arg(short, long)]
        request: PathBuf,

        /// SQL dialect (postgres, mysql, sqlite)
        #[arg(long)]
        dialect: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write a default refwrite.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let loaded = config::load_config(Some(config_path.as_path()))?.unwrap_or_default();

    match cli.command {
        Commands::Apply { method, request, database, schema, dry_run, dialect, format } => {
            let kind: OperationKind = method.parse()?;
            let write_request = read_request(&request)?;

            if dry_run {
                let dialect = resolve_dialect(dialect.as_deref(), &loaded)?;
                let report = dry_run_request(kind, write_request, dialect)?;
                return print_report(&report, &format, true);
            }

            let database = database
                .or_else(|| loaded.database.as_ref().map(PathBuf::from))
                .unwrap_or_else(config::default_database_path);
            let schema = schema.or_else(|| loaded.schema.as_ref().map(PathBuf::from));

            if let Some(configured) = dialect.as_deref().or(loaded.dialect.as_deref()) {
                if configured.parse::<Dialect>()? != Dialect::Sqlite {
                    ui::warn(&format!("Dialect `{}` ignored: statements run against SQLite", configured));
                }
            }

            let report = apply_request(kind, write_request, &database, schema.as_deref())?;
            print_report(&report, &format, false)?;
        }

        Commands::Render { method, request, dialect, format } => {
            let kind: OperationKind = method.parse()?;
            let write_request = read_request(&request)?;
            let dialect = resolve_dialect(dialect.as_deref(), &loaded)?;

            let report = dry_run_request(kind, write_request, dialect)?;
            print_report(&report, &format, true)?;
        }

        Commands::Init { force } => {
            let defaults = RefwriteConfig {
                database: Some(config::default_database_path().display().to_string()),
                dialect: Some(Dialect::Sqlite.to_string()),
                schema: None,
            };
            config::write_config(&config_path, &defaults, force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
        }
    }

    Ok(())
}

fn read_request(path: &Path) -> anyhow::Result<WriteRequest> {
    let mut body = String::new();
    if path.as_os_str() == "-" {
        std::io::stdin().read_to_string(&mut body)?;
    } else {
        body = std::fs::read_to_string(path)?;
    }
    Ok(WriteRequest::from_json_str(&body)?)
}

fn resolve_dialect(flag: Option<&str>, loaded: &RefwriteConfig) -> anyhow::Result<Dialect> {
    match flag.or(loaded.dialect.as_deref()) {
        Some(name) => Ok(name.parse()?),
        None => Ok(Dialect::default()),
    }
}

fn dry_run_request(kind: OperationKind, request: WriteRequest, dialect: Dialect) -> anyhow::Result<WriteReport> {
    let mut orchestrator = WriteOrchestrator::new(RecordingConnection::new(), dialect);
    Ok(orchestrator.run(kind, request)?)
}

/// Run the request in one transaction; any failure rolls every entity back
fn apply_request(
    kind: OperationKind,
    request: WriteRequest,
    database: &Path,
    schema: Option<&Path>,
) -> anyhow::Result<WriteReport> {
    config::ensure_db_dir(database)?;
    let mut conn = SqliteConnection::open(database)?;

    if let Some(schema) = schema {
        let script = std::fs::read_to_string(schema)?;
        conn.apply_schema(&script)?;
    }

    let result = conn.run_in_transaction(|conn| WriteOrchestrator::new(conn, Dialect::Sqlite).run(kind, request));
    if result.is_err() {
        ui::info(&format!("{} Rolled back", Icons::UNDO), &database.display().to_string());
    }
    Ok(result?)
}

fn print_report(report: &WriteReport, format: &str, dry_run: bool) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let mode = if dry_run { format!("{} dry run", Icons::DRY) } else { format!("{} applied", Icons::DATABASE) };
    ui::header(&format!("{} request ({})", report.operation, mode));

    for outcome in &report.entities {
        ui::statement(&outcome.entity, &outcome.sql);
    }

    if !is_quiet() {
        ui::section(&format!("{} Results", Icons::STATS));
        println!("{}", ui::outcome_table(&report.entities));

        if !report.registry.is_empty() {
            ui::section(&format!("{} Registered identifiers", Icons::KEY));
            println!("{}", ui::registry_table(&report.registry));
        }
    }

    ui::success(&format!("{} entities written", report.entities.len()));
    Ok(())
}
