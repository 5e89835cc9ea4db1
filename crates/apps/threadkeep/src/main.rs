//! Threadkeep - Archive Gmail threads as PDFs with an audit log
//!
//! This is the command-line entry point. All export logic lives in the
//! `archive` crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use archive::queries::{build_queries, load_seeds, queries_to_csv};
use archive::{
    ExportConfig, Exporter, FsDestination, GmailAuth, GmailClient, GmailCredentials,
    KeyValueLedger, LocalPdfBackend, QuerySet, RenderMode, SqliteKeyValueStore,
};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "threadkeep",
    version,
    about = "Export Gmail threads matching saved searches to PDF, exactly once"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every configured query and archive new threads
    Export {
        /// Export config file (defaults to export.json in the config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the render mode (`plain` or `rich`)
        #[arg(long)]
        render: Option<RenderMode>,

        /// Do not copy attachments
        #[arg(long)]
        no_attachments: bool,
    },

    /// Generate precise, intermediate and broad queries from case seeds
    Queries {
        /// Case seeds: a `.csv` sheet or a JSON array
        #[arg(long)]
        seeds: PathBuf,

        /// Print a numbered list instead of a table
        #[arg(long)]
        raw: bool,

        /// Also write the queries to this CSV file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Authorize read-only Gmail access
    Login,

    /// Forget stored Gmail tokens
    Logout,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        warn!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Export {
            config,
            render,
            no_attachments,
        } => export(config.as_deref(), render, no_attachments),
        Command::Queries {
            seeds,
            raw,
            output,
        } => queries(&seeds, raw, output.as_deref()),
        Command::Login => login(),
        Command::Logout => logout(),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<ExportConfig> {
    match path {
        Some(path) => ExportConfig::from_file(path),
        None => ExportConfig::load().with_context(|| {
            format!(
                "No export config found. Create {} or pass --config",
                config::config_path(archive::config::EXPORT_CONFIG_FILE)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| archive::config::EXPORT_CONFIG_FILE.to_string())
            )
        }),
    }
}

fn gmail_client() -> Result<GmailClient> {
    let credentials = GmailCredentials::load().with_context(|| {
        let path = GmailCredentials::default_credentials_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "google-credentials.json".to_string());
        format!(
            "Gmail credentials not found. Place your Google OAuth credentials at {} \
             or set GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
            path
        )
    })?;
    Ok(GmailClient::new(GmailAuth::new(credentials)?))
}

fn export(config_path: Option<&Path>, render: Option<RenderMode>, no_attachments: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(mode) = render {
        config.render_mode = mode;
    }
    if no_attachments {
        config.save_attachments = false;
    }
    if config.queries.is_empty() {
        bail!("The export config lists no queries");
    }

    let client = gmail_client()?;
    client.authenticate()?;

    let ledger_path = config.resolved_ledger_path()?;
    info!("Using ledger at {}", ledger_path.display());
    let store = Arc::new(SqliteKeyValueStore::new(&ledger_path)?);
    let ledger = KeyValueLedger::new(store, config.ledger_key_prefix.clone());
    let destination = FsDestination::new(&config.destination)?;
    let backend = LocalPdfBackend::new(config.resolved_scratch_dir())?;

    let report = Exporter::new(&config, &client, &ledger, &destination, &backend).run()?;

    println!("{}", report.stats);
    println!("Acquisition log: {}", report.log_file.id);
    Ok(())
}

fn queries(seeds_path: &Path, raw: bool, output: Option<&Path>) -> Result<()> {
    let seeds = load_seeds(seeds_path)?;
    let sets: Vec<QuerySet> = seeds.iter().map(build_queries).collect();

    if raw {
        let all = sets.iter().flat_map(|set| set.ordered());
        for (n, query) in all.enumerate() {
            println!("{}. {}", n + 1, query);
        }
    } else {
        for set in &sets {
            println!("{}", set.seed_id);
            println!("  precise:      {}", set.precise);
            println!("  intermediate: {}", set.intermediate);
            println!("  broad:        {}", set.broad);
        }
    }

    if let Some(path) = output {
        std::fs::write(path, queries_to_csv(&sets))
            .with_context(|| format!("Failed to write queries to {:?}", path))?;
        info!("Wrote {} query sets to {}", sets.len(), path.display());
    }
    Ok(())
}

fn login() -> Result<()> {
    let client = gmail_client()?;
    client.authenticate()?;
    info!("Gmail access authorized");
    Ok(())
}

fn logout() -> Result<()> {
    let client = gmail_client()?;
    client.logout()?;
    info!("Stored Gmail tokens removed");
    Ok(())
}
