//! Configuration loading for the exporter
//!
//! Two pieces of configuration live here:
//! - [`ExportConfig`]: what to export and how, passed explicitly to the
//!   exporter so several configurations can coexist in one process
//! - [`GmailCredentials`]: OAuth client credentials, loaded (in order of
//!   priority) from compile-time env vars, the credentials JSON file in the
//!   threadkeep config directory, or runtime env vars

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::naming::{MIN_FILENAME_LEN, NamingOptions};
use crate::render::RenderMode;

/// Credentials filename in the threadkeep config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Export configuration filename in the threadkeep config directory
pub const EXPORT_CONFIG_FILE: &str = "export.json";

/// Default ledger database filename in the threadkeep data directory
const LEDGER_FILE: &str = "ledger.db";

/// Everything the exporter needs to know about one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Destination folder for archives, attachments and run logs
    pub destination: PathBuf,
    /// Search queries, in priority order (first match owns a thread)
    pub queries: Vec<String>,
    /// Maximum number of threads discovered per query
    pub max_per_query: usize,
    /// Threads requested per search page
    pub page_size: usize,
    /// Pause after each search page and each exported thread
    pub delay_ms: u64,
    pub render_mode: RenderMode,
    /// Also copy every attachment into a per-thread sub-folder
    pub save_attachments: bool,
    /// Prefix of the per-run CSV acquisition log
    pub log_file_prefix: String,
    /// Suffix appended to the archive stem for the attachment sub-folder
    pub attachment_folder_suffix: String,
    /// Prefix for ledger keys, keeps them apart from unrelated keys
    pub ledger_key_prefix: String,
    /// Upper bound on generated file names, in characters
    pub max_filename_len: usize,
    /// SQLite ledger location (defaults to the threadkeep data directory)
    pub ledger_path: Option<PathBuf>,
    /// Where transient conversion drafts are written (defaults to the OS temp dir)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("archive"),
            queries: Vec::new(),
            max_per_query: 5000,
            page_size: 100,
            delay_ms: 250,
            render_mode: RenderMode::Plain,
            save_attachments: true,
            log_file_prefix: "acquisition_log_".to_string(),
            attachment_folder_suffix: "_attachments".to_string(),
            ledger_key_prefix: "exported_".to_string(),
            max_filename_len: 180,
            ledger_path: None,
            scratch_dir: None,
        }
    }
}

impl ExportConfig {
    /// Load the export config from `export.json` in the config directory
    pub fn load() -> Result<Self> {
        let config: Self = config::load_json(EXPORT_CONFIG_FILE)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the export config from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = config::load_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the export config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse export config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be greater than zero");
        }
        if self.max_per_query == 0 {
            bail!("max_per_query must be greater than zero");
        }
        if self.ledger_key_prefix.is_empty() {
            bail!("ledger_key_prefix must not be empty");
        }
        if self.log_file_prefix.trim().is_empty() {
            bail!("log_file_prefix must not be empty");
        }
        if self.max_filename_len < MIN_FILENAME_LEN {
            bail!(
                "max_filename_len must be at least {} to fit the thread suffix",
                MIN_FILENAME_LEN
            );
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Naming settings derived from this config
    pub fn naming(&self) -> NamingOptions {
        NamingOptions {
            max_len: self.max_filename_len,
            ..NamingOptions::default()
        }
    }

    /// Resolve the ledger database path
    pub fn resolved_ledger_path(&self) -> Result<PathBuf> {
        match &self.ledger_path {
            Some(path) => Ok(path.clone()),
            None => config::data_path(LEDGER_FILE).context("Could not determine data directory"),
        }
    }

    /// Resolve the scratch directory for conversion drafts
    pub fn resolved_scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("threadkeep-drafts"))
    }
}

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials
    /// 2. JSON file (~/.config/threadkeep/google-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Load credentials embedded at compile time via environment variables.
    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}
