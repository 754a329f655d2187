//! CLI command definitions and execution
//!
//! Every command loads the configuration, opens credential storage in the
//! data directory and drives a [`Browser`] over the S3 adapter.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use mys3_core::{
    Browser, Config, ConfigManager, CredentialStore, Error, JsonFileStore, Result,
};
use mys3_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod browse;
mod buckets;
mod completions;
mod config;
mod credential;
mod ls;
mod mkdir;
mod put;
mod rm;
mod share;

/// mys3 - S3 browser for the terminal
///
/// Browse buckets and folders, upload, delete and share objects in AWS S3
/// and S3-compatible storage using locally stored credential profiles.
#[derive(Parser, Debug)]
#[command(name = "mys3")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage stored credentials
    #[command(subcommand)]
    Credential(credential::CredentialCommands),

    /// Show or change configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// List buckets visible to the active credential
    Buckets,

    /// List folders and objects
    Ls(ls::LsArgs),

    /// Upload a local file
    Put(put::PutArgs),

    /// Remove objects
    Rm(rm::RmArgs),

    /// Create a folder
    Mkdir(mkdir::MkdirArgs),

    /// Generate a presigned download URL
    Share(share::ShareArgs),

    /// Browse interactively
    Browse(browse::BrowseArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let flags = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    if let Commands::Completions(args) = cli.command {
        return completions::execute(args);
    }

    let session = match Session::open(flags.clone()) {
        Ok(session) => session,
        Err(e) => {
            let formatter = Formatter::new(flags);
            formatter.failure(&e);
            return ExitCode::from_error(&e);
        }
    };

    match cli.command {
        Commands::Credential(cmd) => credential::execute(cmd, &session).await,
        Commands::Config(cmd) => config::execute(cmd, &session),
        Commands::Buckets => buckets::execute(&session).await,
        Commands::Ls(args) => ls::execute(args, &session).await,
        Commands::Put(args) => put::execute(args, &session).await,
        Commands::Rm(args) => rm::execute(args, &session).await,
        Commands::Mkdir(args) => mkdir::execute(args, &session).await,
        Commands::Share(args) => share::execute(args, &session).await,
        Commands::Browse(args) => browse::execute(args, &session).await,
        Commands::Completions(_) => ExitCode::Success,
    }
}

/// Configuration and output settings shared by all commands
pub(crate) struct Session {
    pub manager: ConfigManager,
    pub config: Config,
    pub formatter: Formatter,
}

impl Session {
    fn open(flags: OutputConfig) -> Result<Self> {
        let manager = ConfigManager::new()?;
        let config = manager.load()?;
        let formatter = Formatter::new(flags.with_defaults(&config));
        Ok(Self {
            manager,
            config,
            formatter,
        })
    }

    /// Credential store over the JSON files in the data directory
    pub fn credential_store(&self) -> CredentialStore {
        let data_dir = self.manager.data_dir(&self.config);
        CredentialStore::new(
            Arc::new(JsonFileStore::primary(&data_dir)),
            Arc::new(JsonFileStore::legacy(&data_dir)),
        )
    }

    /// Browser with credentials loaded, not yet pointed at a bucket
    pub async fn browser(&self) -> Browser<S3Client> {
        let browser = Browser::new(S3Client::new(), self.credential_store())
            .with_download_expiry(self.config.browse.presign_expiry());
        browser.load_credentials().await;
        if let Some(error) = browser.credential_error().await {
            self.formatter
                .warning(&format!("Stored credentials could not be read: {error}"));
        }
        browser
    }

    /// Report `error` and map it to an exit code
    pub fn fail(&self, error: &Error) -> ExitCode {
        self.formatter.failure(error);
        ExitCode::from_error(error)
    }
}

/// A bucket and a path inside it, written as `bucket/path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Location {
    pub bucket: String,
    pub path: String,
}

impl Location {
    /// Folder containing `path` and the last path segment
    ///
    /// `photos/2024/beach.jpg` splits into `photos/2024/` and `beach.jpg`.
    pub fn split(&self) -> (&str, &str) {
        let path = self.path.trim_end_matches('/');
        match path.rfind('/') {
            Some(pos) => (&path[..=pos], &path[pos + 1..]),
            None => ("", path),
        }
    }

    /// Whether the path names a folder rather than an object
    pub fn is_folder(&self) -> bool {
        self.path.is_empty() || self.path.ends_with('/')
    }
}

/// Parse `bucket[/path]`, accepting an optional `s3://` scheme
pub(crate) fn parse_location(input: &str) -> Result<Location> {
    let trimmed = match input.strip_prefix("s3://") {
        Some(rest) => rest,
        None => input.trim_start_matches('/'),
    };

    let (bucket, path) = match trimmed.split_once('/') {
        Some((bucket, path)) => (bucket, path),
        None => (trimmed, ""),
    };

    if bucket.is_empty() {
        return Err(Error::InvalidPath(format!(
            "Expected bucket[/path], got '{input}'"
        )));
    }

    Ok(Location {
        bucket: bucket.to_string(),
        path: path.to_string(),
    })
}
