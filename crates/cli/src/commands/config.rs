//! Configuration commands
//!
//! Shows the effective configuration and changes single values in the
//! configuration file.

use std::fmt;

use clap::Subcommand;
use serde::Serialize;

use mys3_core::{Config, Error};

use super::Session;
use crate::exit_code::ExitCode;

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Change one value (e.g., `mys3 config set browse.presign_expiry_secs 900`)
    Set(SetArgs),
}

/// Arguments for the `config set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Dotted key, e.g. "defaults.output"
    pub key: String,

    /// New value; an empty value clears `storage.data_dir`
    pub value: String,
}

/// Effective configuration with resolved paths
#[derive(Debug, Serialize)]
struct ConfigView {
    config_file: String,
    data_dir: String,
    #[serde(flatten)]
    config: Config,
}

impl fmt::Display for ConfigView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        writeln!(f, "config file                 {}", self.config_file)?;
        writeln!(f, "data dir                    {}", self.data_dir)?;
        writeln!(f, "defaults.output             {}", c.defaults.output)?;
        writeln!(f, "defaults.color              {}", c.defaults.color)?;
        writeln!(f, "defaults.progress           {}", c.defaults.progress)?;
        write!(
            f,
            "browse.presign_expiry_secs  {}",
            c.browse.presign_expiry_secs
        )
    }
}

#[derive(Serialize)]
struct SetOutput {
    success: bool,
    key: String,
    value: String,
}

/// Execute a config subcommand
pub fn execute(cmd: ConfigCommands, session: &Session) -> ExitCode {
    let result = match cmd {
        ConfigCommands::Show => {
            session.formatter.output(&view(session, session.config.clone()));
            Ok(())
        }
        ConfigCommands::Set(args) => execute_set(args, session),
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => session.fail(&e),
    }
}

fn view(session: &Session, config: Config) -> ConfigView {
    ConfigView {
        config_file: session.manager.config_path().display().to_string(),
        data_dir: session.manager.data_dir(&config).display().to_string(),
        config,
    }
}

fn execute_set(args: SetArgs, session: &Session) -> Result<(), Error> {
    let mut config = session.config.clone();
    config.set(&args.key, &args.value)?;
    session.manager.save(&config)?;
    tracing::debug!(key = %args.key, "Configuration updated");

    let formatter = &session.formatter;
    if formatter.is_json() {
        formatter.json(&SetOutput {
            success: true,
            key: args.key,
            value: args.value,
        });
    } else {
        formatter.success(&format!("Set {} = {}", args.key, args.value));
    }
    Ok(())
}
