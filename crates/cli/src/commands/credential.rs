//! Credential management commands
//!
//! Credentials are named access-key profiles stored in the data directory.
//! One of them is active; every other command signs with it.

use clap::Subcommand;
use serde::Serialize;

use mys3_core::credential::DEFAULT_REGION;
use mys3_core::{Credential, CredentialStore, Error};

use super::Session;
use crate::exit_code::ExitCode;
use crate::output::CredentialView;

/// Credential subcommands
#[derive(Subcommand, Debug)]
pub enum CredentialCommands {
    /// Add or update a credential
    Set(SetArgs),

    /// List stored credentials
    List,

    /// Remove a credential
    Remove(NameArgs),

    /// Make a credential active
    Use(NameArgs),
}

/// Arguments for the `credential set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Credential name (e.g., "prod", "minio")
    pub name: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Region used for signing
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Bucket opened when browsing starts
    #[arg(long)]
    pub bucket: Option<String>,

    /// Endpoint URL of an S3-compatible service (e.g., "http://localhost:9000")
    #[arg(long)]
    pub endpoint: Option<String>,
}

/// A credential name argument
#[derive(clap::Args, Debug)]
pub struct NameArgs {
    /// Credential name
    pub name: String,
}

/// JSON output for set/remove/use operations
#[derive(Serialize)]
struct CredentialOperationOutput {
    success: bool,
    credential: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    active: Option<String>,
}

/// Execute a credential subcommand
pub async fn execute(cmd: CredentialCommands, session: &Session) -> ExitCode {
    let mut store = session.credential_store();
    store.load().await;
    if let Some(error) = store.error() {
        session
            .formatter
            .warning(&format!("Stored credentials could not be read: {error}"));
    }

    let result = match cmd {
        CredentialCommands::Set(args) => execute_set(args, &mut store, session).await,
        CredentialCommands::List => {
            let view = CredentialView::new(store.credentials(), store.active_name());
            session.formatter.output(&view);
            Ok(())
        }
        CredentialCommands::Remove(args) => execute_remove(args, &mut store, session).await,
        CredentialCommands::Use(args) => execute_use(args, &mut store, session).await,
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => session.fail(&e),
    }
}

async fn execute_set(
    args: SetArgs,
    store: &mut CredentialStore,
    session: &Session,
) -> Result<(), Error> {
    let mut credential = Credential::new(
        &args.name,
        args.access_key,
        args.secret_key,
        args.region,
    );
    if let Some(bucket) = args.bucket {
        credential = credential.with_bucket(bucket);
    }
    if let Some(endpoint) = args.endpoint {
        credential = credential.with_endpoint(endpoint);
    }

    store.save(credential).await?;
    report(session, store, &args.name, "saved");
    Ok(())
}

async fn execute_remove(
    args: NameArgs,
    store: &mut CredentialStore,
    session: &Session,
) -> Result<(), Error> {
    if store.get_by_name(&args.name).is_none() {
        return Err(Error::NotFound(format!("Credential \"{}\"", args.name)));
    }

    store.delete(&args.name).await?;
    report(session, store, &args.name, "removed");
    Ok(())
}

async fn execute_use(
    args: NameArgs,
    store: &mut CredentialStore,
    session: &Session,
) -> Result<(), Error> {
    store.set_active(&args.name).await?;
    report(session, store, &args.name, "is now active");
    Ok(())
}

fn report(session: &Session, store: &CredentialStore, name: &str, what: &str) {
    let formatter = &session.formatter;
    if formatter.is_json() {
        formatter.json(&CredentialOperationOutput {
            success: true,
            credential: name.to_string(),
            active: store.active_name().map(String::from),
        });
        return;
    }

    formatter.success(&format!("Credential '{name}' {what}."));
    match store.active_name() {
        Some(active) if active != name => {
            formatter.println(&formatter.dim(&format!("Active credential: {active}")))
        }
        None => formatter.println(&formatter.dim("No active credential.")),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::commands::{Cli, Commands};

    #[test]
    fn test_set_args_defaults() {
        let cli = Cli::try_parse_from(["mys3", "credential", "set", "prod", "AKIA", "secret"])
            .unwrap();
        let Commands::Credential(CredentialCommands::Set(args)) = cli.command else {
            panic!("expected credential set");
        };
        assert_eq!(args.region, "us-east-1");
        assert!(args.bucket.is_none());
        assert!(args.endpoint.is_none());
    }

    #[test]
    fn test_set_args_with_options() {
        let cli = Cli::try_parse_from([
            "mys3",
            "credential",
            "set",
            "minio",
            "AKIA",
            "secret",
            "--region",
            "eu-west-1",
            "--bucket",
            "assets",
            "--endpoint",
            "http://localhost:9000",
        ])
        .unwrap();
        let Commands::Credential(CredentialCommands::Set(args)) = cli.command else {
            panic!("expected credential set");
        };
        assert_eq!(args.region, "eu-west-1");
        assert_eq!(args.bucket.as_deref(), Some("assets"));
        assert_eq!(args.endpoint.as_deref(), Some("http://localhost:9000"));
    }
}
