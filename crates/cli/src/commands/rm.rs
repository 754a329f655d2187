//! rm command - Remove objects
//!
//! Removes one or more objects. A location ending in `/` removes the
//! folder marker only; objects inside the folder are left alone.

use clap::Args;
use serde::Serialize;

use mys3_core::{Browser, ObjectStore, Result};

use super::{Session, parse_location};
use crate::exit_code::ExitCode;

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Object location(s) to remove (bucket/key)
    #[arg(required = true)]
    pub locations: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
    total: usize,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, session: &Session) -> ExitCode {
    let formatter = &session.formatter;
    let browser = session.browser().await;

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    let mut exit_code = ExitCode::Success;

    for input in &args.locations {
        match remove(&browser, input).await {
            Ok(()) => deleted.push(input.clone()),
            Err(e) => {
                exit_code = session.fail(&e);
                failed.push(input.clone());
                // A rejected credential fails every remaining location too
                if e.needs_credentials() {
                    break;
                }
            }
        }
    }

    if formatter.is_json() {
        formatter.json(&RmOutput {
            status: if failed.is_empty() { "success" } else { "partial" },
            total: deleted.len(),
            deleted,
            failed,
        });
    } else if !deleted.is_empty() {
        formatter.success(&format!("Removed {} object(s).", deleted.len()));
    }

    exit_code
}

async fn remove<S: ObjectStore>(browser: &Browser<S>, input: &str) -> Result<()> {
    let location = parse_location(input)?;
    let (folder, _) = location.split();
    browser.navigate(&location.bucket, folder).await?;
    browser.delete(&location.path).await
}
