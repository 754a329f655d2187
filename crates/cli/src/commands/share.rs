//! share command - Generate a presigned download URL
//!
//! The URL grants read access to a single object without credentials until
//! it expires.

use std::time::Duration;

use clap::Args;
use serde::Serialize;

use mys3_core::Error;

use super::{Session, parse_location};
use crate::exit_code::ExitCode;

/// Generate a presigned download URL
#[derive(Args, Debug)]
pub struct ShareArgs {
    /// Object to share (bucket/key)
    pub location: String,

    /// Lifetime of the URL in seconds; defaults to browse.presign_expiry_secs
    #[arg(long)]
    pub expires: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ShareOutput {
    url: String,
    expires_in_secs: u64,
    expires_at: String,
}

/// Execute the share command
pub async fn execute(args: ShareArgs, session: &Session) -> ExitCode {
    let location = match parse_location(&args.location) {
        Ok(location) if !location.is_folder() => location,
        Ok(_) => {
            return session.fail(&Error::InvalidPath(format!(
                "'{}' does not name an object",
                args.location
            )));
        }
        Err(e) => return session.fail(&e),
    };

    let expiry = args
        .expires
        .map(Duration::from_secs)
        .unwrap_or_else(|| session.config.browse.presign_expiry());

    let browser = session.browser().await.with_download_expiry(expiry);
    let (folder, _) = location.split();
    let result = match browser.navigate(&location.bucket, folder).await {
        Ok(()) => browser.download(&location.path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(url) => {
            if session.formatter.is_json() {
                let expires_at = jiff::Timestamp::now()
                    .checked_add(jiff::SignedDuration::from_secs(expiry.as_secs() as i64))
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                session.formatter.json(&ShareOutput {
                    url,
                    expires_in_secs: expiry.as_secs(),
                    expires_at,
                });
            } else {
                session.formatter.println(&url);
            }
            ExitCode::Success
        }
        Err(e) => session.fail(&e),
    }
}
