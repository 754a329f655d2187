//! mkdir command - Create a folder
//!
//! Folders are zero-byte objects whose key ends with `/`.

use clap::Args;
use serde::Serialize;

use super::{Session, parse_location};
use crate::exit_code::ExitCode;

/// Create a folder
#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Folder to create (bucket/path/name)
    pub location: String,
}

#[derive(Debug, Serialize)]
struct MkdirOutput {
    status: &'static str,
    bucket: String,
    prefix: String,
}

/// Execute the mkdir command
pub async fn execute(args: MkdirArgs, session: &Session) -> ExitCode {
    let location = match parse_location(&args.location) {
        Ok(location) => location,
        Err(e) => return session.fail(&e),
    };
    let (parent, name) = location.split();

    let browser = session.browser().await;
    let result = match browser.navigate(&location.bucket, parent).await {
        Ok(()) => browser.create_folder(name).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            let prefix = format!("{parent}{name}/");
            if session.formatter.is_json() {
                session.formatter.json(&MkdirOutput {
                    status: "success",
                    bucket: location.bucket,
                    prefix,
                });
            } else {
                session
                    .formatter
                    .success(&format!("Created folder {}/{prefix}", location.bucket));
            }
            ExitCode::Success
        }
        Err(e) => session.fail(&e),
    }
}
