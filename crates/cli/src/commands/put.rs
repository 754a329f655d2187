//! put command - Upload a local file
//!
//! Uploads a file into a bucket folder. When the destination is a folder
//! the file keeps its local name.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use mys3_core::{Browser, Error, ObjectStore, Result};

use super::{Location, Session, parse_location};
use crate::exit_code::ExitCode;
use crate::output::ProgressBar;

/// Upload a local file
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub file: PathBuf,

    /// Destination (bucket[/prefix/][key])
    pub destination: String,

    /// Content type; guessed from the file extension when omitted
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    bucket: String,
    key: String,
    size_bytes: u64,
    size_human: String,
    content_type: String,
}

/// Execute the put command
pub async fn execute(args: PutArgs, session: &Session) -> ExitCode {
    let formatter = &session.formatter;

    let destination = match parse_location(&args.destination) {
        Ok(location) => location,
        Err(e) => return session.fail(&e),
    };
    let Some(key) = object_key(&destination, &args.file) else {
        return session.fail(&Error::InvalidPath(format!(
            "Cannot derive an object name from '{}'",
            args.file.display()
        )));
    };

    let data = match tokio::fs::read(&args.file).await {
        Ok(data) => data,
        Err(e) => {
            formatter.error(&format!("Failed to read {}: {e}", args.file.display()));
            return ExitCode::UsageError;
        }
    };

    let content_type = args.content_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&args.file)
            .first_or_octet_stream()
            .to_string()
    });
    let size = data.len() as u64;

    let browser = session.browser().await;
    let progress = ProgressBar::percent(formatter.config(), &key);
    let result = upload(&browser, &destination, &key, data, &content_type, &progress).await;
    progress.finish_and_clear();

    match result {
        Ok(()) => {
            let size_human = humansize::format_size(size, humansize::BINARY);
            if formatter.is_json() {
                formatter.json(&PutOutput {
                    status: "success",
                    bucket: destination.bucket,
                    key,
                    size_bytes: size,
                    size_human,
                    content_type,
                });
            } else {
                formatter.success(&format!(
                    "Uploaded {}/{key} ({size_human})",
                    destination.bucket
                ));
            }
            ExitCode::Success
        }
        Err(e) => session.fail(&e),
    }
}

async fn upload<S: ObjectStore>(
    browser: &Browser<S>,
    destination: &Location,
    key: &str,
    data: Vec<u8>,
    content_type: &str,
    progress: &ProgressBar,
) -> Result<()> {
    let (folder, _) = split_key(key);
    browser.navigate(&destination.bucket, folder).await?;
    browser
        .upload(
            data,
            key,
            Some(content_type.to_string()),
            Some(progress.callback()),
        )
        .await
}

/// Object key for uploading `file` to `destination`
fn object_key(destination: &Location, file: &Path) -> Option<String> {
    if destination.is_folder() {
        let name = file.file_name()?.to_str()?;
        Some(format!("{}{name}", destination.path))
    } else {
        Some(destination.path.clone())
    }
}

/// Folder part of a key, including the trailing delimiter
fn split_key(key: &str) -> (&str, &str) {
    match key.rfind('/') {
        Some(pos) => (&key[..=pos], &key[pos + 1..]),
        None => ("", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(input: &str) -> Location {
        parse_location(input).unwrap()
    }

    #[test]
    fn test_object_key_into_folder() {
        let key = object_key(&location("bucket/docs/"), Path::new("/tmp/report.pdf"));
        assert_eq!(key.as_deref(), Some("docs/report.pdf"));

        let key = object_key(&location("bucket"), Path::new("notes.txt"));
        assert_eq!(key.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_object_key_explicit() {
        let key = object_key(&location("bucket/docs/final.pdf"), Path::new("draft.pdf"));
        assert_eq!(key.as_deref(), Some("docs/final.pdf"));
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("a/b/c.txt"), ("a/b/", "c.txt"));
        assert_eq!(split_key("c.txt"), ("", "c.txt"));
    }

    #[test]
    fn test_guessed_content_type() {
        let guessed = mime_guess::from_path("photo.png").first_or_octet_stream();
        assert_eq!(guessed.essence_str(), "image/png");
        let unknown = mime_guess::from_path("blob.unknownext").first_or_octet_stream();
        assert_eq!(unknown.essence_str(), "application/octet-stream");
    }
}
