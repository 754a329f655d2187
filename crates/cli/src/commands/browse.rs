//! browse command - Interactive browsing shell
//!
//! Reads one command per line from stdin and applies it to a single
//! [`Browser`], printing the current folder after every change. Telemetry
//! events are written to the debug log.

use std::path::PathBuf;

use clap::Args;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use mys3_core::{Browser, Credential, Error, ObjectStore, Result};

use super::{Session, parse_location};
use crate::exit_code::ExitCode;
use crate::output::{BucketView, CredentialView, Formatter, ListingView, ProgressBar};

const HELP: &str = "\
Commands:
  ls                      show the current folder
  cd <folder>             open a folder; `..` goes up, `/` to the bucket root
  open <bucket[/prefix]>  open a bucket
  buckets                 list buckets
  next, prev              page through the folder
  find [text]             filter by name; no text clears the filter
  refresh                 fetch the current page again
  put <file> [name]       upload a local file into the current folder
  rm <name>               delete an object in the current folder
  mkdir <name>            create a folder in the current folder
  share <name>            print a download URL for an object
  creds                   list credentials
  use <name>              switch credential
  help                    show this help
  quit                    leave the shell";

/// Browse interactively
#[derive(Args, Debug)]
pub struct BrowseArgs {
    /// Location to open first (bucket[/prefix]); defaults to the credential's bucket
    pub location: Option<String>,
}

/// One parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    List,
    Cd(String),
    Open(String),
    Buckets,
    Next,
    Prev,
    Find(String),
    Refresh,
    Put { file: PathBuf, name: Option<String> },
    Rm(String),
    Mkdir(String),
    Share(String),
    Creds,
    Use(String),
    Help,
    Quit,
}

fn parse_command(line: &str) -> std::result::Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let required = |what: &str| {
        if rest.is_empty() {
            Err(format!("{word}: missing {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word {
        "ls" => ShellCommand::List,
        "cd" => ShellCommand::Cd(required("folder")?),
        "open" => ShellCommand::Open(required("bucket")?),
        "buckets" => ShellCommand::Buckets,
        "next" => ShellCommand::Next,
        "prev" => ShellCommand::Prev,
        "find" | "search" => ShellCommand::Find(rest.to_string()),
        "refresh" => ShellCommand::Refresh,
        "put" => {
            let args = required("file")?;
            let mut parts = args.splitn(2, char::is_whitespace);
            let file = PathBuf::from(parts.next().unwrap_or_default());
            let name = parts.next().map(|n| n.trim().to_string());
            ShellCommand::Put { file, name }
        }
        "rm" => ShellCommand::Rm(required("name")?),
        "mkdir" => ShellCommand::Mkdir(required("name")?),
        "share" => ShellCommand::Share(required("name")?),
        "creds" => ShellCommand::Creds,
        "use" => ShellCommand::Use(required("credential name")?),
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("Unknown command '{other}'; type `help`")),
    };
    Ok(Some(command))
}

/// Prefix reached by `cd target` from `current`
fn resolve_folder(current: &str, target: &str) -> String {
    match target {
        "/" => String::new(),
        ".." => {
            let trimmed = current.trim_end_matches('/');
            match trimmed.rfind('/') {
                Some(pos) => trimmed[..=pos].to_string(),
                None => String::new(),
            }
        }
        _ if target.starts_with('/') => target.trim_start_matches('/').to_string(),
        _ => format!("{current}{target}"),
    }
}

/// Execute the browse command
pub async fn execute(args: BrowseArgs, session: &Session) -> ExitCode {
    let formatter = &session.formatter;

    let (events, mut receiver) = mpsc::unbounded_channel();
    let telemetry = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            tracing::debug!(?event, "browser event");
        }
    });

    let browser = session.browser().await.with_events(events);
    let opened = match &args.location {
        Some(location) => match parse_location(location) {
            Ok(location) => browser.navigate(&location.bucket, &location.path).await,
            Err(e) => Err(e),
        },
        None => browser.init().await,
    };
    match opened {
        Ok(()) => show_listing(&browser, formatter).await,
        Err(e) => {
            formatter.failure(&e);
            if e.needs_credentials() {
                formatter.println("Add one with `mys3 credential set`, or `use <name>` here.");
            }
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        if !formatter.is_json() {
            let prompt = prompt(&browser).await;
            // The prompt is cosmetic; a closed stdout ends the loop on the next read
            let _ = stdout.write_all(prompt.as_bytes()).await;
            let _ = stdout.flush().await;
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                formatter.error(&format!("Failed to read input: {e}"));
                break;
            }
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                formatter.error(&message);
                continue;
            }
        };

        if command == ShellCommand::Quit {
            break;
        }
        if let Err(e) = run(&browser, command, session).await {
            formatter.failure(&e);
        }
    }

    drop(browser);
    let _ = telemetry.await;
    ExitCode::Success
}

async fn prompt<S: ObjectStore>(browser: &Browser<S>) -> String {
    let state = browser.state().await;
    match state.current_bucket() {
        Some(bucket) => format!("{bucket}/{}> ", state.current_prefix()),
        None => "mys3> ".to_string(),
    }
}

async fn show_listing<S: ObjectStore>(browser: &Browser<S>, formatter: &Formatter) {
    formatter.output(&ListingView::from_state(&browser.state().await));
}

async fn run<S: ObjectStore>(
    browser: &Browser<S>,
    command: ShellCommand,
    session: &Session,
) -> Result<()> {
    let formatter = &session.formatter;

    match command {
        ShellCommand::List => {}
        ShellCommand::Cd(target) => {
            let current = browser.state().await.current_prefix().to_string();
            browser.open_folder(&resolve_folder(&current, &target)).await?;
        }
        ShellCommand::Open(location) => {
            let location = parse_location(&location)?;
            browser.navigate(&location.bucket, &location.path).await?;
        }
        ShellCommand::Buckets => {
            let buckets = browser.list_buckets().await?;
            formatter.output(&BucketView { buckets });
            return Ok(());
        }
        ShellCommand::Next => browser.page_forward().await?,
        ShellCommand::Prev => browser.page_back().await?,
        ShellCommand::Find(query) => browser.search(&query).await,
        ShellCommand::Refresh => browser.refresh().await?,
        ShellCommand::Put { file, name } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(String::from)
                    .ok_or_else(|| Error::InvalidPath(format!("{}", file.display())))?,
            };
            let data = tokio::fs::read(&file).await?;
            let content_type = mime_guess::from_path(&file)
                .first_or_octet_stream()
                .to_string();
            let key = browser.key_in_current_folder(&name).await;

            let progress = ProgressBar::percent(formatter.config(), &name);
            let result = browser
                .upload(data, &key, Some(content_type), Some(progress.callback()))
                .await;
            progress.finish_and_clear();
            result?;
            formatter.success(&format!("Uploaded {key}"));
        }
        ShellCommand::Rm(name) => {
            let key = browser.key_in_current_folder(&name).await;
            browser.delete(&key).await?;
            formatter.success(&format!("Deleted {key}"));
        }
        ShellCommand::Mkdir(name) => browser.create_folder(&name).await?,
        ShellCommand::Share(name) => {
            let key = browser.key_in_current_folder(&name).await;
            let url = browser.download(&key).await?;
            formatter.println(&url);
            return Ok(());
        }
        ShellCommand::Creds => {
            let snapshot = browser.credential_snapshot().await;
            formatter.output(&CredentialView::new(
                &snapshot.credentials,
                snapshot.active_name.as_deref(),
            ));
            return Ok(());
        }
        ShellCommand::Use(name) => {
            browser.select_credential(&name).await?;
            let snapshot = browser.credential_snapshot().await;
            if let Some(Credential { name, region, .. }) = snapshot.active() {
                formatter.success(&format!("Using credential '{name}' ({region})"));
            }
        }
        ShellCommand::Help => {
            formatter.println(HELP);
            return Ok(());
        }
        ShellCommand::Quit => return Ok(()),
    }

    show_listing(browser, formatter).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("ls"), Ok(Some(ShellCommand::List)));
        assert_eq!(parse_command("  next "), Ok(Some(ShellCommand::Next)));
        assert_eq!(parse_command("q"), Ok(Some(ShellCommand::Quit)));
        assert_eq!(parse_command(""), Ok(None));
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            parse_command("cd my folder"),
            Ok(Some(ShellCommand::Cd("my folder".into())))
        );
        assert_eq!(
            parse_command("put ./a.txt b.txt"),
            Ok(Some(ShellCommand::Put {
                file: PathBuf::from("./a.txt"),
                name: Some("b.txt".into()),
            }))
        );
        assert_eq!(
            parse_command("find"),
            Ok(Some(ShellCommand::Find(String::new())))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("cd").unwrap_err().contains("missing folder"));
        assert!(parse_command("frobnicate").unwrap_err().contains("Unknown command"));
    }

    #[test]
    fn test_resolve_folder() {
        assert_eq!(resolve_folder("a/b/", ".."), "a/");
        assert_eq!(resolve_folder("a/", ".."), "");
        assert_eq!(resolve_folder("", ".."), "");
        assert_eq!(resolve_folder("a/", "c"), "a/c");
        assert_eq!(resolve_folder("a/b/", "/"), "");
        assert_eq!(resolve_folder("a/", "/x/y"), "x/y");
    }
}
