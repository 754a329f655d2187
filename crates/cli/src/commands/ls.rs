//! ls command - List folders and objects
//!
//! Lists one page of a folder, or every page with `--all`. Without a
//! location the active credential's default bucket (or its first bucket)
//! is listed.

use clap::Args;

use mys3_core::{Browser, ObjectStore, Result};

use super::{Session, parse_location};
use crate::exit_code::ExitCode;
use crate::output::ListingView;

/// List folders and objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Location to list (bucket[/prefix])
    pub location: Option<String>,

    /// Page to show, starting at 1
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Follow continuation tokens and list every page
    #[arg(short, long, conflicts_with = "page")]
    pub all: bool,

    /// Only show entries whose name contains this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, session: &Session) -> ExitCode {
    let browser = session.browser().await;

    match list(&browser, &args).await {
        Ok(view) => {
            session.formatter.output(&view);
            ExitCode::Success
        }
        Err(e) => session.fail(&e),
    }
}

async fn list<S: ObjectStore>(browser: &Browser<S>, args: &LsArgs) -> Result<ListingView> {
    match &args.location {
        Some(location) => {
            let location = parse_location(location)?;
            browser.navigate(&location.bucket, &location.path).await?;
        }
        None => browser.init().await?,
    }

    for _ in 1..args.page {
        browser.page_forward().await?;
    }

    if let Some(query) = &args.filter {
        browser.search(query).await;
    }

    let mut view = ListingView::from_state(&browser.state().await);
    if args.all {
        while browser.state().await.has_next_page() {
            browser.page_forward().await?;
            let page = ListingView::from_state(&browser.state().await);
            view.entries.extend(page.entries);
        }
        view.has_prev_page = false;
        view.has_next_page = false;
    }
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mys3_core::{
        CredentialStore, Error, ListingPage, MemoryStore, MockObjectStore, RawObject,
        credential::Credential,
    };

    async fn browser(mock: MockObjectStore) -> Browser<MockObjectStore> {
        let mut store =
            CredentialStore::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()));
        store
            .save(Credential::new("test", "AKIA", "secret", "us-east-1"))
            .await
            .unwrap();
        Browser::new(mock, store)
    }

    fn paged_mock() -> MockObjectStore {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".into()));
        mock.expect_list_objects()
            .returning(|_, req| {
                let (key, next) = match req.continuation_token.as_deref() {
                    None => ("logs/a.log", Some("t2".to_string())),
                    Some(_) => ("logs/b.log", None),
                };
                Ok(ListingPage::from_raw(
                    &req.prefix,
                    Vec::new(),
                    vec![RawObject::new(key, 1)],
                    next,
                ))
            });
        mock
    }

    fn args(location: &str) -> LsArgs {
        LsArgs {
            location: Some(location.to_string()),
            page: 1,
            all: false,
            filter: None,
        }
    }

    #[tokio::test]
    async fn test_ls_first_page() {
        let browser = browser(paged_mock()).await;
        let view = list(&browser, &args("bucket/logs")).await.unwrap();

        assert_eq!(view.prefix, "logs/");
        assert_eq!(view.entries.len(), 1);
        assert!(view.has_next_page);
    }

    #[tokio::test]
    async fn test_ls_all_pages() {
        let browser = browser(paged_mock()).await;
        let mut ls = args("bucket/logs/");
        ls.all = true;
        let view = list(&browser, &ls).await.unwrap();

        let names: Vec<&str> = view.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.log", "b.log"]);
        assert!(!view.has_next_page);
    }

    #[tokio::test]
    async fn test_ls_second_page() {
        let browser = browser(paged_mock()).await;
        let mut ls = args("bucket/logs/");
        ls.page = 2;
        let view = list(&browser, &ls).await.unwrap();

        assert_eq!(view.entries[0].name, "b.log");
        assert!(view.has_prev_page);
    }

    #[tokio::test]
    async fn test_ls_past_last_page() {
        let browser = browser(paged_mock()).await;
        let mut ls = args("bucket/logs/");
        ls.page = 3;

        assert!(matches!(list(&browser, &ls).await, Err(Error::Validation(_))));
    }
}
