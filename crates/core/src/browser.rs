//! Browsing orchestrator
//!
//! [`Browser`] ties the credential store, an [`ObjectStore`] and the browse
//! state together. Every user action resolves the active credential and the
//! bucket's region, calls the object store, and folds the result into the
//! browse state.
//!
//! Listing calls may overlap. Each one takes a generation number and its
//! result is applied only if no newer listing was started in the meantime,
//! so the last navigation wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::browse::BrowseState;
use crate::credential::Credential;
use crate::credential_store::{CredentialSnapshot, CredentialStore};
use crate::error::{Error, Result};
use crate::traits::{
    Bucket, DEFAULT_DOWNLOAD_EXPIRY, DELIMITER, ListRequest, ObjectLocation, ObjectStore,
    ProgressFn, folder_marker_key,
};

/// Telemetry emitted on the side channel
///
/// Events carry no bucket names, keys or credential data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    Navigated { depth: usize },
    PageChanged { forward: bool },
    Searched,
    Uploaded { size: u64 },
    Deleted,
    FolderCreated,
    DownloadLinkCreated,
    CredentialSwitched,
    Failed { kind: &'static str },
}

/// How a successfully fetched page changes the back stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageMove {
    Reload,
    Forward,
    Back,
}

/// Coordinates credentials, object-store calls and browse state
pub struct Browser<S: ObjectStore> {
    store: S,
    credentials: Mutex<CredentialStore>,
    state: Mutex<BrowseState>,
    regions: Mutex<HashMap<String, String>>,
    generation: AtomicU64,
    events: Option<mpsc::UnboundedSender<BrowserEvent>>,
    download_expiry: Duration,
}

impl<S: ObjectStore> Browser<S> {
    pub fn new(store: S, credentials: CredentialStore) -> Self {
        Self {
            store,
            credentials: Mutex::new(credentials),
            state: Mutex::new(BrowseState::new()),
            regions: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            events: None,
            download_expiry: DEFAULT_DOWNLOAD_EXPIRY,
        }
    }

    /// Send telemetry events to `sender`; a closed channel is ignored
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<BrowserEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Lifetime of URLs returned by [`Browser::download`]
    pub fn with_download_expiry(mut self, expiry: Duration) -> Self {
        self.download_expiry = expiry;
        self
    }

    /// Snapshot of the browse state for rendering
    pub async fn state(&self) -> BrowseState {
        self.state.lock().await.clone()
    }

    /// Snapshot of the stored credentials and active pointer
    pub async fn credential_snapshot(&self) -> CredentialSnapshot {
        let store = self.credentials.lock().await;
        CredentialSnapshot {
            credentials: store.credentials().to_vec(),
            active_name: store.active_name().map(String::from),
        }
    }

    /// Error recorded by the credential store, if any
    pub async fn credential_error(&self) -> Option<String> {
        self.credentials.lock().await.error().map(String::from)
    }

    /// Load credentials and open the initial bucket
    ///
    /// The active credential's default bucket is opened if it has one;
    /// otherwise the first listed bucket is. An authentication failure is
    /// returned so the caller can ask for new credentials.
    pub async fn init(&self) -> Result<()> {
        self.load_credentials().await;
        self.start_session().await
    }

    /// Load credentials from storage without touching the object store
    pub async fn load_credentials(&self) {
        let mut credentials = self.credentials.lock().await;
        credentials.load().await;
        if let Some(error) = credentials.error() {
            warn!("Credentials loaded with error: {error}");
        }
    }

    async fn start_session(&self) -> Result<()> {
        let credential = self.active_credential().await?;

        if let Some(bucket) = credential.default_bucket() {
            debug!("Opening default bucket of '{}'", credential.name);
            return self.navigate(bucket, "").await;
        }

        let buckets = self.list_buckets().await?;
        match buckets.first() {
            Some(first) => {
                let name = first.name.clone();
                self.navigate(&name, "").await
            }
            None => {
                info!("Credential '{}' sees no buckets", credential.name);
                Ok(())
            }
        }
    }

    /// Forget everything tied to the previous credential
    async fn reset_session(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.regions.lock().await.clear();
        *self.state.lock().await = BrowseState::new();
    }

    /// List buckets for the active credential and remember their regions
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let credential = self.active_credential().await?;

        match self.store.list_buckets(&credential).await {
            Ok(buckets) => {
                {
                    let mut regions = self.regions.lock().await;
                    for bucket in &buckets {
                        if let Some(region) = &bucket.region {
                            regions.insert(bucket.name.clone(), region.clone());
                        }
                    }
                }
                self.state.lock().await.set_buckets(buckets.clone());
                Ok(buckets)
            }
            Err(e) => {
                if e.needs_credentials() {
                    warn!("Bucket listing rejected; credentials need to be re-entered");
                }
                Err(self.fail(e).await)
            }
        }
    }

    /// Open `prefix` in `bucket` at its first page
    pub async fn navigate(&self, bucket: &str, prefix: &str) -> Result<()> {
        if bucket.is_empty() {
            return Err(self.fail(Error::InvalidPath("Bucket name cannot be empty".into())).await);
        }
        let prefix = normalize_prefix(prefix);

        {
            let mut state = self.state.lock().await;
            if state.current_bucket() != Some(bucket) {
                state.set_current_bucket(Some(bucket.to_string()));
            }
            state.set_current_prefix(prefix.clone());
        }

        let depth = prefix.split(DELIMITER).filter(|s| !s.is_empty()).count();
        self.emit(BrowserEvent::Navigated { depth });
        self.load_page(None, PageMove::Reload).await
    }

    /// Open a folder of the current bucket by its full prefix
    pub async fn open_folder(&self, prefix: &str) -> Result<()> {
        let bucket = self.current_bucket().await?;
        self.navigate(&bucket, prefix).await
    }

    /// Fetch the page after the current one
    pub async fn page_forward(&self) -> Result<()> {
        let token = self
            .state
            .lock()
            .await
            .next_token()
            .map(String::from)
            .ok_or_else(|| Error::Validation("Already on the last page".into()))?;

        self.emit(BrowserEvent::PageChanged { forward: true });
        self.load_page(Some(token), PageMove::Forward).await
    }

    /// Fetch the page before the current one
    pub async fn page_back(&self) -> Result<()> {
        let token = self
            .state
            .lock()
            .await
            .prev_tokens()
            .last()
            .cloned()
            .ok_or_else(|| Error::Validation("Already on the first page".into()))?;

        self.emit(BrowserEvent::PageChanged { forward: false });
        // An empty token stands for the first page
        let token = Some(token).filter(|t| !t.is_empty());
        self.load_page(token, PageMove::Back).await
    }

    /// Re-fetch the current page
    pub async fn refresh(&self) -> Result<()> {
        let token = self.state.lock().await.page_token().map(String::from);
        self.load_page(token, PageMove::Reload).await
    }

    /// Filter the current page by display name
    pub async fn search(&self, query: &str) {
        self.state.lock().await.set_search_query(query);
        self.emit(BrowserEvent::Searched);
    }

    async fn load_page(&self, token: Option<String>, movement: PageMove) -> Result<()> {
        let credential = self.active_credential().await?;

        let (bucket, prefix) = {
            let mut state = self.state.lock().await;
            let Some(bucket) = state.current_bucket().map(String::from) else {
                return Err(Error::Validation("No bucket selected".into()));
            };
            state.set_loading(true);
            state.set_error(None);
            (bucket, state.current_prefix().to_string())
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let region = self.resolve_region(&credential, &bucket).await;

        debug!(
            "Listing {bucket}/{prefix} (token: {}, generation {generation})",
            token.as_deref().unwrap_or("-")
        );
        let request = ListRequest {
            bucket,
            prefix,
            continuation_token: token.clone(),
            region,
        };
        let result = self.store.list_objects(&credential, request).await;

        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding listing from superseded generation {generation}");
            return Ok(());
        }
        state.set_loading(false);

        match result {
            Ok(page) => {
                match movement {
                    PageMove::Forward => {
                        let leaving = state.page_token().map(String::from);
                        state.push_prev_token(leaving);
                    }
                    PageMove::Back => {
                        state.pop_prev_token();
                    }
                    PageMove::Reload => {}
                }
                state.set_page_token(token);
                state.set_list_result(page.folders, page.objects, page.next_token);
                Ok(())
            }
            Err(e) => {
                state.clear_results();
                state.set_error(Some(e.to_string()));
                drop(state);
                self.emit(BrowserEvent::Failed { kind: e.kind() });
                Err(e)
            }
        }
    }

    /// Region of `bucket`, looked up once per credential
    ///
    /// `None` lets the object store sign with the credential's own region.
    async fn resolve_region(&self, credential: &Credential, bucket: &str) -> Option<String> {
        if let Some(region) = self.regions.lock().await.get(bucket) {
            return Some(region.clone());
        }

        match self.store.bucket_region(credential, bucket).await {
            Ok(region) => {
                self.regions
                    .lock()
                    .await
                    .insert(bucket.to_string(), region.clone());
                Some(region)
            }
            Err(e) => {
                warn!(
                    "Could not resolve region of '{bucket}', using {}: {e}",
                    credential.region
                );
                None
            }
        }
    }

    /// Make another stored credential active and start browsing with it
    pub async fn select_credential(&self, name: &str) -> Result<()> {
        self.credentials.lock().await.set_active(name).await?;
        self.emit(BrowserEvent::CredentialSwitched);
        self.reset_session().await;
        self.start_session().await
    }

    /// Add or replace a credential
    ///
    /// Saving the active credential (or the first one ever) restarts the
    /// session so that new keys take effect immediately.
    pub async fn save_credential(&self, credential: Credential) -> Result<()> {
        let name = credential.name.clone();
        let is_active = {
            let mut store = self.credentials.lock().await;
            store.save(credential).await?;
            store.active_name() == Some(name.as_str())
        };

        if is_active {
            self.reset_session().await;
            self.start_session().await?;
        }
        Ok(())
    }

    /// Delete a credential, switching to the next one if it was active
    pub async fn delete_credential(&self, name: &str) -> Result<()> {
        let (was_active, has_active) = {
            let mut store = self.credentials.lock().await;
            let was_active = store.active_name() == Some(name);
            store.delete(name).await?;
            (was_active, store.active_name().is_some())
        };

        if was_active {
            self.reset_session().await;
            if has_active {
                self.emit(BrowserEvent::CredentialSwitched);
                self.start_session().await?;
            }
        }
        Ok(())
    }

    /// Key for `name` inside the current folder
    pub async fn key_in_current_folder(&self, name: &str) -> String {
        let state = self.state.lock().await;
        format!("{}{}", state.current_prefix(), name.trim_start_matches(DELIMITER))
    }

    /// Upload bytes to `key` in the current bucket, then refresh the listing
    pub async fn upload(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: Option<String>,
        progress: Option<ProgressFn>,
    ) -> Result<()> {
        let (credential, location) = self.locate(key).await?;
        let size = data.len() as u64;

        if let Err(e) = self
            .store
            .upload(&credential, location, data, content_type, progress)
            .await
        {
            return Err(self.fail(e).await);
        }

        info!("Uploaded {key} ({size} bytes)");
        self.emit(BrowserEvent::Uploaded { size });
        self.refresh_after_change().await;
        Ok(())
    }

    /// Delete a single object from the current bucket
    pub async fn delete(&self, key: &str) -> Result<()> {
        let (credential, location) = self.locate(key).await?;

        if let Err(e) = self.store.delete_object(&credential, location).await {
            return Err(self.fail(e).await);
        }

        info!("Deleted {key}");
        {
            let mut state = self.state.lock().await;
            state.remove_object(key);
            state.remove_folder(key);
        }
        self.emit(BrowserEvent::Deleted);
        Ok(())
    }

    /// Create a folder named `name` inside the current folder
    pub async fn create_folder(&self, name: &str) -> Result<()> {
        let name = name.trim_matches('/');
        if name.is_empty() {
            return Err(self.fail(Error::Validation("Folder name cannot be empty".into())).await);
        }
        let key = folder_marker_key(&self.key_in_current_folder(name).await);
        let (credential, location) = self.locate(&key).await?;

        if let Err(e) = self.store.create_folder(&credential, location).await {
            return Err(self.fail(e).await);
        }

        info!("Created folder {key}");
        self.emit(BrowserEvent::FolderCreated);
        self.refresh_after_change().await;
        Ok(())
    }

    /// Presigned download URL for `key` in the current bucket
    pub async fn download(&self, key: &str) -> Result<String> {
        let (credential, location) = self.locate(key).await?;

        match self
            .store
            .download_url(&credential, location, self.download_expiry)
            .await
        {
            Ok(url) => {
                self.emit(BrowserEvent::DownloadLinkCreated);
                Ok(url)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Active credential and the location of `key` in the current bucket
    async fn locate(&self, key: &str) -> Result<(Credential, ObjectLocation)> {
        if key.is_empty() {
            return Err(self.fail(Error::InvalidPath("Object key cannot be empty".into())).await);
        }
        let credential = self.active_credential().await?;
        let bucket = self.current_bucket().await?;
        let region = self.resolve_region(&credential, &bucket).await;
        Ok((credential, ObjectLocation::new(bucket, key, region)))
    }

    async fn refresh_after_change(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Listing refresh failed: {e}");
        }
    }

    async fn current_bucket(&self) -> Result<String> {
        let bucket = self.state.lock().await.current_bucket().map(String::from);
        match bucket {
            Some(bucket) => Ok(bucket),
            None => Err(self.fail(Error::Validation("No bucket selected".into())).await),
        }
    }

    async fn active_credential(&self) -> Result<Credential> {
        let credential = self.credentials.lock().await.active_credential().cloned();
        match credential {
            Some(credential) => Ok(credential),
            None => Err(self
                .fail(Error::Auth("No active credential; add one to start browsing".into()))
                .await),
        }
    }

    /// Record an error on the browse state and report it
    async fn fail(&self, error: Error) -> Error {
        self.state.lock().await.set_error(Some(error.to_string()));
        self.emit(BrowserEvent::Failed { kind: error.kind() });
        error
    }

    fn emit(&self, event: BrowserEvent) {
        if let Some(sender) = &self.events {
            // Telemetry must never interrupt browsing
            let _ = sender.send(event);
        }
    }
}

/// Navigation prefix: no leading delimiter, trailing delimiter when non-empty
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches(DELIMITER);
    if trimmed.is_empty() || trimmed.ends_with(DELIMITER) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{DELIMITER}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::storage::MemoryStore;
    use crate::traits::{ListingPage, MockObjectStore, RawObject};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn credential(name: &str, bucket: Option<&str>) -> Credential {
        let cred = Credential::new(name, format!("AKIA-{name}"), "secret", "us-east-1");
        match bucket {
            Some(b) => cred.with_bucket(b),
            None => cred,
        }
    }

    async fn credential_store(credentials: Vec<Credential>) -> CredentialStore {
        let mut store = CredentialStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        );
        for c in credentials {
            store.save(c).await.unwrap();
        }
        store
    }

    fn page(prefix: &str, keys: &[&str], next: Option<&str>) -> ListingPage {
        ListingPage::from_raw(
            prefix,
            Vec::new(),
            keys.iter().map(|k| RawObject::new(*k, 1)).collect::<Vec<_>>(),
            next.map(String::from),
        )
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("foo"), "foo/");
        assert_eq!(normalize_prefix("/foo/bar/"), "foo/bar/");
    }

    #[tokio::test]
    async fn test_init_without_credentials() {
        let browser = Browser::new(MockObjectStore::new(), credential_store(vec![]).await);

        let err = browser.init().await.unwrap_err();
        assert!(err.needs_credentials());

        let state = browser.state().await;
        assert!(state.current_bucket().is_none());
        assert!(state.error().is_some());
    }

    #[tokio::test]
    async fn test_init_opens_default_bucket() {
        let mut mock = MockObjectStore::new();
        mock.expect_list_buckets().never();
        mock.expect_bucket_region()
            .withf(|_, bucket| bucket.to_string() == "data")
            .times(1)
            .returning(|_, _| Ok("eu-west-1".to_string()));
        mock.expect_list_objects()
            .withf(|_, req| {
                req.bucket == "data"
                    && req.prefix.is_empty()
                    && req.continuation_token.is_none()
                    && req.region.as_deref() == Some("eu-west-1")
            })
            .times(1)
            .returning(|_, _| Ok(page("", &["a.txt"], None)));

        let browser = Browser::new(
            mock,
            credential_store(vec![credential("prod", Some("data"))]).await,
        );
        browser.init().await.unwrap();

        let state = browser.state().await;
        assert_eq!(state.current_bucket(), Some("data"));
        assert_eq!(state.objects().len(), 1);
    }

    #[tokio::test]
    async fn test_init_selects_first_listed_bucket() {
        let mut mock = MockObjectStore::new();
        mock.expect_list_buckets().times(1).returning(|_| {
            Ok(vec![
                Bucket::new("first").with_region("ap-south-1"),
                Bucket::new("second").with_region("us-east-1"),
            ])
        });
        // Region is already known from the bucket listing
        mock.expect_bucket_region().never();
        mock.expect_list_objects()
            .withf(|_, req| req.bucket == "first" && req.region.as_deref() == Some("ap-south-1"))
            .times(1)
            .returning(|_, _| Ok(ListingPage::default()));

        let browser = Browser::new(mock, credential_store(vec![credential("dev", None)]).await);
        browser.init().await.unwrap();

        let state = browser.state().await;
        assert_eq!(state.current_bucket(), Some("first"));
        assert_eq!(state.buckets().len(), 2);
    }

    #[tokio::test]
    async fn test_init_auth_failure_is_recoverable() {
        let mut mock = MockObjectStore::new();
        mock.expect_list_buckets()
            .returning(|_| Err(Error::Auth("InvalidAccessKeyId".into())));
        mock.expect_list_objects().never();

        let browser = Browser::new(mock, credential_store(vec![credential("dev", None)]).await);
        let err = browser.init().await.unwrap_err();

        assert!(err.needs_credentials());
        let state = browser.state().await;
        assert!(state.current_bucket().is_none());
        assert!(state.error().unwrap().contains("InvalidAccessKeyId"));
    }

    #[tokio::test]
    async fn test_region_lookup_failure_falls_back() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Err(Error::Auth("AccessDenied".into())));
        mock.expect_list_objects()
            .withf(|_, req| req.region.is_none())
            .times(1)
            .returning(|_, _| Ok(ListingPage::default()));

        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await);
        browser.navigate("bucket", "").await.unwrap();
    }

    #[tokio::test]
    async fn test_paging_forward_and_back() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .returning(|_, req| match req.continuation_token.as_deref() {
                None => Ok(page("logs/", &["logs/1"], Some("t2"))),
                Some("t2") => Ok(page("logs/", &["logs/2"], Some("t3"))),
                Some("t3") => Ok(page("logs/", &["logs/3"], None)),
                Some(other) => Err(Error::Transport(format!("unexpected token {other}"))),
            });

        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await);
        browser.navigate("b", "logs").await.unwrap();

        let state = browser.state().await;
        assert_eq!(state.current_prefix(), "logs/");
        assert!(!state.has_prev_page());
        assert!(state.has_next_page());

        browser.page_forward().await.unwrap();
        browser.page_forward().await.unwrap();
        let state = browser.state().await;
        assert_eq!(state.objects()[0].key, "logs/3");
        assert_eq!(state.prev_tokens(), ["", "t2"]);
        assert!(!state.has_next_page());
        assert!(matches!(
            browser.page_forward().await,
            Err(Error::Validation(_))
        ));

        browser.page_back().await.unwrap();
        assert_eq!(browser.state().await.objects()[0].key, "logs/2");

        browser.page_back().await.unwrap();
        let state = browser.state().await;
        assert_eq!(state.objects()[0].key, "logs/1");
        assert!(!state.has_prev_page());
        assert!(state.page_token().is_none());
    }

    #[tokio::test]
    async fn test_listing_failure_clears_results_keeps_stacks() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .returning(|_, req| match req.continuation_token.as_deref() {
                None => Ok(page("", &["one"], Some("t2"))),
                _ => Err(Error::Transport("connection reset".into())),
            });

        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await);
        browser.navigate("b", "").await.unwrap();

        let err = browser.page_forward().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        let state = browser.state().await;
        assert!(state.objects().is_empty());
        assert!(state.prev_tokens().is_empty());
        assert_eq!(state.next_token(), Some("t2"));
        assert!(state.error().unwrap().contains("connection reset"));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_search_filters_without_fetching() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .times(1)
            .returning(|_, _| Ok(page("", &["Report.pdf", "photo.png"], None)));

        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await);
        browser.navigate("b", "").await.unwrap();
        browser.search("REPORT").await;

        let state = browser.state().await;
        let names: Vec<&str> = state
            .filtered_objects()
            .iter()
            .map(|o| o.display_name.as_str())
            .collect();
        assert_eq!(names, ["Report.pdf"]);
    }

    #[tokio::test]
    async fn test_upload_refreshes_and_reports_progress() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .times(2)
            .returning(|_, _| Ok(page("docs/", &["docs/new.txt"], None)));
        mock.expect_upload()
            .withf(|_, loc, data, ct, _| {
                loc.bucket == "b"
                    && loc.key == "docs/new.txt"
                    && data.as_slice() == b"hello"
                    && ct.as_deref() == Some("text/plain")
            })
            .times(1)
            .returning(|_, _, _, _, progress| {
                if let Some(progress) = progress {
                    progress(0);
                    progress(100);
                }
                Ok(())
            });

        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await);
        browser.navigate("b", "docs/").await.unwrap();

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |p| sink.lock().unwrap().push(p));

        let key = browser.key_in_current_folder("new.txt").await;
        browser
            .upload(b"hello".to_vec(), &key, Some("text/plain".into()), Some(progress))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 100]);
    }

    #[tokio::test]
    async fn test_upload_failure_leaves_listing() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .times(1)
            .returning(|_, _| Ok(page("", &["keep.txt"], None)));
        mock.expect_upload()
            .returning(|_, _, _, _, _| Err(Error::Transport("timeout".into())));

        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await);
        browser.navigate("b", "").await.unwrap();

        assert!(browser.upload(vec![1], "x.bin", None, None).await.is_err());
        let state = browser.state().await;
        assert_eq!(state.objects().len(), 1);
        assert!(state.error().unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .times(1)
            .returning(|_, _| Ok(page("", &["a.txt", "b.txt"], None)));
        mock.expect_delete_object()
            .withf(|_, loc| loc.key == "a.txt")
            .times(1)
            .returning(|_, _| Ok(()));

        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await);
        browser.navigate("b", "").await.unwrap();
        browser.delete("a.txt").await.unwrap();

        let state = browser.state().await;
        let keys: Vec<&str> = state.objects().iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["b.txt"]);
    }

    #[tokio::test]
    async fn test_create_folder_normalizes_key() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .returning(|_, _| Ok(ListingPage::default()));
        mock.expect_create_folder()
            .withf(|_, loc| loc.key == "photos/2024/")
            .times(1)
            .returning(|_, _| Ok(()));

        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await);
        browser.navigate("b", "photos/").await.unwrap();
        browser.create_folder("2024").await.unwrap();

        assert!(matches!(
            browser.create_folder("/").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_download_uses_configured_expiry() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .returning(|_, _| Ok(ListingPage::default()));
        mock.expect_download_url()
            .withf(|_, loc, expiry| loc.key == "f.txt" && *expiry == Duration::from_secs(60))
            .returning(|_, _, _| Ok("https://signed.example/f.txt".into()));

        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await)
            .with_download_expiry(Duration::from_secs(60));
        browser.navigate("b", "").await.unwrap();

        assert_eq!(
            browser.download("f.txt").await.unwrap(),
            "https://signed.example/f.txt"
        );
    }

    #[tokio::test]
    async fn test_select_credential_restarts_session() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .returning(|_, req| Ok(page("", &[req.bucket.as_str()], None)));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let browser = Browser::new(
            mock,
            credential_store(vec![
                credential("one", Some("bucket-one")),
                credential("two", Some("bucket-two")),
            ])
            .await,
        )
        .with_events(tx);
        browser.init().await.unwrap();
        assert_eq!(browser.state().await.current_bucket(), Some("bucket-one"));

        browser.select_credential("two").await.unwrap();
        let state = browser.state().await;
        assert_eq!(state.current_bucket(), Some("bucket-two"));
        assert_eq!(state.objects()[0].key, "bucket-two");

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events.contains(&BrowserEvent::CredentialSwitched));

        assert!(matches!(
            browser.select_credential("missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_last_credential_resets_browsing() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .returning(|_, _| Ok(ListingPage::default()));

        let browser = Browser::new(
            mock,
            credential_store(vec![credential("only", Some("b"))]).await,
        );
        browser.init().await.unwrap();

        browser.delete_credential("only").await.unwrap();
        let state = browser.state().await;
        assert!(state.current_bucket().is_none());
        assert!(browser.credential_snapshot().await.active_name.is_none());
    }

    #[tokio::test]
    async fn test_events_survive_closed_channel() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_region()
            .returning(|_, _| Ok("us-east-1".to_string()));
        mock.expect_list_objects()
            .returning(|_, _| Ok(ListingPage::default()));

        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let browser = Browser::new(mock, credential_store(vec![credential("a", None)]).await)
            .with_events(tx);

        browser.navigate("b", "").await.unwrap();
    }

    /// Store whose listings for `slow/` wait until released
    struct GatedStore {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ObjectStore for GatedStore {
        async fn list_buckets(&self, _: &Credential) -> Result<Vec<Bucket>> {
            Ok(Vec::new())
        }

        async fn bucket_region(&self, _: &Credential, _: &str) -> Result<String> {
            Ok("us-east-1".into())
        }

        async fn list_objects(&self, _: &Credential, request: ListRequest) -> Result<ListingPage> {
            if request.prefix == "slow/" {
                self.gate.notified().await;
            }
            let key = format!("{}item", request.prefix);
            Ok(page(&request.prefix, &[key.as_str()], None))
        }

        async fn upload(
            &self,
            _: &Credential,
            _: ObjectLocation,
            _: Vec<u8>,
            _: Option<String>,
            _: Option<ProgressFn>,
        ) -> Result<()> {
            Ok(())
        }

        async fn delete_object(&self, _: &Credential, _: ObjectLocation) -> Result<()> {
            Ok(())
        }

        async fn create_folder(&self, _: &Credential, _: ObjectLocation) -> Result<()> {
            Ok(())
        }

        async fn download_url(
            &self,
            _: &Credential,
            _: ObjectLocation,
            _: Duration,
        ) -> Result<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_stale_listing_is_discarded() {
        let gate = Arc::new(Notify::new());
        let browser = Arc::new(Browser::new(
            GatedStore { gate: gate.clone() },
            credential_store(vec![credential("a", None)]).await,
        ));

        let slow = {
            let browser = browser.clone();
            tokio::spawn(async move { browser.navigate("b", "slow/").await })
        };
        // Let the slow listing reach the gate
        while browser.state().await.current_prefix() != "slow/" {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        browser.navigate("b", "fast/").await.unwrap();
        gate.notify_one();
        slow.await.unwrap().unwrap();

        let state = browser.state().await;
        assert_eq!(state.current_prefix(), "fast/");
        assert_eq!(state.objects()[0].key, "fast/item");
    }
}
