//! Browse state
//!
//! Holds what the user is looking at: the bucket, the navigation prefix, the
//! current page of folders and objects, the stack of tokens needed to page
//! back, and a client-side search filter.
//!
//! Changing bucket or prefix always discards pagination, results and the
//! search query, so a page fetched for one location never shows up under
//! another.

use serde::Serialize;

use crate::traits::{Bucket, DELIMITER, Folder, ObjectEntry};

/// One entry of the breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub prefix: String,
}

impl Breadcrumb {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
        }
    }
}

/// Browsing state for a single view
#[derive(Debug, Clone, Default)]
pub struct BrowseState {
    buckets: Vec<Bucket>,
    current_bucket: Option<String>,
    current_prefix: String,
    folders: Vec<Folder>,
    objects: Vec<ObjectEntry>,
    page_token: Option<String>,
    next_token: Option<String>,
    prev_tokens: Vec<String>,
    search_query: String,
    is_loading: bool,
    error: Option<String>,
}

impl BrowseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn current_bucket(&self) -> Option<&str> {
        self.current_bucket.as_deref()
    }

    pub fn current_prefix(&self) -> &str {
        &self.current_prefix
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn objects(&self) -> &[ObjectEntry] {
        &self.objects
    }

    /// Continuation token the current page was fetched with
    pub fn page_token(&self) -> Option<&str> {
        self.page_token.as_deref()
    }

    pub fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }

    pub fn prev_tokens(&self) -> &[String] {
        &self.prev_tokens
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_buckets(&mut self, buckets: Vec<Bucket>) {
        self.buckets = buckets;
    }

    /// Switch bucket; the prefix goes back to the bucket root
    pub fn set_current_bucket(&mut self, bucket: Option<String>) {
        self.current_bucket = bucket;
        self.current_prefix.clear();
        self.reset_listing();
    }

    /// Navigate to a prefix within the current bucket
    pub fn set_current_prefix(&mut self, prefix: impl Into<String>) {
        self.current_prefix = prefix.into();
        self.reset_listing();
    }

    fn reset_listing(&mut self) {
        self.folders.clear();
        self.objects.clear();
        self.page_token = None;
        self.next_token = None;
        self.prev_tokens.clear();
        self.search_query.clear();
    }

    /// Replace the current page's results
    pub fn set_list_result(
        &mut self,
        folders: Vec<Folder>,
        objects: Vec<ObjectEntry>,
        next_token: Option<String>,
    ) {
        self.folders = folders;
        self.objects = objects;
        self.next_token = next_token;
    }

    pub fn set_page_token(&mut self, token: Option<String>) {
        self.page_token = token;
    }

    /// Drop the current page's results, keeping pagination untouched
    pub fn clear_results(&mut self) {
        self.folders.clear();
        self.objects.clear();
    }

    /// Remember the token of the page being left
    ///
    /// The first page has no token; it is pushed as an empty string so that
    /// going back to it is still possible.
    pub fn push_prev_token(&mut self, token: Option<String>) {
        self.prev_tokens.push(token.unwrap_or_default());
    }

    pub fn pop_prev_token(&mut self) -> Option<String> {
        self.prev_tokens.pop()
    }

    pub fn clear_prev_tokens(&mut self) {
        self.prev_tokens.clear();
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    /// Drop an object from the current page after it was deleted
    pub fn remove_object(&mut self, key: &str) {
        self.objects.retain(|o| o.key != key);
    }

    pub fn remove_folder(&mut self, prefix: &str) {
        self.folders.retain(|f| f.prefix != prefix);
    }

    pub fn has_prev_page(&self) -> bool {
        !self.prev_tokens.is_empty()
    }

    pub fn has_next_page(&self) -> bool {
        self.next_token.is_some()
    }

    /// Bucket root followed by one entry per prefix segment
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let Some(bucket) = &self.current_bucket else {
            return Vec::new();
        };

        let mut crumbs = vec![Breadcrumb::new(bucket, "")];
        let mut accumulated = String::new();
        for segment in self.current_prefix.split(DELIMITER).filter(|s| !s.is_empty()) {
            accumulated.push_str(segment);
            accumulated.push_str(DELIMITER);
            crumbs.push(Breadcrumb::new(segment, accumulated.clone()));
        }
        crumbs
    }

    /// Folders whose display name contains the search query, ignoring case
    pub fn filtered_folders(&self) -> Vec<&Folder> {
        let query = self.search_query.to_lowercase();
        self.folders
            .iter()
            .filter(|f| query.is_empty() || f.display_name.to_lowercase().contains(&query))
            .collect()
    }

    /// Objects whose display name contains the search query, ignoring case
    pub fn filtered_objects(&self) -> Vec<&ObjectEntry> {
        let query = self.search_query.to_lowercase();
        self.objects
            .iter()
            .filter(|o| query.is_empty() || o.display_name.to_lowercase().contains(&query))
            .collect()
    }
}
