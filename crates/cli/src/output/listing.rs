//! Serializable views of browser state
//!
//! Each view renders as a table in human mode and serializes to a stable
//! JSON shape in JSON mode.

use std::fmt;

use jiff::Timestamp;
use serde::Serialize;

use mys3_core::{Breadcrumb, BrowseState, Bucket, Credential};

use super::formatter::plain_table;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_date(ts: Option<Timestamp>) -> String {
    ts.map(|t| t.strftime(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// One row of a folder listing
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

/// The current page of a folder, after the search filter
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub bucket: String,
    pub prefix: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub search: String,
    pub entries: Vec<EntryView>,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

impl ListingView {
    pub fn from_state(state: &BrowseState) -> Self {
        let folders = state.filtered_folders().into_iter().map(|f| EntryView {
            kind: "folder",
            name: format!("{}/", f.display_name),
            key: f.prefix.clone(),
            size_bytes: None,
            size_human: None,
            last_modified: None,
        });
        let objects = state.filtered_objects().into_iter().map(|o| EntryView {
            kind: "file",
            name: o.display_name.clone(),
            key: o.key.clone(),
            size_bytes: Some(o.size),
            size_human: Some(o.size_human.clone()),
            last_modified: o.last_modified,
        });

        Self {
            bucket: state.current_bucket().unwrap_or_default().to_string(),
            prefix: state.current_prefix().to_string(),
            breadcrumbs: state.breadcrumbs(),
            search: state.search_query().to_string(),
            entries: folders.chain(objects).collect(),
            has_prev_page: state.has_prev_page(),
            has_next_page: state.has_next_page(),
        }
    }

    /// Breadcrumb trail as a path, e.g. `photos / 2024 / summer`
    pub fn trail(&self) -> String {
        self.breadcrumbs
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl fmt::Display for ListingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.trail())?;

        if self.entries.is_empty() {
            return write!(f, "(empty)");
        }

        let mut table = plain_table(&["MODIFIED", "SIZE", "NAME"], &[1]);
        for entry in &self.entries {
            table.add_row(vec![
                format_date(entry.last_modified),
                entry.size_human.clone().unwrap_or_default(),
                entry.name.clone(),
            ]);
        }
        write!(f, "{table}")?;

        match (self.has_prev_page, self.has_next_page) {
            (false, false) => Ok(()),
            (prev, next) => write!(
                f,
                "\n({}{}{})",
                if prev { "previous page available" } else { "" },
                if prev && next { ", " } else { "" },
                if next { "more results on the next page" } else { "" },
            ),
        }
    }
}

/// Buckets visible to the active credential
#[derive(Debug, Clone, Serialize)]
pub struct BucketView {
    pub buckets: Vec<Bucket>,
}

impl fmt::Display for BucketView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.buckets.is_empty() {
            return write!(f, "No buckets.");
        }

        let mut table = plain_table(&["CREATED", "REGION", "NAME"], &[]);
        for bucket in &self.buckets {
            table.add_row(vec![
                format_date(bucket.creation_date),
                bucket.region.clone().unwrap_or_default(),
                bucket.name.clone(),
            ]);
        }
        write!(f, "{table}")
    }
}

/// Credential listing without secrets
#[derive(Debug, Clone, Serialize)]
pub struct CredentialView {
    pub credentials: Vec<CredentialRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialRow {
    pub name: String,
    pub access_key_id: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub active: bool,
}

impl CredentialView {
    pub fn new(credentials: &[Credential], active: Option<&str>) -> Self {
        Self {
            credentials: credentials
                .iter()
                .map(|c| CredentialRow {
                    name: c.name.clone(),
                    access_key_id: mask_key(&c.access_key_id),
                    region: c.region.clone(),
                    bucket: c.default_bucket().map(String::from),
                    endpoint: c.endpoint.clone(),
                    active: active == Some(c.name.as_str()),
                })
                .collect(),
        }
    }
}

impl fmt::Display for CredentialView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.credentials.is_empty() {
            return write!(f, "No credentials configured.");
        }

        let mut table = plain_table(
            &["", "NAME", "ACCESS KEY", "REGION", "BUCKET", "ENDPOINT"],
            &[],
        );
        for row in &self.credentials {
            table.add_row(vec![
                if row.active { "*" } else { "" }.to_string(),
                row.name.clone(),
                row.access_key_id.clone(),
                row.region.clone(),
                row.bucket.clone().unwrap_or_default(),
                row.endpoint.clone().unwrap_or_default(),
            ]);
        }
        write!(f, "{table}")
    }
}

/// Keep the first four characters of an access key
fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() > 4 {
        format!("{visible}****")
    } else {
        visible
    }
}
