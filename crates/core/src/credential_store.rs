//! Credential store
//!
//! Owns the named credential profiles and the active-profile pointer,
//! persists them after every mutation, and recovers data written by older
//! releases:
//!
//! - a bare credential object stored where a list is expected is wrapped in
//!   a one-element list and written back;
//! - when nothing is stored under the primary key, the two legacy keys are
//!   field-mapped, merged and moved over.
//!
//! Failures are recorded in [`CredentialStore::error`] so callers can show
//! them inline; `load` never fails outright.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::credential::{Credential, LegacyCredential};
use crate::error::{Error, Result};
use crate::storage::{KeyValueStore, json_kind};

/// Primary key holding the list of credentials
pub const CREDENTIALS_KEY: &str = "mys3browser_credentials";

/// Primary key holding the active credential name
pub const ACTIVE_CREDENTIAL_KEY: &str = "mys3browser_active_credential";

/// Legacy key holding a single credential
pub const LEGACY_CREDENTIAL_KEY: &str = "credential";

/// Legacy key holding a list of credentials (or, historically, a single one)
pub const LEGACY_ALL_CREDENTIALS_KEY: &str = "allCredentials";

/// In-memory credential collection
///
/// The collection can be replaced from outside the store, so a value of the
/// wrong shape is representable and guarded against by every operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSlot {
    List(Vec<Credential>),
    Corrupted(Value),
}

impl Default for CredentialSlot {
    fn default() -> Self {
        CredentialSlot::List(Vec::new())
    }
}

/// Published to subscribers after every load or mutation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialSnapshot {
    pub credentials: Vec<Credential>,
    pub active_name: Option<String>,
}

impl CredentialSnapshot {
    /// The active credential, if the pointer resolves
    pub fn active(&self) -> Option<&Credential> {
        let name = self.active_name.as_deref()?;
        self.credentials.iter().find(|c| c.name == name)
    }
}

/// Store for named credential profiles
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStore>,
    legacy: Arc<dyn KeyValueStore>,
    slot: CredentialSlot,
    /// Stored entries that do not decode; written back untouched
    unreadable: Vec<Value>,
    active_name: Option<String>,
    is_loading: bool,
    error: Option<String>,
    notifier: watch::Sender<CredentialSnapshot>,
}

impl CredentialStore {
    /// Create an empty store over the primary and legacy namespaces
    pub fn new(storage: Arc<dyn KeyValueStore>, legacy: Arc<dyn KeyValueStore>) -> Self {
        let (notifier, _) = watch::channel(CredentialSnapshot::default());
        Self {
            storage,
            legacy,
            slot: CredentialSlot::default(),
            unreadable: Vec::new(),
            active_name: None,
            is_loading: false,
            error: None,
            notifier,
        }
    }

    /// All credentials; empty while the collection is corrupted
    pub fn credentials(&self) -> &[Credential] {
        match &self.slot {
            CredentialSlot::List(list) => list,
            CredentialSlot::Corrupted(_) => &[],
        }
    }

    /// Raw in-memory collection
    pub fn slot(&self) -> &CredentialSlot {
        &self.slot
    }

    /// Name of the active credential, possibly stale
    pub fn active_name(&self) -> Option<&str> {
        self.active_name.as_deref()
    }

    /// Last error recorded by an operation
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Replace the in-memory collection with an arbitrary JSON value
    ///
    /// A list of valid credentials is taken as-is; anything else leaves the
    /// store corrupted until the next `save` or `delete` repairs it.
    pub fn replace_raw(&mut self, value: Value) {
        self.slot = match serde_json::from_value::<Vec<Credential>>(value.clone()) {
            Ok(list) => CredentialSlot::List(list),
            Err(_) => CredentialSlot::Corrupted(value),
        };
        self.unreadable.clear();
        self.publish();
    }

    /// Subscribe to credential changes
    pub fn subscribe(&self) -> watch::Receiver<CredentialSnapshot> {
        self.notifier.subscribe()
    }

    /// The active credential
    ///
    /// `None` when no name is active, the name is stale, or the collection
    /// is corrupted.
    pub fn active_credential(&self) -> Option<&Credential> {
        let name = self.active_name.as_deref()?;
        match &self.slot {
            CredentialSlot::List(list) => list.iter().find(|c| c.name == name),
            CredentialSlot::Corrupted(_) => None,
        }
    }

    /// Look up a credential by name; `None` also when corrupted
    pub fn get_by_name(&self, name: &str) -> Option<&Credential> {
        match &self.slot {
            CredentialSlot::List(list) => list.iter().find(|c| c.name == name),
            CredentialSlot::Corrupted(_) => {
                warn!("Credential collection is corrupted; lookup of '{name}' skipped");
                None
            }
        }
    }

    /// Load credentials and the active pointer from storage
    pub async fn load(&mut self) {
        self.is_loading = true;
        self.error = None;

        if let Err(e) = self.try_load().await {
            warn!("Failed to load credentials: {e}");
            self.error = Some(e.to_string());
        }

        self.is_loading = false;
        self.publish();
    }

    async fn try_load(&mut self) -> Result<()> {
        let primary = self.storage.get(CREDENTIALS_KEY).await?;
        let active = self.storage.get(ACTIVE_CREDENTIAL_KEY).await?;

        let decoded = match primary {
            Some(value) if !value.is_null() => decode_primary(value)?,
            // Migration persists its own result
            _ => Decoded {
                credentials: self.migrate().await?,
                ..Decoded::default()
            },
        };
        let needs_persist = decoded.wrapped;

        self.slot = CredentialSlot::List(decoded.credentials);
        self.unreadable = decoded.unreadable;
        self.active_name = match active {
            Some(Value::String(name)) if !name.is_empty() => Some(name),
            _ => None,
        };

        if needs_persist && !self.credentials().is_empty() {
            self.persist_credentials().await?;
            info!("Rewrote stored credentials as a list");
        }

        if self.active_name.is_none() {
            if let Some(first) = self.credentials().first().map(|c| c.name.clone()) {
                debug!("No active credential; selecting '{first}'");
                self.persist_active(&first).await?;
                self.active_name = Some(first);
            }
        }

        Ok(())
    }

    /// Recover credentials from the legacy namespace
    ///
    /// Entries from the legacy list come first; the legacy single credential
    /// is appended unless an entry with the same access key and region is
    /// already present. When at least one credential is recovered it is
    /// written under the primary key and both legacy keys are removed.
    pub async fn migrate(&mut self) -> Result<Vec<Credential>> {
        let mut migrated: Vec<Credential> = Vec::new();

        if let Some(value) = self.read_legacy(LEGACY_ALL_CREDENTIALS_KEY).await {
            match value {
                Value::Array(items) => {
                    let total = items.len();
                    for (index, item) in items.into_iter().enumerate() {
                        match serde_json::from_value::<LegacyCredential>(item) {
                            Ok(legacy) => migrated.push(legacy.into_credential(index)),
                            Err(e) => warn!("Skipping unreadable legacy credential #{index}: {e}"),
                        }
                    }
                    info!("Migrated {} of {total} legacy credentials", migrated.len());
                }
                Value::Object(_) => match serde_json::from_value::<LegacyCredential>(value) {
                    Ok(legacy) => {
                        migrated.push(legacy.into_credential(0));
                        info!("Migrated 1 legacy credential stored as a bare object");
                    }
                    Err(e) => warn!("Unreadable legacy credential list: {e}"),
                },
                other => warn!(
                    "Ignoring legacy '{LEGACY_ALL_CREDENTIALS_KEY}' holding {}",
                    json_kind(&other)
                ),
            }
        }

        if let Some(value) = self.read_legacy(LEGACY_CREDENTIAL_KEY).await {
            if value.is_object() {
                match serde_json::from_value::<LegacyCredential>(value) {
                    Ok(legacy) => {
                        let converted = legacy.into_credential(migrated.len());
                        let duplicate = migrated.iter().any(|c| {
                            c.access_key_id == converted.access_key_id
                                && c.region == converted.region
                        });
                        if duplicate {
                            debug!("Skipped duplicate legacy credential '{}'", converted.name);
                        } else {
                            info!("Migrated legacy credential '{}'", converted.name);
                            migrated.push(converted);
                        }
                    }
                    Err(e) => warn!("Unreadable legacy credential: {e}"),
                }
            }
        }

        if migrated.is_empty() {
            return Ok(migrated);
        }

        self.storage
            .set(CREDENTIALS_KEY, serde_json::to_value(&migrated)?)
            .await?;
        self.legacy.remove(LEGACY_CREDENTIAL_KEY).await?;
        self.legacy.remove(LEGACY_ALL_CREDENTIALS_KEY).await?;
        info!("Cleaned up legacy credential storage");

        Ok(migrated)
    }

    /// Read and decode one legacy value; failures are logged and skipped
    async fn read_legacy(&self, key: &str) -> Option<Value> {
        let value = match self.legacy.get(key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read legacy '{key}': {e}");
                return None;
            }
        };

        // Old releases stored JSON text rather than structured values
        match value {
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Failed to parse legacy '{key}': {e}");
                    None
                }
            },
            Value::Null => None,
            other => Some(other),
        }
    }

    /// Add or replace a credential by name
    ///
    /// The first credential saved into an empty collection becomes active.
    pub async fn save(&mut self, credential: Credential) -> Result<()> {
        self.error = None;
        let result = self.try_save(credential).await;
        self.finish(result)
    }

    async fn try_save(&mut self, credential: Credential) -> Result<()> {
        credential.validate()?;
        let list = self.guarded_list();

        match list.iter_mut().find(|c| c.name == credential.name) {
            Some(existing) => *existing = credential.clone(),
            None => list.push(credential.clone()),
        }
        let is_first = list.len() == 1;

        self.persist_credentials().await?;

        if is_first {
            self.try_set_active(&credential.name).await?;
        }
        Ok(())
    }

    /// Remove every credential with the given name
    ///
    /// If the active credential is removed, the first remaining one becomes
    /// active; with none left the active pointer is cleared.
    pub async fn delete(&mut self, name: &str) -> Result<()> {
        self.error = None;
        let result = self.try_delete(name).await;
        self.finish(result)
    }

    async fn try_delete(&mut self, name: &str) -> Result<()> {
        if let CredentialSlot::Corrupted(_) = self.slot {
            warn!("Credential collection is corrupted; resetting to an empty list");
            self.slot = CredentialSlot::default();
            return Ok(());
        }

        let list = self.guarded_list();
        list.retain(|c| c.name != name);
        let next = list.first().map(|c| c.name.clone());

        self.persist_credentials().await?;

        if self.active_name.as_deref() == Some(name) {
            match next {
                Some(next) => self.try_set_active(&next).await?,
                None => {
                    self.active_name = None;
                    self.storage.remove(ACTIVE_CREDENTIAL_KEY).await?;
                }
            }
        }
        Ok(())
    }

    /// Make the named credential active
    pub async fn set_active(&mut self, name: &str) -> Result<()> {
        self.error = None;
        let result = self.try_set_active(name).await;
        self.finish(result)
    }

    async fn try_set_active(&mut self, name: &str) -> Result<()> {
        let list = match &self.slot {
            CredentialSlot::List(list) => list,
            CredentialSlot::Corrupted(_) => {
                return Err(Error::Validation("Invalid credentials data".into()));
            }
        };

        if !list.iter().any(|c| c.name == name) {
            return Err(Error::NotFound(format!("Credential \"{name}\"")));
        }

        self.persist_active(name).await?;
        self.active_name = Some(name.to_string());
        Ok(())
    }

    /// Collection as a mutable list, resetting a corrupted value first
    fn guarded_list(&mut self) -> &mut Vec<Credential> {
        if let CredentialSlot::Corrupted(value) = &self.slot {
            warn!(
                "Credential collection holds {} instead of a list; resetting",
                json_kind(value)
            );
            self.slot = CredentialSlot::default();
        }
        match &mut self.slot {
            CredentialSlot::List(list) => list,
            CredentialSlot::Corrupted(_) => unreachable!("slot was reset above"),
        }
    }

    async fn persist_credentials(&self) -> Result<()> {
        let mut items = Vec::with_capacity(self.credentials().len() + self.unreadable.len());
        for credential in self.credentials() {
            items.push(serde_json::to_value(credential)?);
        }
        items.extend(self.unreadable.iter().cloned());
        self.storage.set(CREDENTIALS_KEY, Value::Array(items)).await
    }

    async fn persist_active(&self, name: &str) -> Result<()> {
        self.storage
            .set(ACTIVE_CREDENTIAL_KEY, Value::String(name.to_string()))
            .await
    }

    fn finish(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            self.error = Some(e.to_string());
        }
        self.publish();
        result
    }

    fn publish(&self) {
        self.notifier.send_replace(CredentialSnapshot {
            credentials: self.credentials().to_vec(),
            active_name: self.active_name.clone(),
        });
    }
}

/// Primary value split into usable credentials and entries kept verbatim
#[derive(Debug, Default)]
struct Decoded {
    credentials: Vec<Credential>,
    unreadable: Vec<Value>,
    /// A bare object was wrapped into a list and must be written back
    wrapped: bool,
}

fn decode_primary(value: Value) -> Result<Decoded> {
    match value {
        Value::Array(items) => {
            let mut decoded = Decoded::default();
            for item in items {
                match serde_json::from_value(item.clone()) {
                    Ok(credential) => decoded.credentials.push(credential),
                    Err(e) => {
                        warn!("Skipping unreadable stored credential: {e}");
                        decoded.unreadable.push(item);
                    }
                }
            }
            Ok(decoded)
        }
        Value::Object(_) => {
            warn!("Found a single credential object; converting to a list");
            let credential: Credential = serde_json::from_value(value)
                .map_err(|e| Error::CorruptedState(format!("stored credential: {e}")))?;
            Ok(Decoded {
                credentials: vec![credential],
                unreadable: Vec::new(),
                wrapped: true,
            })
        }
        other => Err(Error::CorruptedState(format!(
            "'{CREDENTIALS_KEY}' holds {}",
            json_kind(&other)
        ))),
    }
}
