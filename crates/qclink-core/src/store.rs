// ── Credential store ──
//
// Persisted session state lives behind `CredentialStore`. The core reads
// and writes exactly four fields; the account password is never one of
// them. `MemoryCredentialStore` backs tests and one-shot use, the config
// crate provides a file-backed implementation.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StoreError;

/// Fields of a [`SessionRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum StoreKey {
    Endpoint,
    Account,
    Token,
    RegistrationId,
}

impl StoreKey {
    pub const ALL: [Self; 4] = [
        Self::Endpoint,
        Self::Account,
        Self::Token,
        Self::RegistrationId,
    ];
}

/// A partial view of persisted session state. Absent fields are `None`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .field("account", &self.account)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("registration_id", &self.registration_id)
            .finish()
    }
}

impl SessionRecord {
    pub fn is_empty(&self) -> bool {
        self.endpoint.is_none()
            && self.account.is_none()
            && self.token.is_none()
            && self.registration_id.is_none()
    }

    /// Copy of `self` with only `keys` kept.
    pub fn project(&self, keys: &[StoreKey]) -> Self {
        let mut out = Self::default();
        for key in keys {
            match key {
                StoreKey::Endpoint => out.endpoint.clone_from(&self.endpoint),
                StoreKey::Account => out.account.clone_from(&self.account),
                StoreKey::Token => out.token.clone_from(&self.token),
                StoreKey::RegistrationId => out.registration_id.clone_from(&self.registration_id),
            }
        }
        out
    }

    /// Overwrite fields that are present in `other`; absent ones are kept.
    pub fn merge(&mut self, other: &Self) {
        if other.endpoint.is_some() {
            self.endpoint.clone_from(&other.endpoint);
        }
        if other.account.is_some() {
            self.account.clone_from(&other.account);
        }
        if other.token.is_some() {
            self.token.clone_from(&other.token);
        }
        if other.registration_id.is_some() {
            self.registration_id.clone_from(&other.registration_id);
        }
    }

    pub fn clear(&mut self, keys: &[StoreKey]) {
        for key in keys {
            match key {
                StoreKey::Endpoint => self.endpoint = None,
                StoreKey::Account => self.account = None,
                StoreKey::Token => self.token = None,
                StoreKey::RegistrationId => self.registration_id = None,
            }
        }
    }
}

/// Key-value persistence for session state.
pub trait CredentialStore: Send + Sync {
    /// Read the requested fields. Missing fields come back as `None`.
    fn get(&self, keys: &[StoreKey]) -> Result<SessionRecord, StoreError>;

    /// Write every field present in `record`, leaving the others alone.
    fn set(&self, record: &SessionRecord) -> Result<(), StoreError>;

    fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    record: Mutex<SessionRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, keys: &[StoreKey]) -> Result<SessionRecord, StoreError> {
        let record = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(record.project(keys))
    }

    fn set(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(record);
        Ok(())
    }

    fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear(keys);
        Ok(())
    }
}
