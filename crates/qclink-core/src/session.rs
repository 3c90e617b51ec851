// ── Session lifecycle ──
//
// A `Session` is a plain value owned by whichever flow authenticated it.
// `SessionManager` is stateless: it logs in, and it moves sessions it is
// handed to `Expired`. Only this module mutates session state.
//
// Unauthenticated -> Authenticating -> Authenticated -> Expired
//
// `Expired` is terminal. The password is never stored on a session, so
// recovering from expiry always means a fresh `authenticate` call.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use qclink_api::ApplianceClient;
use qclink_api::transport::bounded;

use crate::config::ConnectConfig;
use crate::error::{AuthError, CoreError};
use crate::store::{CredentialStore, SessionRecord, StoreKey};

/// Validity state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
}

/// An authenticated relationship with one appliance endpoint. Not
/// `Clone`: exactly one flow owns a session and sees its expiry.
#[derive(Debug)]
pub struct Session {
    endpoint: Url,
    account: String,
    token: Option<SecretString>,
    state: SessionState,
    established_at: Option<DateTime<Utc>>,
}

impl Session {
    fn new(endpoint: Url, account: &str) -> Self {
        Self {
            endpoint,
            account: account.to_owned(),
            token: None,
            state: SessionState::Unauthenticated,
            established_at: None,
        }
    }

    /// Rebuild an authenticated session from a token obtained earlier.
    /// The appliance decides whether the token is still good; a rejected
    /// token surfaces as `SessionExpired` on the first command.
    pub fn restore(endpoint: Url, account: impl Into<String>, token: SecretString) -> Self {
        Self {
            endpoint,
            account: account.into(),
            token: Some(token),
            state: SessionState::Authenticated,
            established_at: None,
        }
    }

    /// Restore from persisted state, if it holds endpoint, account and token.
    pub fn from_record(record: &SessionRecord) -> Option<Self> {
        let endpoint = record.endpoint.clone()?;
        let account = record.account.clone()?;
        let token = record.token.clone().filter(|t| !t.is_empty())?;
        Some(Self::restore(endpoint, account, SecretString::from(token)))
    }

    /// Persistable form. Carries the token only while the session is valid.
    pub fn to_record(&self, registration_id: Option<&str>) -> SessionRecord {
        SessionRecord {
            endpoint: Some(self.endpoint.clone()),
            account: Some(self.account.clone()),
            token: self
                .token
                .as_ref()
                .filter(|_| self.is_valid())
                .map(|t| t.expose_secret().to_owned()),
            registration_id: registration_id.map(str::to_owned),
        }
    }

    /// Load a session from `store`. `None` when nothing usable is stored.
    pub fn load(store: &dyn CredentialStore) -> Result<Option<Self>, CoreError> {
        let record = store.get(&StoreKey::ALL)?;
        Ok(Self::from_record(&record))
    }

    /// Persist this session into `store`.
    pub fn save(&self, store: &dyn CredentialStore, registration_id: Option<&str>) -> Result<(), CoreError> {
        store.set(&self.to_record(registration_id))?;
        if !self.is_valid() {
            store.remove(&[StoreKey::Token])?;
        }
        Ok(())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// When the login that produced this session completed. `None` for
    /// restored sessions.
    pub fn established_at(&self) -> Option<DateTime<Utc>> {
        self.established_at
    }

    pub fn is_valid(&self) -> bool {
        self.state == SessionState::Authenticated && self.token.is_some()
    }

    pub(crate) fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    // ── Transitions ──────────────────────────────────────────────────

    fn begin(&mut self) {
        debug!(from = %self.state, "session authenticating");
        self.state = SessionState::Authenticating;
    }

    fn establish(&mut self, token: SecretString) {
        self.token = Some(token);
        self.state = SessionState::Authenticated;
        self.established_at = Some(Utc::now());
    }

    fn expire(&mut self) {
        if self.state != SessionState::Expired {
            debug!(from = %self.state, endpoint = %self.endpoint, "session expired");
        }
        self.token = None;
        self.state = SessionState::Expired;
    }
}

/// Stateless authentication service.
#[derive(Debug, Clone)]
pub struct SessionManager {
    http: reqwest::Client,
    auth_timeout: Duration,
    session_scope: String,
}

impl SessionManager {
    pub fn new(config: &ConnectConfig) -> Result<Self, CoreError> {
        let http = config.transport().build_client()?;
        Ok(Self::with_client(http, config))
    }

    /// Create a manager around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, config: &ConnectConfig) -> Self {
        Self {
            http,
            auth_timeout: config.auth_timeout,
            session_scope: config.session_scope.clone(),
        }
    }

    /// Log in to `endpoint`. One bounded request, no retries.
    pub async fn authenticate(
        &self,
        endpoint: &Url,
        account: &str,
        secret: &SecretString,
    ) -> Result<Session, AuthError> {
        let mut session = Session::new(endpoint.clone(), account);
        session.begin();

        let client = ApplianceClient::with_client(self.http.clone(), endpoint.clone());
        let token = bounded(
            self.auth_timeout,
            client.login(account, secret, &self.session_scope),
        )
        .await
        .map_err(|e| {
            let err = AuthError::from(e);
            warn!(endpoint = %endpoint, account, error = %err, "authentication failed");
            err
        })?;

        session.establish(token);
        info!(endpoint = %endpoint, account, "authenticated");
        Ok(session)
    }

    /// Move `session` to `Expired` and drop its token.
    pub fn invalidate(&self, session: &mut Session) {
        session.expire();
    }

    pub fn is_valid(&self, session: &Session) -> bool {
        session.is_valid()
    }

    /// Best-effort server-side logout, then invalidate. Failures to reach
    /// the appliance are logged and otherwise ignored.
    pub async fn logout(&self, session: &mut Session) {
        if let Some(token) = session.token().filter(|_| session.is_valid()) {
            let client = ApplianceClient::with_client(self.http.clone(), session.endpoint().clone());
            match bounded(self.auth_timeout, client.logout(token, &self.session_scope)).await {
                Ok(()) => info!(endpoint = %session.endpoint(), "logged out"),
                Err(e) => warn!(error = %e, "logout request failed; dropping session anyway"),
            }
        }
        self.invalidate(session);
    }
}
