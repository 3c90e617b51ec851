//! Discovery, failover and session layer between `qclink-api` and the CLI.
//!
//! - **[`Connector`]** -- runs the whole flow for a registration id:
//!   broker resolution, candidate ranking, probing, login.
//!
//! - **[`rank`]** -- deterministic candidate ordering (local, dynamic-dns,
//!   external, relay, broker-direct).
//!
//! - **[`ConnectivityProber`]** -- finds the first candidate answering as a
//!   DSM Web API, sequentially or concurrently under a shared deadline.
//!
//! - **[`SessionManager`] / [`Session`]** -- stateless login service and the
//!   caller-owned session value it produces. Provider codes are classified
//!   into [`AuthError`].
//!
//! - **[`CommandClient`]** -- Download Station commands against a session;
//!   a session-invalid reply expires the session.
//!
//! - **[`CredentialStore`]** -- persistence seam for session state (never
//!   the password).

pub mod candidate;
pub mod command;
pub mod config;
pub mod connector;
pub mod convert;
pub mod error;
pub mod model;
pub mod probe;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use candidate::{Candidate, Origin, RankPolicy, rank};
pub use command::{Command, CommandClient, CommandOutput};
pub use config::{
    ConnectConfig, DiscoveryConfig, ProbeConfig, ProbeMode, Scheme, TlsVerification,
};
pub use connector::{Connection, Connector, Discovery, parse_endpoint};
pub use error::{AuthError, CommandError, CoreError, StoreError};
pub use model::{DeleteOutcome, DownloadTask, TaskStatus};
pub use probe::{ConnectivityProber, ProbeError, ProbeFailure};
pub use session::{Session, SessionManager, SessionState};
pub use store::{CredentialStore, MemoryCredentialStore, SessionRecord, StoreKey};

// Raw types callers need alongside the core API.
pub use qclink_api::{DiscoveryError, HostFailure, ServerDescriptor};
