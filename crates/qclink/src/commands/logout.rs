//! Logout: best-effort sign-out at the appliance, then forget the session.

use qclink_core::{CoreError, CredentialStore, Session, SessionManager, StoreKey};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

use super::util;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::session_store();

    let Some(mut session) = Session::load(&store)? else {
        if !global.quiet {
            eprintln!("Not logged in");
        }
        return Ok(());
    };

    let resolved = config::resolve(global)?;
    let sessions = SessionManager::new(&resolved.connect)?;
    sessions.logout(&mut session).await;

    store.remove(&StoreKey::ALL).map_err(CoreError::from)?;
    if !global.quiet {
        eprintln!("✓ Logged out of {}", session.endpoint());
    }
    Ok(())
}
