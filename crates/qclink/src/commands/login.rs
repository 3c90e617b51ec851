//! Login: discover (or take the given address), probe, authenticate and
//! persist the session.

use serde::Serialize;
use tracing::debug;

use qclink_core::{Connector, CoreError, CredentialStore, Origin, Session, StoreKey};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::{self, Target};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct LoginSummary {
    endpoint: String,
    account: String,
    /// Which path reached the appliance; `None` for a direct login.
    origin: Option<Origin>,
    registration_id: Option<String>,
}

fn detail(s: &LoginSummary) -> String {
    let mut pairs = vec![
        ("Endpoint", s.endpoint.clone()),
        ("Account", s.account.clone()),
    ];
    if let Some(origin) = s.origin {
        pairs.push(("Path", origin.to_string()));
    }
    if let Some(ref id) = s.registration_id {
        pairs.push(("QuickConnect ID", id.clone()));
    }
    output::render_detail(&pairs)
}

pub async fn handle(args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let target = resolved.target()?;
    let account = util::username_for(&resolved)?;
    let password = util::password_for(&resolved, args.password_stdin)?;

    let connector = Connector::new(resolved.connect.clone())?;
    let budget = util::connect_budget(&resolved);

    let (session, origin, registration_id) = match target {
        Target::QuickConnect(id) => {
            let bar = util::spinner(format!("Finding {id} via QuickConnect..."), global.quiet);
            let result = util::within(budget, async {
                Ok(connector.connect(&id, &account, &password).await?)
            })
            .await;
            bar.finish_and_clear();
            let conn = result?;
            debug!(endpoint = %conn.candidate, "login succeeded");
            (conn.session, Some(conn.candidate.origin()), Some(id))
        }
        Target::Direct(url) => {
            let bar = util::spinner(format!("Logging in to {url}..."), global.quiet);
            let result = util::within(budget, async {
                Ok(connector.connect_direct(&url, &account, &password).await?)
            })
            .await;
            bar.finish_and_clear();
            (result?, None, None)
        }
    };

    let store = util::session_store();
    // A previous login may have recorded a registration id this one lacks.
    store.remove(&StoreKey::ALL).map_err(CoreError::from)?;
    session.save(&store, registration_id.as_deref())?;

    let summary = summary(&session, origin, registration_id);
    let out = output::render_single(&global.output, &summary, detail, |s| s.endpoint.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

fn summary(session: &Session, origin: Option<Origin>, registration_id: Option<String>) -> LoginSummary {
    LoginSummary {
        endpoint: session.endpoint().to_string(),
        account: session.account().to_owned(),
        origin,
        registration_id,
    }
}
