//! Status: what the session file holds. Makes no network request.

use serde::Serialize;

use qclink_core::{CoreError, CredentialStore, StoreKey};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct StatusView {
    logged_in: bool,
    endpoint: Option<String>,
    account: Option<String>,
    registration_id: Option<String>,
    session_file: String,
}

fn detail(s: &StatusView) -> String {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    output::render_detail(&[
        ("Logged in", if s.logged_in { "yes" } else { "no" }.into()),
        ("Endpoint", or_dash(&s.endpoint)),
        ("Account", or_dash(&s.account)),
        ("QuickConnect ID", or_dash(&s.registration_id)),
        ("Session file", s.session_file.clone()),
    ])
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::session_store();
    let record = store.get(&StoreKey::ALL).map_err(CoreError::from)?;

    let view = StatusView {
        logged_in: record.token.is_some() && record.endpoint.is_some(),
        endpoint: record.endpoint.as_ref().map(ToString::to_string),
        account: record.account.clone(),
        registration_id: record.registration_id.clone(),
        session_file: store.path().display().to_string(),
    };

    let out = output::render_single(&global.output, &view, detail, |s| {
        s.endpoint.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
