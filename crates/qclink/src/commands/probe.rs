//! Probe: resolve an ID and report the first endpoint that answers.
//! Ctrl-C abandons the outstanding probes.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use qclink_core::{Candidate, Connector};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

use super::{resolve, util};

#[derive(Serialize)]
struct ProbeView {
    registration_id: String,
    live: Candidate,
}

fn detail(v: &ProbeView) -> String {
    output::render_detail(&[
        ("QuickConnect ID", v.registration_id.clone()),
        ("Path", v.live.origin().to_string()),
        ("Endpoint", v.live.url().to_string()),
    ])
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let id = resolve::registration_id(resolved.target()?)?;
    let connector = Connector::new(resolved.connect.clone())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling probes");
            on_interrupt.cancel();
        }
    });

    let bar = util::spinner(format!("Probing paths to {id}..."), global.quiet);
    let result = util::within(util::connect_budget(&resolved), async {
        Ok(connector.locate_until(&id, cancel).await?)
    })
    .await;
    bar.finish_and_clear();
    let live = result?;

    let view = ProbeView {
        registration_id: id,
        live,
    };
    let out = output::render_single(&global.output, &view, detail, |v| v.live.url().to_string());
    output::print_output(&out, global.quiet);
    Ok(())
}
