//! Resolve: ask the broker where an ID lives and show the ranked candidates.

use serde::Serialize;
use tabled::Tabled;

use qclink_core::{Candidate, Connector, ServerDescriptor};

use crate::cli::GlobalOpts;
use crate::config::{self, Target};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Path")]
    origin: String,
    #[tabled(rename = "URL")]
    url: String,
}

#[derive(Serialize)]
struct ResolveView {
    registration_id: String,
    server: ServerDescriptor,
    candidates: Vec<Candidate>,
}

fn host_port(host: &str, port: Option<u16>) -> String {
    port.map_or_else(|| host.to_owned(), |p| format!("{host}:{p}"))
}

fn detail(v: &ResolveView) -> String {
    let s = &v.server;
    let or_dash = |o: Option<String>| o.unwrap_or_else(|| "-".into());
    let summary = output::render_detail(&[
        ("QuickConnect ID", v.registration_id.clone()),
        ("LAN addresses", or_dash(Some(s.local_addresses.join(", ")).filter(|l| !l.is_empty()))),
        ("Dynamic DNS", or_dash(s.ddns.clone())),
        (
            "External",
            or_dash(s.external.as_ref().map(|a| host_port(&a.host, a.port))),
        ),
        (
            "Relay",
            or_dash(s.relay.as_ref().map(|a| host_port(&a.host, a.port))),
        ),
        ("Service port", or_dash(s.service_port.map(|p| p.to_string()))),
        ("Forwarded port", or_dash(s.external_port.map(|p| p.to_string()))),
    ]);

    let rows: Vec<CandidateRow> = v
        .candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| CandidateRow {
            rank: idx + 1,
            origin: c.origin().to_string(),
            url: c.url().to_string(),
        })
        .collect();
    format!("{summary}\n\n{}", output::render_table(&rows))
}

// ── Handler ─────────────────────────────────────────────────────────

/// The registration id a discovery command runs against.
pub(super) fn registration_id(target: Target) -> Result<String, CliError> {
    match target {
        Target::QuickConnect(id) => Ok(id),
        Target::Direct(url) => Err(CliError::Validation {
            field: "url".into(),
            reason: format!("{url} is not a QuickConnect ID"),
        }),
    }
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let id = registration_id(resolved.target()?)?;
    let connector = Connector::new(resolved.connect.clone())?;

    let bar = util::spinner(format!("Resolving {id}..."), global.quiet);
    let result = util::within(resolved.timeout_secs, async {
        Ok(connector.discover(&id).await?)
    })
    .await;
    bar.finish_and_clear();
    let discovery = result?;

    let view = ResolveView {
        registration_id: discovery.registration_id,
        server: discovery.descriptor,
        candidates: discovery.candidates,
    };
    let out = output::render_single(&global.output, &view, detail, |v| {
        v.candidates
            .iter()
            .map(|c| c.url().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
