// ── Connectivity probing ──
//
// Finds the first candidate that answers as a DSM Web API. Every probe is
// bounded by its own timeout; when a bound fires the request future is
// dropped, which aborts the in-flight request and frees its connection.
// Each candidate is probed at most once per call.

use std::pin::pin;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use qclink_api::ApplianceClient;
use qclink_api::transport::{TransportConfig, bounded};

use crate::candidate::Candidate;
use crate::config::{ProbeConfig, ProbeMode};
use crate::error::CoreError;

/// One candidate that did not answer, and why.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{candidate}: {reason}")]
pub struct ProbeFailure {
    pub candidate: Candidate,
    pub reason: String,
}

/// No candidate answered. Failures are listed in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_failures(.failures))]
pub struct ProbeError {
    pub failures: Vec<ProbeFailure>,
}

fn render_failures(failures: &[ProbeFailure]) -> String {
    if failures.is_empty() {
        return "no candidates to probe".into();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

const UNRECOGNIZED: &str = "response is not a DSM Web API";
const CANCELLED: &str = "probe cancelled";
const DEADLINE: &str = "overall probe deadline exceeded";

/// Probes ranked candidates for a live appliance.
#[derive(Debug, Clone)]
pub struct ConnectivityProber {
    http: reqwest::Client,
    config: ProbeConfig,
    gateway_domains: Vec<String>,
}

impl ConnectivityProber {
    pub fn new(transport: &TransportConfig, config: ProbeConfig) -> Result<Self, CoreError> {
        let transport = transport.clone().with_timeout(config.timeout);
        Ok(Self::with_client(transport.build_client()?, config))
    }

    /// Create a prober around a pre-built `reqwest::Client`. The client
    /// must follow redirects for gateway hand-offs to be detected.
    pub fn with_client(http: reqwest::Client, config: ProbeConfig) -> Self {
        Self {
            http,
            config,
            gateway_domains: Vec::new(),
        }
    }

    /// Domains whose hosts are gateways rather than appliances (the broker
    /// domain, typically). Redirects away from them identify the real host.
    pub fn with_gateway_domains(mut self, domains: Vec<String>) -> Self {
        self.gateway_domains = domains;
        self
    }

    /// Return the first live candidate.
    pub async fn find_live(&self, candidates: Vec<Candidate>) -> Result<Candidate, ProbeError> {
        self.find_live_until(candidates, CancellationToken::new())
            .await
    }

    /// Like [`find_live`](Self::find_live), but abandons all outstanding
    /// probes as soon as `cancel` fires.
    pub async fn find_live_until(
        &self,
        candidates: Vec<Candidate>,
        cancel: CancellationToken,
    ) -> Result<Candidate, ProbeError> {
        debug!(
            count = candidates.len(),
            mode = %self.config.mode,
            "probing candidates"
        );
        match self.config.mode {
            ProbeMode::Sequential => self.probe_sequential(candidates, &cancel).await,
            ProbeMode::Concurrent => self.probe_concurrent(candidates, &cancel).await,
        }
    }

    async fn probe_sequential(
        &self,
        candidates: Vec<Candidate>,
        cancel: &CancellationToken,
    ) -> Result<Candidate, ProbeError> {
        let mut failures = Vec::with_capacity(candidates.len());
        let mut remaining = candidates.into_iter();

        while let Some(candidate) = remaining.next() {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(CANCELLED.to_owned()),
                outcome = self.probe_one(&candidate) => outcome,
            };

            match outcome {
                Ok(live) => {
                    info!(candidate = %live, "found live endpoint");
                    return Ok(live);
                }
                Err(reason) => {
                    debug!(candidate = %candidate, reason = %reason, "probe failed");
                    let cancelled = cancel.is_cancelled();
                    failures.push(ProbeFailure { candidate, reason });
                    if cancelled {
                        failures.extend(remaining.by_ref().map(|candidate| ProbeFailure {
                            candidate,
                            reason: CANCELLED.to_owned(),
                        }));
                    }
                }
            }
        }

        Err(ProbeError { failures })
    }

    async fn probe_concurrent(
        &self,
        candidates: Vec<Candidate>,
        cancel: &CancellationToken,
    ) -> Result<Candidate, ProbeError> {
        let mut reasons: Vec<Option<String>> = vec![None; candidates.len()];

        let outcome = {
            let mut in_flight: FuturesUnordered<_> = candidates
                .iter()
                .enumerate()
                .map(|(idx, candidate)| async move { (idx, self.probe_one(candidate).await) })
                .collect();
            let mut deadline = pin!(tokio::time::sleep(self.config.deadline));

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break Err(CANCELLED),
                    () = &mut deadline => break Err(DEADLINE),
                    next = in_flight.next() => match next {
                        Some((_, Ok(live))) => break Ok(live),
                        Some((idx, Err(reason))) => {
                            debug!(candidate = %candidates[idx], reason = %reason, "probe failed");
                            reasons[idx] = Some(reason);
                        }
                        None => break Err(UNRECOGNIZED),
                    },
                }
            }
            // `in_flight` drops here, aborting every probe still pending.
        };

        match outcome {
            Ok(live) => {
                info!(candidate = %live, "found live endpoint");
                Ok(live)
            }
            Err(fallback) => {
                let failures = candidates
                    .into_iter()
                    .zip(reasons)
                    .map(|(candidate, reason)| ProbeFailure {
                        candidate,
                        reason: reason.unwrap_or_else(|| fallback.to_owned()),
                    })
                    .collect();
                Err(ProbeError { failures })
            }
        }
    }

    /// Probe a single candidate under the per-candidate bound.
    async fn probe_one(&self, candidate: &Candidate) -> Result<Candidate, String> {
        debug!(candidate = %candidate, "probing");
        let client = ApplianceClient::with_client(self.http.clone(), candidate.url().clone());

        let reply = bounded(self.config.timeout, client.query_info())
            .await
            .map_err(|e| e.to_string())?;

        if self.is_gateway_handoff(candidate, &reply.final_url) {
            debug!(from = %candidate.url(), to = %reply.final_url, "gateway redirected");
            return candidate
                .redirected_to(&reply.final_url)
                .ok_or_else(|| format!("unusable redirect target {}", reply.final_url));
        }

        if !reply.recognized {
            return Err(UNRECOGNIZED.to_owned());
        }
        // Later requests must go straight to wherever the appliance lives:
        // a redirected POST comes back as a body-less GET.
        if reply.final_url.origin() != candidate.url().origin() {
            debug!(from = %candidate.url(), to = %reply.final_url, "appliance redirected");
            return candidate
                .redirected_to(&reply.final_url)
                .ok_or_else(|| format!("unusable redirect target {}", reply.final_url));
        }
        Ok(candidate.clone())
    }

    fn is_gateway_host(&self, host: &str) -> bool {
        self.gateway_domains.iter().any(|domain| {
            host.eq_ignore_ascii_case(domain)
                || host
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
        })
    }

    /// A redirect from a gateway (broker or relay) to some other,
    /// non-gateway host.
    fn is_gateway_handoff(&self, candidate: &Candidate, final_url: &Url) -> bool {
        let Some(final_host) = final_url.host_str() else {
            return false;
        };
        let from_gateway = candidate.origin().is_gateway() || self.is_gateway_host(candidate.host());
        from_gateway
            && !final_host.eq_ignore_ascii_case(candidate.host())
            && !self.is_gateway_host(final_host)
    }
}
