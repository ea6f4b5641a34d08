//! Application service: fleet fan-out.
//!
//! One logical command goes to every target host concurrently. Each host call
//! is bounded by the per-host timeout; slow or failing hosts become absent
//! results instead of errors. The caller gets the full map only after every
//! host has answered or timed out.

use std::collections::BTreeSet;
use std::time::Duration;

use flow_common::FleetCommand;
use futures_util::StreamExt;
use futures_util::stream;
use tracing::instrument;

use crate::application::ports::HostTransport;
use crate::domain::{AbsenceReason, DispatchReport, DispatchResult};

/// Sends fleet commands through a [`HostTransport`].
pub struct FleetDispatcher<T: HostTransport> {
    transport: T,
    timeout: Duration,
    concurrency: usize,
}

impl<T: HostTransport> FleetDispatcher<T> {
    /// `concurrency` caps in-flight host calls; zero is treated as one.
    pub fn new(transport: T, timeout: Duration, concurrency: usize) -> Self {
        Self {
            transport,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Per-host call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `command` to every host in `hosts` and collect per-host results.
    #[instrument(skip_all, fields(command = command.name(), hosts = hosts.len()))]
    pub async fn dispatch(&self, command: &FleetCommand, hosts: &BTreeSet<String>) -> DispatchReport {
        let call = command.to_call();
        let call = &call;

        stream::iter(hosts.iter().cloned())
            .map(|host| async move {
                let outcome = match tokio::time::timeout(self.timeout, self.transport.call(&host, call)).await {
                    Ok(Ok(reply)) => DispatchResult::from_reply(reply),
                    Ok(Err(e)) => DispatchResult::Absent(AbsenceReason::Unreachable(format!("{e:#}"))),
                    Err(_) => DispatchResult::Absent(AbsenceReason::TimedOut),
                };
                match &outcome {
                    DispatchResult::Responded(reply) => {
                        tracing::debug!(%host, uuids = reply.len(), "host responded");
                    }
                    DispatchResult::Absent(reason) => {
                        tracing::warn!(%host, %reason, "host did not respond");
                    }
                }
                (host, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect::<DispatchReport>()
            .await
    }
}
