//! Per-host dispatch outcomes and the all-or-nothing aggregation policy.
//!
//! Pure logic, no I/O.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use flow_common::HostReply;
use serde_json::Value;

use crate::domain::error::DeployError;

/// Why a host produced no response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsenceReason {
    /// No answer within the per-host bound.
    TimedOut,
    /// Transport-level failure reaching the host.
    Unreachable(String),
    /// The host answered with an empty reply.
    Empty,
}

impl fmt::Display for AbsenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsenceReason::TimedOut => f.write_str("timed out"),
            AbsenceReason::Unreachable(detail) => write!(f, "unreachable: {detail}"),
            AbsenceReason::Empty => f.write_str("empty reply"),
        }
    }
}

/// Outcome of one dispatched command on one host.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    Responded(HostReply),
    Absent(AbsenceReason),
}

impl DispatchResult {
    /// Classify a raw reply; an empty object counts as non-response.
    #[must_use]
    pub fn from_reply(reply: HostReply) -> Self {
        if reply.is_empty() {
            DispatchResult::Absent(AbsenceReason::Empty)
        } else {
            DispatchResult::Responded(reply)
        }
    }
}

/// Results keyed by host address, in host order.
pub type DispatchReport = BTreeMap<String, DispatchResult>;

/// Decide whether a batch succeeded.
///
/// Every host in `dispatched` must have responded, and no per-uuid response
/// may carry an `error` member. Hosts are examined in address order and the
/// first failure is returned.
///
/// # Errors
///
/// Returns [`DeployError::HostUnresponsive`] for a missing or absent host and
/// [`DeployError::RemoteRejected`] for the first nested error.
pub fn evaluate_batch(
    dispatched: &BTreeSet<String>,
    report: &DispatchReport,
) -> Result<(), DeployError> {
    for host in dispatched {
        let reply = match report.get(host) {
            Some(DispatchResult::Responded(reply)) => reply,
            Some(DispatchResult::Absent(reason)) => {
                return Err(DeployError::HostUnresponsive {
                    host: host.clone(),
                    reason: reason.to_string(),
                });
            }
            None => {
                return Err(DeployError::HostUnresponsive {
                    host: host.clone(),
                    reason: "no result recorded".to_string(),
                });
            }
        };
        for (uuid, response) in reply {
            if let Some(detail) = error_detail(response) {
                return Err(DeployError::RemoteRejected {
                    host: host.clone(),
                    uuid: uuid.clone(),
                    detail,
                });
            }
        }
    }
    Ok(())
}

fn error_detail(response: &Value) -> Option<String> {
    match response.get("error")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
