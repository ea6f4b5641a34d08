//! Fleet RPC envelope.
//!
//! One JSON object per host call: `{"command": <code>, "args": <payload>}`.
//! Hosts answer with an object mapping app uuid to a response object; a
//! response carrying an `error` member is a rejection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Command code for starting apps.
pub const START: u8 = 0;
/// Command code for stopping apps.
pub const STOP: u8 = 1;
/// Command code for querying host state.
pub const QUERY: u8 = 2;

/// A single logical command sent to every host of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetCommand {
    /// Start each uuid with the given profile name.
    Start(BTreeMap<String, String>),
    /// Stop the listed uuids.
    Stop(Vec<String>),
    /// Ask hosts for their current state.
    Query,
}

impl FleetCommand {
    #[must_use]
    pub fn start(uuid: &str, profile: &str) -> Self {
        FleetCommand::Start(BTreeMap::from([(uuid.to_string(), profile.to_string())]))
    }

    #[must_use]
    pub fn stop(uuid: &str) -> Self {
        FleetCommand::Stop(vec![uuid.to_string()])
    }

    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            FleetCommand::Start(_) => START,
            FleetCommand::Stop(_) => STOP,
            FleetCommand::Query => QUERY,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            FleetCommand::Start(_) => "start",
            FleetCommand::Stop(_) => "stop",
            FleetCommand::Query => "query",
        }
    }

    /// Build the wire envelope for this command.
    #[must_use]
    pub fn to_call(&self) -> RpcCall {
        let args = match self {
            FleetCommand::Start(apps) => serde_json::json!([apps]),
            FleetCommand::Stop(uuids) => serde_json::json!([uuids]),
            FleetCommand::Query => serde_json::json!([]),
        };
        RpcCall {
            command: self.code(),
            args,
        }
    }
}

/// JSON body posted to a host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcCall {
    pub command: u8,
    pub args: serde_json::Value,
}

/// Per-host reply: app uuid → response object.
pub type HostReply = BTreeMap<String, serde_json::Value>;
