//! Fleet fan-out tests.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::time::Duration;

use flow_cli::application::services::dispatcher::FleetDispatcher;
use flow_cli::domain::{AbsenceReason, DispatchResult};
use flow_common::FleetCommand;
use serde_json::json;

use crate::mocks::{HostBehavior, ScriptedTransport};

fn hosts(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn every_host_gets_the_command() {
    let dispatcher = FleetDispatcher::new(ScriptedTransport::accepting(), Duration::from_secs(5), 8);
    let report = dispatcher
        .dispatch(&FleetCommand::start("svc", "default"), &hosts(&["h1", "h2", "h3"]))
        .await;

    assert_eq!(report.len(), 3);
    assert_eq!(dispatcher.transport().hosts_called(), vec!["h1", "h2", "h3"]);
    for result in report.values() {
        let DispatchResult::Responded(reply) = result else {
            panic!("expected a reply, got {result:?}");
        };
        assert_eq!(reply["svc"], json!({"status": "ok"}));
    }

    let calls = dispatcher.transport().calls.lock().unwrap();
    assert!(calls.iter().all(|(_, call)| call.args == json!([{"svc": "default"}])));
}

#[tokio::test(start_paused = true)]
async fn in_flight_calls_are_capped() {
    let transport = ScriptedTransport::accepting().with_latency(Duration::from_millis(100));
    let dispatcher = FleetDispatcher::new(transport, Duration::from_secs(5), 2);
    let targets = hosts(&["h1", "h2", "h3", "h4", "h5"]);

    let report = dispatcher.dispatch(&FleetCommand::Query, &targets).await;

    assert_eq!(report.len(), 5);
    assert_eq!(dispatcher.transport().max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn zero_concurrency_still_dispatches() {
    let transport = ScriptedTransport::accepting().with_latency(Duration::from_millis(10));
    let dispatcher = FleetDispatcher::new(transport, Duration::from_secs(5), 0);

    let report = dispatcher.dispatch(&FleetCommand::stop("svc"), &hosts(&["h1", "h2"])).await;

    assert_eq!(report.len(), 2);
    assert_eq!(dispatcher.transport().max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn hung_host_times_out_without_blocking_others() {
    let transport = ScriptedTransport::accepting().with("slow", HostBehavior::Hang);
    let dispatcher = FleetDispatcher::new(transport, Duration::from_secs(2), 4);

    let report = dispatcher
        .dispatch(&FleetCommand::start("svc", "default"), &hosts(&["fast", "slow"]))
        .await;

    assert_eq!(report["slow"], DispatchResult::Absent(AbsenceReason::TimedOut));
    assert!(matches!(report["fast"], DispatchResult::Responded(_)));
}

#[tokio::test]
async fn transport_error_marks_host_unreachable() {
    let transport =
        ScriptedTransport::accepting().with("h2", HostBehavior::Fail("connection refused".to_string()));
    let dispatcher = FleetDispatcher::new(transport, Duration::from_secs(5), 4);

    let report = dispatcher.dispatch(&FleetCommand::Query, &hosts(&["h1", "h2"])).await;

    assert!(matches!(
        &report["h2"],
        DispatchResult::Absent(AbsenceReason::Unreachable(detail)) if detail.contains("connection refused")
    ));
}

#[tokio::test]
async fn empty_reply_counts_as_absent() {
    let transport = ScriptedTransport::accepting().with("h1", HostBehavior::Empty);
    let dispatcher = FleetDispatcher::new(transport, Duration::from_secs(5), 4);

    let report = dispatcher.dispatch(&FleetCommand::stop("svc"), &hosts(&["h1"])).await;

    assert_eq!(report["h1"], DispatchResult::Absent(AbsenceReason::Empty));
}

#[tokio::test]
async fn no_hosts_yields_empty_report() {
    let dispatcher = FleetDispatcher::new(ScriptedTransport::accepting(), Duration::from_secs(5), 4);
    let report = dispatcher.dispatch(&FleetCommand::Query, &BTreeSet::new()).await;
    assert!(report.is_empty());
    assert_eq!(dispatcher.transport().call_count(), 0);
}
