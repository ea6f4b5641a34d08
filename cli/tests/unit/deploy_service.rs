//! Deployment coordinator tests: registry writes happen only after every
//! host accepted the command.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use flow_cli::application::services::deploy::DeploymentCoordinator;
use flow_cli::application::services::dispatcher::FleetDispatcher;
use flow_cli::domain::error::DeployError;
use serde_json::json;

use crate::helpers::{ALICE_TOKEN, admin, alice, bob, manifest};
use crate::mocks::{HostBehavior, MemoryRegistry, ScriptedTransport, uuids_of};

type Coordinator = DeploymentCoordinator<MemoryRegistry, ScriptedTransport>;

fn coordinator(registry: MemoryRegistry, transport: ScriptedTransport) -> Coordinator {
    DeploymentCoordinator::new(
        registry,
        FleetDispatcher::new(transport, Duration::from_secs(2), 4),
    )
}

/// Two hosts, alice's `svc` uploaded, profile `default` stored.
fn fleet() -> MemoryRegistry {
    let registry = MemoryRegistry::with_hosts(&[("web", "h1"), ("web", "h2")]);
    registry.seed_manifest(manifest("svc", ALICE_TOKEN));
    registry.seed_profile("default", json!({"pool-limit": 4}));
    registry
}

fn deployed_fleet() -> MemoryRegistry {
    let registry = fleet();
    let mut deployed = manifest("svc", ALICE_TOKEN);
    deployed.runlist = Some("default".to_string());
    registry.seed_manifest(deployed);
    registry.seed_runlist("default", &[("svc", "default")]);
    registry
}

// ── Deploy ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deploy_records_runlist_then_manifest() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());

    flow.deploy(&alice(), "default", "svc", "default", None)
        .await
        .unwrap();

    let registry = flow.registry();
    assert_eq!(
        registry.writes(),
        vec!["write_runlist:default", "write_manifest:svc"]
    );
    assert_eq!(registry.runlist("default").get("svc").map(String::as_str), Some("default"));
    assert_eq!(
        registry.manifest("svc").unwrap().runlist.as_deref(),
        Some("default")
    );
    assert_eq!(flow.dispatcher().transport().hosts_called(), vec!["h1", "h2"]);
}

#[tokio::test]
async fn deploy_with_body_stores_profile_first() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());

    flow.deploy(
        &alice(),
        "default",
        "svc",
        "fast",
        Some(&json!({"pool-limit": 16, "isolate": {"type": "process"}})),
    )
    .await
    .unwrap();

    let registry = flow.registry();
    assert_eq!(
        registry.writes(),
        vec![
            "write_profile:fast",
            "write_runlist:default",
            "write_manifest:svc"
        ]
    );
    assert_eq!(registry.snapshot().profiles["fast"]["pool-limit"], json!(16));
    assert_eq!(registry.runlist("default")["svc"], "fast");
}

#[tokio::test(start_paused = true)]
async fn host_timeout_leaves_registry_untouched() {
    let transport = ScriptedTransport::accepting().with("h2", HostBehavior::Hang);
    let flow = coordinator(fleet(), transport);
    let before = flow.registry().snapshot();

    let err = flow
        .deploy(&alice(), "default", "svc", "default", None)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, DeployError::HostUnresponsive { host, .. } if host == "h2"),
        "{err:?}"
    );
    assert!(flow.registry().writes().is_empty());
    assert_eq!(flow.registry().snapshot().runlists, before.runlists);
    assert!(flow.registry().manifest("svc").unwrap().runlist.is_none());
}

#[tokio::test]
async fn remote_rejection_names_host_and_app() {
    let transport =
        ScriptedTransport::accepting().with("h1", HostBehavior::Reject("port in use".to_string()));
    let flow = coordinator(fleet(), transport);

    let err = flow
        .deploy(&alice(), "default", "svc", "default", None)
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("h1"), "{message}");
    assert!(message.contains("svc"), "{message}");
    assert!(message.contains("port in use"), "{message}");
    assert_eq!(err.code(), "remote_rejected");
    assert!(flow.registry().writes().is_empty());
}

#[tokio::test]
async fn rejected_deploy_still_keeps_supplied_profile() {
    let transport = ScriptedTransport::accepting().with("h2", HostBehavior::Empty);
    let flow = coordinator(fleet(), transport);

    let err = flow
        .deploy(&alice(), "default", "svc", "fast", Some(&json!({"pool-limit": 2})))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::HostUnresponsive { .. }), "{err:?}");
    assert_eq!(flow.registry().writes(), vec!["write_profile:fast"]);
}

#[tokio::test]
async fn deploy_without_hosts_dispatches_nothing() {
    let registry = MemoryRegistry::default();
    registry.seed_manifest(manifest("svc", ALICE_TOKEN));
    registry.seed_profile("default", json!({}));
    let flow = coordinator(registry, ScriptedTransport::accepting());

    let err = flow
        .deploy(&alice(), "default", "svc", "default", None)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::NoHosts), "{err:?}");
    assert_eq!(flow.dispatcher().transport().call_count(), 0);
}

#[tokio::test]
async fn deploy_of_unknown_app_fails() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());
    let err = flow
        .deploy(&alice(), "default", "ghost", "default", None)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::UnknownApp(ref u) if u == "ghost"), "{err:?}");
    assert_eq!(flow.dispatcher().transport().call_count(), 0);
}

#[tokio::test]
async fn other_developer_is_forbidden() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());
    let err = flow
        .deploy(&bob(), "default", "svc", "default", None)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Forbidden(_)), "{err:?}");
    assert_eq!(err.status_code(), 403);
    assert!(flow.registry().writes().is_empty());
}

#[tokio::test]
async fn admin_may_deploy_any_app() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());
    flow.deploy(&admin(), "default", "svc", "default", None)
        .await
        .unwrap();
    assert_eq!(flow.registry().manifest("svc").unwrap().developer, ALICE_TOKEN);
}

#[tokio::test]
async fn invalid_profile_body_is_rejected_before_dispatch() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());
    let err = flow
        .deploy(&alice(), "default", "svc", "bad", Some(&json!({"pool-limit": -1})))
        .await
        .unwrap_err();

    assert!(
        matches!(&err, DeployError::InvalidProfile { name, .. } if name == "bad"),
        "{err:?}"
    );
    assert!(err.to_string().contains("pool-limit"));
    assert!(flow.registry().writes().is_empty());
    assert_eq!(flow.dispatcher().transport().call_count(), 0);
}

#[tokio::test]
async fn missing_profile_is_rejected() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());
    let err = flow
        .deploy(&alice(), "default", "svc", "nope", None)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::InvalidProfile { .. }), "{err:?}");
    assert_eq!(flow.dispatcher().transport().call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_deploys_to_one_runlist_keep_both_entries() {
    let registry = fleet();
    registry.seed_manifest(manifest("api", ALICE_TOKEN));
    let transport = ScriptedTransport::accepting().with_latency(Duration::from_millis(20));
    let flow = coordinator(registry, transport);
    let caller = alice();

    let (a, b) = tokio::join!(
        flow.deploy(&caller, "default", "svc", "default", None),
        flow.deploy(&caller, "default", "api", "default", None),
    );
    a.unwrap();
    b.unwrap();

    let runlist = flow.registry().runlist("default");
    assert!(runlist.contains_key("svc"));
    assert!(runlist.contains_key("api"));
}

// ── Undeploy ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn undeploy_stops_and_clears_state() {
    let flow = coordinator(deployed_fleet(), ScriptedTransport::accepting());

    flow.undeploy(&alice(), "default", "svc").await.unwrap();

    let registry = flow.registry();
    assert!(registry.runlist("default").is_empty());
    assert!(registry.manifest("svc").unwrap().runlist.is_none());
    assert_eq!(
        registry.writes(),
        vec!["write_runlist:default", "write_manifest:svc"]
    );
    let calls = flow.dispatcher().transport().calls.lock().unwrap().clone();
    assert!(calls.iter().all(|(_, call)| uuids_of(call) == vec!["svc"]));
}

#[tokio::test]
async fn undeploy_of_absent_entry_is_not_deployed() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());

    let err = flow.undeploy(&alice(), "default", "svc").await.unwrap_err();

    assert!(
        matches!(&err, DeployError::NotDeployed { uuid, runlist } if uuid == "svc" && runlist == "default"),
        "{err:?}"
    );
    assert!(flow.registry().writes().is_empty());
    assert_eq!(flow.dispatcher().transport().call_count(), 0);
}

#[tokio::test]
async fn failed_stop_keeps_app_deployed() {
    let transport =
        ScriptedTransport::accepting().with("h2", HostBehavior::Fail("reset by peer".to_string()));
    let flow = coordinator(deployed_fleet(), transport);

    let err = flow.undeploy(&alice(), "default", "svc").await.unwrap_err();

    assert!(matches!(err, DeployError::HostUnresponsive { .. }), "{err:?}");
    assert!(flow.registry().writes().is_empty());
    assert!(flow.registry().runlist("default").contains_key("svc"));
    assert!(flow.registry().manifest("svc").unwrap().is_deployed());
}

#[tokio::test]
async fn undeploy_from_other_runlist_keeps_manifest_runlist() {
    let registry = deployed_fleet();
    registry.seed_runlist("staging", &[("svc", "default")]);
    let flow = coordinator(registry, ScriptedTransport::accepting());

    flow.undeploy(&alice(), "staging", "svc").await.unwrap();

    assert_eq!(
        flow.registry().manifest("svc").unwrap().runlist.as_deref(),
        Some("default")
    );
    assert!(flow.registry().runlist("staging").is_empty());
}

#[tokio::test]
async fn undeploy_of_unknown_app_fails_before_runlist_lookup() {
    let registry = MemoryRegistry::with_hosts(&[("web", "h1")]);
    registry.seed_runlist("default", &[("gone", "default")]);
    let flow = coordinator(registry, ScriptedTransport::accepting());

    let err = flow.undeploy(&admin(), "default", "gone").await.unwrap_err();

    assert!(matches!(&err, DeployError::UnknownApp(uuid) if uuid == "gone"), "{err:?}");
    assert!(flow.registry().runlist("default").contains_key("gone"));
    assert!(flow.registry().writes().is_empty());
    assert_eq!(flow.dispatcher().transport().call_count(), 0);
}

#[tokio::test]
async fn undeploy_by_other_developer_is_forbidden_whether_deployed_or_not() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());
    let err = flow.undeploy(&bob(), "default", "svc").await.unwrap_err();
    assert!(matches!(err, DeployError::Forbidden(_)), "{err:?}");

    let flow = coordinator(deployed_fleet(), ScriptedTransport::accepting());
    let err = flow.undeploy(&bob(), "default", "svc").await.unwrap_err();
    assert!(matches!(err, DeployError::Forbidden(_)), "{err:?}");
    assert!(flow.registry().writes().is_empty());
}

#[tokio::test]
async fn admin_may_undeploy_any_app() {
    let flow = coordinator(deployed_fleet(), ScriptedTransport::accepting());
    flow.undeploy(&admin(), "default", "svc").await.unwrap();
    assert!(flow.registry().runlist("default").is_empty());
}

// ── Runlist lock ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn busy_runlist_gives_up_after_lock_wait() {
    let registry = fleet();
    registry.hold_lock("runlist:default", "other-process");
    let flow = coordinator(registry, ScriptedTransport::accepting())
        .with_lock_wait(Duration::from_secs(1));

    let err = flow
        .deploy(&alice(), "default", "svc", "default", None)
        .await
        .unwrap_err();

    assert!(matches!(&err, DeployError::RunlistBusy(name) if name == "default"), "{err:?}");
    assert_eq!(err.code(), "runlist_busy");
    assert_eq!(err.status_code(), 409);
    assert!(flow.registry().writes().is_empty());
    assert_eq!(flow.dispatcher().transport().call_count(), 0);
    assert_eq!(flow.registry().held_locks(), vec!["runlist:default"]);
}

#[tokio::test(start_paused = true)]
async fn other_runlists_are_not_blocked() {
    let registry = fleet();
    registry.hold_lock("runlist:staging", "other-process");
    let flow = coordinator(registry, ScriptedTransport::accepting())
        .with_lock_wait(Duration::from_secs(1));

    flow.deploy(&alice(), "default", "svc", "default", None)
        .await
        .unwrap();

    assert_eq!(flow.registry().held_locks(), vec!["runlist:staging"]);
}

#[tokio::test]
async fn lock_is_released_on_success_and_failure() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());
    flow.deploy(&alice(), "default", "svc", "default", None)
        .await
        .unwrap();
    assert!(flow.registry().held_locks().is_empty());

    flow.deploy(&alice(), "default", "ghost", "default", None)
        .await
        .unwrap_err();
    assert!(flow.registry().held_locks().is_empty());

    flow.undeploy(&bob(), "default", "svc").await.unwrap_err();
    assert!(flow.registry().held_locks().is_empty());
}

// ── Delete ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deployed_app_cannot_be_deleted() {
    let flow = coordinator(deployed_fleet(), ScriptedTransport::accepting());

    let err = flow.delete_app(&alice(), "svc").await.unwrap_err();

    assert!(
        matches!(&err, DeployError::StillDeployed { runlist, .. } if runlist == "default"),
        "{err:?}"
    );
    assert!(flow.registry().manifest("svc").is_some());
    assert!(flow.registry().writes().is_empty());
}

#[tokio::test]
async fn undeployed_app_is_deleted_with_payload() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());

    flow.delete_app(&alice(), "svc").await.unwrap();

    let state = flow.registry().snapshot();
    assert!(!state.manifests.contains_key("svc"));
    assert!(!state.apps.contains_key("svc"));
    assert_eq!(flow.registry().writes(), vec!["delete_app:svc"]);
}

#[tokio::test]
async fn delete_by_other_developer_is_forbidden() {
    let flow = coordinator(fleet(), ScriptedTransport::accepting());
    let err = flow.delete_app(&bob(), "svc").await.unwrap_err();
    assert!(matches!(err, DeployError::Forbidden(_)), "{err:?}");
    assert!(flow.registry().manifest("svc").is_some());
}
