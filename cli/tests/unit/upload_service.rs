//! Manifest registration tests.

#![allow(clippy::unwrap_used)]

use flow_cli::application::services::build::Artifact;
use flow_cli::application::services::upload::register;
use flow_cli::domain::error::{RegistryError, UploadError};

use crate::helpers::{ADMIN_TOKEN, ALICE_TOKEN, admin, alice, bob, manifest, package_info};
use crate::mocks::MemoryRegistry;

fn artifact(reference: &str) -> Artifact {
    Artifact {
        payload: b"archive bytes".to_vec(),
        info: package_info("svc"),
        reference: reference.to_string(),
        source_url: Some("git://example.org/svc.git".to_string()),
        sha256: "ab".repeat(32),
    }
}

#[tokio::test]
async fn uuid_is_derived_from_name_user_and_ref() {
    let registry = MemoryRegistry::default();
    let uuid = register(&registry, artifact("abc123"), &alice(), None)
        .await
        .unwrap();

    assert_eq!(uuid, "svc.alice_abc123");
    let stored = registry.manifest(&uuid).unwrap();
    assert_eq!(stored.developer, ALICE_TOKEN);
    assert_eq!(stored.reference, "abc123");
    assert_eq!(stored.url.as_deref(), Some("git://example.org/svc.git"));
    assert_eq!(stored.sha256.as_deref(), Some("ab".repeat(32).as_str()));
    assert!(stored.uploaded_at.is_some());
    assert!(stored.runlist.is_none());
}

#[tokio::test]
async fn payload_is_written_before_manifest() {
    let registry = MemoryRegistry::default();
    register(&registry, artifact("abc123"), &alice(), None)
        .await
        .unwrap();

    assert_eq!(
        registry.writes(),
        vec![
            "save_app_payload:svc.alice_abc123",
            "write_manifest:svc.alice_abc123"
        ]
    );
    assert_eq!(
        registry.snapshot().apps["svc.alice_abc123"],
        b"archive bytes".to_vec()
    );
}

#[tokio::test]
async fn explicit_name_replaces_derived_uuid() {
    let registry = MemoryRegistry::default();
    let uuid = register(&registry, artifact("abc123"), &alice(), Some(" web-v2 "))
        .await
        .unwrap();
    assert_eq!(uuid, "web-v2");
    assert!(registry.manifest("web-v2").is_some());
}

#[tokio::test]
async fn invalid_explicit_name_writes_nothing() {
    let registry = MemoryRegistry::default();
    let err = register(&registry, artifact("abc123"), &alice(), Some("no/slashes"))
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::InvalidName { .. }), "{err:?}");
    assert!(registry.writes().is_empty());
}

#[tokio::test]
async fn foreign_uuid_is_a_conflict() {
    let registry = MemoryRegistry::default();
    registry.seed_manifest(manifest("web", ALICE_TOKEN));

    let err = register(&registry, artifact("abc123"), &bob(), Some("web"))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Conflict { ref uuid } if uuid == "web"), "{err:?}");
    assert_eq!(err.status_code(), 409);
    assert!(registry.writes().is_empty());
    assert_eq!(registry.manifest("web").unwrap().reference, "0123456789abcdef");
}

#[tokio::test]
async fn reupload_keeps_runlist() {
    let registry = MemoryRegistry::default();
    let mut deployed = manifest("web", ALICE_TOKEN);
    deployed.runlist = Some("default".to_string());
    registry.seed_manifest(deployed);

    register(&registry, artifact("fedcba"), &alice(), Some("web"))
        .await
        .unwrap();

    let stored = registry.manifest("web").unwrap();
    assert_eq!(stored.reference, "fedcba");
    assert_eq!(stored.runlist.as_deref(), Some("default"));
}

#[tokio::test]
async fn admin_reupload_keeps_original_developer() {
    let registry = MemoryRegistry::default();
    registry.seed_manifest(manifest("web", ALICE_TOKEN));

    register(&registry, artifact("fedcba"), &admin(), Some("web"))
        .await
        .unwrap();

    let stored = registry.manifest("web").unwrap();
    assert_eq!(stored.developer, ALICE_TOKEN);
    assert_ne!(stored.developer, ADMIN_TOKEN);
}

#[tokio::test]
async fn storage_failure_is_surfaced() {
    let registry = MemoryRegistry::default();
    registry.down.store(true, std::sync::atomic::Ordering::SeqCst);

    let err = register(&registry, artifact("abc123"), &alice(), None)
        .await
        .unwrap_err();

    assert!(
        matches!(err, UploadError::Registry(RegistryError::Unavailable(_))),
        "{err:?}"
    );
    assert_eq!(err.code(), "storage_failure");
}
