//! Machine-readable error codes reported in JSON mode.

use anyhow::Context as _;
use flow_cli::cli::error_code;
use flow_cli::domain::error::{
    BuildError, ConfigError, DeployError, ProfileError, RegistryError, UploadError,
};

#[test]
fn typed_errors_map_to_their_codes() {
    let cases: Vec<(anyhow::Error, &str)> = vec![
        (DeployError::NoHosts.into(), "no_hosts"),
        (DeployError::RunlistBusy("default".to_string()).into(), "runlist_busy"),
        (
            DeployError::StillDeployed {
                uuid: "svc".to_string(),
                runlist: "default".to_string(),
            }
            .into(),
            "still_deployed",
        ),
        (BuildError::MissingManifest("info.yaml".to_string()).into(), "missing_manifest"),
        (UploadError::Conflict { uuid: "svc".to_string() }.into(), "conflict"),
        (RegistryError::Unavailable("refused".to_string()).into(), "storage_failure"),
        (ProfileError::UnknownOption("x".to_string()).into(), "unknown_option"),
        (
            ConfigError::UnknownKey {
                key: "a.b".to_string(),
                valid: String::new(),
            }
            .into(),
            "unknown_setting",
        ),
        (anyhow::anyhow!("plain failure"), "error"),
    ];
    for (err, code) in cases {
        assert_eq!(error_code(&err), code, "{err:#}");
    }
}

#[test]
fn context_does_not_hide_the_code() {
    let err = Err::<(), _>(DeployError::Forbidden("svc".to_string()))
        .context("deploying svc")
        .unwrap_err();
    assert_eq!(error_code(&err), "forbidden");
}

#[test]
fn registry_errors_inside_deploy_keep_storage_code() {
    let err: anyhow::Error = DeployError::Registry(RegistryError::NotFound("profile x".to_string())).into();
    assert_eq!(error_code(&err), "not_found");
}
