//! Shared test helpers: output constructors and fixture builders.

#![allow(dead_code)]

use std::process::{ExitStatus, Output};

use flow_common::{Manifest, PackageInfo, RuntimeKind, User};

// ── Cross-platform ExitStatus construction ───────────────────────────────────

/// Build an `ExitStatus` from a logical exit code (0 = success, non-zero = failure).
///
/// On Unix the raw wait-status encodes the exit code in bits 8–15, so we shift.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    ExitStatus::from_raw(code as u32)
}

// ── Output constructors ──────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub const ALICE_TOKEN: &str = "tok-alice";
pub const BOB_TOKEN: &str = "tok-bob";
pub const ADMIN_TOKEN: &str = "tok-root";

pub fn alice() -> User {
    User {
        username: "alice".to_string(),
        token: ALICE_TOKEN.to_string(),
        admin: false,
    }
}

pub fn bob() -> User {
    User {
        username: "bob".to_string(),
        token: BOB_TOKEN.to_string(),
        admin: false,
    }
}

pub fn admin() -> User {
    User {
        username: "root".to_string(),
        token: ADMIN_TOKEN.to_string(),
        admin: true,
    }
}

pub fn package_info(name: &str) -> PackageInfo {
    PackageInfo {
        runtime: RuntimeKind::Python,
        name: name.to_string(),
        description: format!("{name} service"),
        dependencies: Vec::new(),
        runtime_version: None,
        changelog: Vec::new(),
        structure: vec!["main.py".to_string()],
        slave: None,
    }
}

/// An undeployed manifest owned by `developer`.
pub fn manifest(uuid: &str, developer: &str) -> Manifest {
    Manifest {
        info: package_info("svc"),
        uuid: uuid.to_string(),
        reference: "0123456789abcdef".to_string(),
        developer: developer.to_string(),
        runlist: None,
        url: None,
        sha256: None,
        uploaded_at: None,
    }
}
