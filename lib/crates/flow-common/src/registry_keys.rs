/// Registry key prefixes
pub mod keys {
    /// Packaged app payloads
    /// Format: flow:apps:{uuid}
    /// Value: gzip-compressed tar bytes
    pub const APPS: &str = "flow:apps";

    /// App manifests
    /// Format: flow:manifests:{uuid}
    /// Value: JSON-serialized Manifest
    pub const MANIFESTS: &str = "flow:manifests";

    /// Runlists (desired state per deployment group)
    /// Format: flow:runlists:{name}
    /// Value: JSON object uuid → profile name
    pub const RUNLISTS: &str = "flow:runlists";

    /// Runtime profiles
    /// Format: flow:profiles:{name}
    /// Value: JSON object of profile options
    pub const PROFILES: &str = "flow:profiles";

    /// Worker host roster
    /// Format: flow:hosts:{alias}
    /// Value: set of host addresses
    pub const HOSTS: &str = "flow:hosts";

    /// Operator records
    /// Format: flow:users:{username}
    /// Value: JSON-serialized User
    pub const USERS: &str = "flow:users";

    /// Token index
    /// Format: flow:tokens:{token}
    /// Value: username
    pub const TOKENS: &str = "flow:tokens";

    /// Advisory locks held by a coordinator
    /// Format: flow:locks:{resource}
    /// Value: holder token, with an expiry
    pub const LOCKS: &str = "flow:locks";
}

pub fn app_key(uuid: &str) -> String {
    format!("{}:{}", keys::APPS, uuid)
}

pub fn manifest_key(uuid: &str) -> String {
    format!("{}:{}", keys::MANIFESTS, uuid)
}

pub fn runlist_key(name: &str) -> String {
    format!("{}:{}", keys::RUNLISTS, name)
}

pub fn profile_key(name: &str) -> String {
    format!("{}:{}", keys::PROFILES, name)
}

pub fn hosts_key(alias: &str) -> String {
    format!("{}:{}", keys::HOSTS, alias)
}

pub fn user_key(username: &str) -> String {
    format!("{}:{}", keys::USERS, username)
}

pub fn token_key(token: &str) -> String {
    format!("{}:{}", keys::TOKENS, token)
}

pub fn lock_key(resource: &str) -> String {
    format!("{}:{}", keys::LOCKS, resource)
}

/// Lock resource name guarding one runlist.
pub fn runlist_lock(name: &str) -> String {
    format!("runlist:{name}")
}

/// `SCAN MATCH` pattern covering every key under `prefix`.
pub fn scan_pattern(prefix: &str) -> String {
    format!("{prefix}:*")
}

/// Strip `prefix:` from a scanned key, returning the entity name.
pub fn strip_prefix<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix)?.strip_prefix(':')
}

/// Validate a name before it is embedded in a registry key.
/// Returns Ok(()) if valid, Err with description if invalid.
/// Rejects empty names, glob characters that would widen a SCAN, and
/// whitespace/control characters.
pub fn validate_key_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("name must not be empty");
    }
    if segment.len() > 256 {
        return Err("name must be at most 256 characters");
    }
    if segment
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '*' | '?' | '[' | ']'))
    {
        return Err("name must not contain whitespace, control or glob characters");
    }
    Ok(())
}
