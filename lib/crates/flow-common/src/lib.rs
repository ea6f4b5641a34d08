pub mod registry_keys;
pub mod rpc;
pub mod types;

pub use registry_keys::{
    app_key, hosts_key, keys, lock_key, manifest_key, profile_key, runlist_key, runlist_lock,
    scan_pattern, strip_prefix, token_key, user_key, validate_key_segment,
};
pub use rpc::{FleetCommand, HostReply, RpcCall};
pub use types::*;
