//! Valkey/Redis implementation of the `Registry` port.
//!
//! Namespace iteration uses `SCAN` with `MATCH`/`COUNT`, never `KEYS`.
//! Values are JSON strings except app payloads (raw bytes) and host
//! rosters (sets of addresses).

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use flow_common::{
    HostSet, Manifest, Profile, Runlist, User, app_key, hosts_key, keys, lock_key, manifest_key,
    profile_key, runlist_key, scan_pattern, strip_prefix, token_key, user_key,
    validate_key_segment,
};
use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::Registry;
use crate::domain::error::RegistryError;

/// Registry backed by a multiplexed Valkey connection.
///
/// The connection is `Clone`; each operation clones it and shares the
/// same underlying socket.
#[derive(Clone)]
pub struct ValkeyRegistry {
    conn: redis::aio::MultiplexedConnection,
}

impl ValkeyRegistry {
    /// Connect to `url` and verify the connection with `PING`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unavailable`] if the url is invalid or the
    /// server cannot be reached.
    pub async fn connect(url: &str) -> Result<Self, RegistryError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(unavailable)?;
        tracing::debug!(url = %redact_url(url), "registry connection ready");
        Ok(Self { conn })
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RegistryError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.map_err(unavailable)?;
        raw.map(|json| decode(key, &json)).transpose()
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), RegistryError> {
        let json = serde_json::to_string(value).map_err(|e| RegistryError::Corrupt {
            key: key.to_string(),
            detail: e.to_string(),
        })?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, json).await.map_err(unavailable)
    }

    /// Every JSON value under `prefix`, keyed by entity name.
    async fn read_namespace<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, T>, RegistryError> {
        let matched = self.scan_keys(&scan_pattern(prefix)).await?;
        if matched.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut pipe = redis::pipe();
        for key in &matched {
            pipe.cmd("GET").arg(key);
        }
        let mut conn = self.conn.clone();
        let raw_values: Vec<Option<String>> =
            pipe.query_async(&mut conn).await.map_err(unavailable)?;

        let mut out = BTreeMap::new();
        for (key, maybe_json) in matched.iter().zip(raw_values) {
            let (Some(name), Some(json)) = (strip_prefix(prefix, key), maybe_json) else {
                continue;
            };
            out.insert(name.to_string(), decode(key, &json)?);
        }
        Ok(out)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, RegistryError> {
        let mut conn = self.conn.clone();
        let mut all_keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;

            all_keys.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        all_keys.sort();
        all_keys.dedup();
        Ok(all_keys)
    }
}

impl Registry for ValkeyRegistry {
    async fn read_manifest(&self, uuid: &str) -> Result<Option<Manifest>, RegistryError> {
        checked(uuid)?;
        self.get_json(&manifest_key(uuid)).await
    }

    async fn write_manifest(&self, uuid: &str, manifest: &Manifest) -> Result<(), RegistryError> {
        checked(uuid)?;
        self.set_json(&manifest_key(uuid), manifest).await
    }

    async fn read_manifests(&self) -> Result<Vec<Manifest>, RegistryError> {
        let all: BTreeMap<String, Manifest> = self.read_namespace(keys::MANIFESTS).await?;
        Ok(all.into_values().collect())
    }

    async fn delete_app(&self, uuid: &str) -> Result<(), RegistryError> {
        checked(uuid)?;
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .del(app_key(uuid))
            .ignore()
            .del(manifest_key(uuid))
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn save_app_payload(&self, uuid: &str, payload: &[u8]) -> Result<(), RegistryError> {
        checked(uuid)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(app_key(uuid), payload)
            .await
            .map_err(unavailable)
    }

    async fn read_runlist(&self, name: &str) -> Result<Runlist, RegistryError> {
        checked(name)?;
        Ok(self.get_json(&runlist_key(name)).await?.unwrap_or_default())
    }

    async fn write_runlist(&self, name: &str, runlist: &Runlist) -> Result<(), RegistryError> {
        checked(name)?;
        self.set_json(&runlist_key(name), runlist).await
    }

    async fn read_runlists(&self) -> Result<BTreeMap<String, Runlist>, RegistryError> {
        self.read_namespace(keys::RUNLISTS).await
    }

    async fn read_profile(&self, name: &str) -> Result<Option<Profile>, RegistryError> {
        checked(name)?;
        self.get_json(&profile_key(name)).await
    }

    async fn write_profile(&self, name: &str, profile: &Profile) -> Result<(), RegistryError> {
        checked(name)?;
        self.set_json(&profile_key(name), profile).await
    }

    async fn read_profiles(&self) -> Result<BTreeMap<String, Profile>, RegistryError> {
        self.read_namespace(keys::PROFILES).await
    }

    async fn read_hosts(&self) -> Result<HostSet, RegistryError> {
        let matched = self.scan_keys(&scan_pattern(keys::HOSTS)).await?;
        let mut conn = self.conn.clone();
        let mut hosts = HostSet::default();
        for key in &matched {
            let Some(alias) = strip_prefix(keys::HOSTS, key) else {
                continue;
            };
            let members: BTreeSet<String> = conn.smembers(key).await.map_err(unavailable)?;
            for host in members {
                hosts.insert(alias, &host);
            }
        }
        Ok(hosts)
    }

    async fn add_host(&self, alias: &str, host: &str) -> Result<(), RegistryError> {
        checked(alias)?;
        checked(host)?;
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(hosts_key(alias), host)
            .await
            .map_err(unavailable)
    }

    async fn remove_host(&self, alias: &str, host: &str) -> Result<bool, RegistryError> {
        checked(alias)?;
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .srem(hosts_key(alias), host)
            .await
            .map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn create_user(&self, user: &User) -> Result<bool, RegistryError> {
        checked(&user.username)?;
        checked(&user.token)?;
        let json = serde_json::to_string(user).map_err(|e| RegistryError::Corrupt {
            key: user_key(&user.username),
            detail: e.to_string(),
        })?;
        let script = redis::Script::new(
            r"
            if redis.call('SET', KEYS[1], ARGV[1], 'NX') then
                redis.call('SET', KEYS[2], ARGV[2])
                return 1
            end
            return 0
            ",
        );
        let mut conn = self.conn.clone();
        let created: i64 = script
            .key(user_key(&user.username))
            .key(token_key(&user.token))
            .arg(json)
            .arg(&user.username)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(created == 1)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RegistryError> {
        if validate_key_segment(username).is_err() {
            return Ok(None);
        }
        self.get_json(&user_key(username)).await
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, RegistryError> {
        if validate_key_segment(token).is_err() {
            return Ok(None);
        }
        let mut conn = self.conn.clone();
        let username: Option<String> = conn.get(token_key(token)).await.map_err(unavailable)?;
        match username {
            Some(username) => Ok(self
                .find_user_by_username(&username)
                .await?
                .filter(|user| user.token == token)),
            None => Ok(None),
        }
    }

    async fn try_lock(
        &self,
        resource: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, RegistryError> {
        checked(resource)?;
        let mut conn = self.conn.clone();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(lock_key(resource))
            .arg(holder)
            .arg("NX")
            .arg("PX")
            .arg(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(acquired.is_some())
    }

    async fn unlock(&self, resource: &str, holder: &str) -> Result<(), RegistryError> {
        let script = redis::Script::new(
            r"
            if redis.call('GET', KEYS[1]) == ARGV[1] then
                return redis.call('DEL', KEYS[1])
            end
            return 0
            ",
        );
        let mut conn = self.conn.clone();
        let released: i64 = script
            .key(lock_key(resource))
            .arg(holder)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        if released == 0 {
            tracing::warn!(%resource, "lock expired before release");
        }
        Ok(())
    }
}

fn checked(name: &str) -> Result<(), RegistryError> {
    validate_key_segment(name).map_err(|reason| RegistryError::InvalidKey {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

fn decode<T: DeserializeOwned>(key: &str, json: &str) -> Result<T, RegistryError> {
    serde_json::from_str(json).map_err(|e| RegistryError::Corrupt {
        key: key.to_string(),
        detail: e.to_string(),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn unavailable(err: redis::RedisError) -> RegistryError {
    RegistryError::Unavailable(err.to_string())
}

/// Hide any password embedded in a connection url before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
