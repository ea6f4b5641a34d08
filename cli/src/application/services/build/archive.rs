//! In-memory gzip tar writer for build artifacts.
//!
//! The archive is assembled in memory so a failed build never leaves a
//! partial archive behind. Members are written in sorted order with
//! deterministic headers.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tokio::task::spawn_blocking;
use tracing::debug;

/// What to take from a checkout and where to put it.
#[derive(Debug, Clone, Default)]
pub struct ArchiveLayout {
    /// Root-level entries left out of the archive.
    pub excluded: BTreeSet<String>,
    /// Root-level directory whose contents are placed at the archive root
    /// instead of under its own name.
    pub hoisted: Option<String>,
}

/// A finished archive.
#[derive(Debug, Clone)]
pub struct PackedArchive {
    pub bytes: Vec<u8>,
    /// Member paths in archive order; directories end with `/`.
    pub members: Vec<String>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
}

/// Pack `root` according to `layout`.
///
/// # Errors
///
/// Returns an I/O error if the tree cannot be read or the archive cannot
/// be encoded.
pub async fn pack_directory(root: &Path, layout: ArchiveLayout) -> std::io::Result<PackedArchive> {
    let root = root.to_owned();
    spawn_blocking(move || pack_directory_sync(&root, &layout))
        .await
        .map_err(std::io::Error::other)?
}

/// List member paths of a gzip tar payload; directories end with `/`.
///
/// # Errors
///
/// Returns an I/O error if the payload is not a readable gzip tar.
pub fn list_archive_members(payload: &[u8]) -> std::io::Result<Vec<String>> {
    let mut archive = tar::Archive::new(GzDecoder::new(Cursor::new(payload)));
    let mut members = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        let mut name = entry.path()?.to_string_lossy().into_owned();
        if entry.header().entry_type().is_dir() && !name.ends_with('/') {
            name.push('/');
        }
        members.push(name);
    }
    Ok(members)
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn pack_directory_sync(root: &Path, layout: &ArchiveLayout) -> std::io::Result<PackedArchive> {
    let entries = collect_entries(root, layout)?;

    let mut tar_data = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar_data);
        builder.follow_symlinks(false);
        builder.mode(tar::HeaderMode::Deterministic);
        for (name, path) in &entries {
            let meta = std::fs::symlink_metadata(path)?;
            if meta.is_dir() {
                builder.append_dir(name.trim_end_matches('/'), path)?;
            } else {
                builder.append_path_with_name(path, name)?;
            }
        }
        builder.finish()?;
    }
    debug!(uncompressed_size = tar_data.len(), members = entries.len(), "created tar archive");

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_data)?;
    let bytes = encoder.finish()?;
    debug!(compressed_size = bytes.len(), "compressed tar archive");

    Ok(PackedArchive {
        sha256: sha256_hex(&bytes),
        members: entries.into_keys().collect(),
        bytes,
    })
}

/// Member name -> source path. Source tree entries win over hoisted ones.
fn collect_entries(root: &Path, layout: &ArchiveLayout) -> std::io::Result<BTreeMap<String, PathBuf>> {
    let mut entries = BTreeMap::new();

    for child in sorted_children(root)? {
        let name = file_name(&child);
        if layout.excluded.contains(&name) || layout.hoisted.as_deref() == Some(name.as_str()) {
            continue;
        }
        walk(&child, &name, &mut entries)?;
    }

    if let Some(hoisted) = &layout.hoisted {
        let dir = root.join(hoisted);
        if dir.is_dir() {
            let mut extra = BTreeMap::new();
            for child in sorted_children(&dir)? {
                walk(&child, &file_name(&child), &mut extra)?;
            }
            for (name, path) in extra {
                entries.entry(name).or_insert(path);
            }
        }
    }
    Ok(entries)
}

fn walk(path: &Path, name: &str, out: &mut BTreeMap<String, PathBuf>) -> std::io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        out.insert(format!("{name}/"), path.to_owned());
        for child in sorted_children(path)? {
            let child_name = format!("{name}/{}", file_name(&child));
            walk(&child, &child_name, out)?;
        }
    } else {
        out.insert(name.to_string(), path.to_owned());
    }
    Ok(())
}

fn sorted_children(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut children = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    children.sort();
    Ok(children)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read a single member's contents. Test helper for archive assertions.
#[cfg(test)]
fn read_member(payload: &[u8], wanted: &str) -> Option<String> {
    use std::io::Read;
    let mut archive = tar::Archive::new(GzDecoder::new(Cursor::new(payload)));
    for entry in archive.entries().ok()? {
        let mut entry = entry.ok()?;
        if entry.path().ok()?.to_string_lossy() == wanted {
            let mut body = String::new();
            entry.read_to_string(&mut body).ok()?;
            return Some(body);
        }
    }
    None
}
