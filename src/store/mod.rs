pub mod pending;
pub mod response;
pub mod session;

pub use pending::*;
pub use response::*;
pub use session::*;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::error::{Result, TraybridgeError};

/// Identifiers used as path components must match this before any path is
/// built from them. Rejects traversal sequences, separators and empty ids.
static SAFE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").unwrap());

pub fn is_safe_id(value: &str) -> bool {
    SAFE_ID.is_match(value)
}

pub fn validate_id(value: &str) -> Result<()> {
    if is_safe_id(value) {
        Ok(())
    } else {
        Err(TraybridgeError::UnsafeId {
            value: value.to_string(),
        })
    }
}

/// The shared directory tree. All components read and write through this
/// layout contract:
///
/// ```text
/// root/
///   sessions/<session_id>/info.json
///   sessions/<session_id>/pending/<request_id>.json
///   responses/<request_id>.json
///   config.json
/// ```
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.root.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn responses_dir(&self) -> PathBuf {
        self.root.join("responses")
    }

    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf> {
        validate_id(session_id)?;
        Ok(self.sessions_dir().join(session_id))
    }

    pub fn info_path(&self, session_id: &str) -> Result<PathBuf> {
        Ok(self.session_dir(session_id)?.join("info.json"))
    }

    pub fn pending_dir(&self, session_id: &str) -> Result<PathBuf> {
        Ok(self.session_dir(session_id)?.join("pending"))
    }

    pub fn pending_path(&self, session_id: &str, request_id: &str) -> Result<PathBuf> {
        validate_id(request_id)?;
        Ok(self.pending_dir(session_id)?.join(format!("{request_id}.json")))
    }

    pub fn response_path(&self, request_id: &str) -> Result<PathBuf> {
        validate_id(request_id)?;
        Ok(self.responses_dir().join(format!("{request_id}.json")))
    }

    /// Create the root tree with owner-only permissions.
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [&self.root, &self.sessions_dir(), &self.responses_dir()] {
            fs::create_dir_all(dir)?;
            set_dir_permissions_0700(dir);
        }
        Ok(())
    }

    /// Session ids currently present on disk, unsafe names skipped.
    pub fn list_session_ids(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.sessions_dir()) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| is_safe_id(name))
            .collect();
        ids.sort();
        ids
    }

    /// Remove one session's subtree. Refuses to follow symlinks; errors are
    /// swallowed because another process may be tearing it down concurrently.
    pub fn remove_session_subtree(&self, session_id: &str) {
        let Ok(dir) = self.session_dir(session_id) else {
            return;
        };
        remove_subtree(&dir);
    }
}

/// Remove a directory tree, unlinking instead of following a symlink.
pub(crate) fn remove_subtree(path: &Path) {
    if path.is_symlink() {
        let _ = fs::remove_file(path);
    } else {
        let _ = fs::remove_dir_all(path);
    }
}

/// Write a JSON record via a uniquely-named temp file in the same directory,
/// then atomically rename into place. A reader never observes a partial
/// record: visibility implies fully written.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().ok_or_else(|| TraybridgeError::StateDir {
        reason: format!("{} has no parent directory", path.display()),
    })?;
    fs::create_dir_all(parent)?;

    let json = serde_json::to_vec(value)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    set_file_permissions_0600(path);
    Ok(())
}

/// Read a JSON record. Missing file is `Ok(None)`; an unreadable or
/// malformed file is an error so callers can decide between "treat as
/// absent" and "garbage-collect".
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| TraybridgeError::MalformedRecord {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Remove a file, ignoring the case where another process already removed it.
pub fn remove_file_quiet(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!("could not remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(unix)]
fn set_file_permissions_0600(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
}

#[cfg(not(unix))]
fn set_file_permissions_0600(_path: &Path) {}

#[cfg(unix)]
fn set_dir_permissions_0700(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn set_dir_permissions_0700(_path: &Path) {}
