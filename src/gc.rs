//! Garbage collection for the shared state tree.
//!
//! The responder is the only process allowed to delete entries belonging to
//! other processes, and only through the sweeps below. Every sweep isolates
//! per-session failures so one bad record never aborts a cycle, and every
//! sweep is best-effort: producers still clean up after themselves on every
//! exit path.

use chrono::Utc;

use crate::config::Config;
use crate::liveness::Liveness;
use crate::store::{
    self, is_safe_id, load_session, remove_subtree, RequestKind, SessionStatus, StateDir,
};

/// Remove sessions whose owner process no longer exists. A session without
/// a recorded owner pid cannot be liveness-checked and is removed too.
/// The pending subtree goes with the record.
pub fn sweep_dead_sessions(state: &StateDir, liveness: &dyn Liveness) -> usize {
    let mut removed = 0;
    for session_id in state.list_session_ids() {
        let info = match load_session(state, &session_id) {
            Ok(Some(info)) => info,
            // Missing or malformed records belong to the stale sweep.
            _ => continue,
        };
        let dead = match info.owner_pid {
            Some(pid) => !liveness.is_alive(pid, info.owner_started_at),
            None => true,
        };
        if dead {
            tracing::debug!(%session_id, "removing dead session");
            state.remove_session_subtree(&session_id);
            removed += 1;
        }
    }
    removed
}

/// Remove sessions older than the stale threshold regardless of liveness,
/// along with anything unreadable: unsafe directory names, symlinked
/// entries, missing or malformed records.
pub fn sweep_stale_sessions(state: &StateDir, config: &Config) -> usize {
    let Ok(entries) = std::fs::read_dir(state.sessions_dir()) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if !is_safe_id(&name) || path.is_symlink() {
            remove_subtree(&path);
            removed += 1;
            continue;
        }

        match load_session(state, &name) {
            Ok(Some(info)) => {
                let age = Utc::now().signed_duration_since(info.last_updated);
                if age.num_seconds() >= 0
                    && age.to_std().map_or(false, |a| a > config.stale_threshold)
                {
                    tracing::debug!(session_id = %name, "removing stale session");
                    remove_subtree(&path);
                    removed += 1;
                }
            }
            // No record, or one nothing can parse.
            _ => {
                remove_subtree(&path);
                removed += 1;
            }
        }
    }
    removed
}

/// Cosmetic sweep of orphaned pending requests: the producer crashed before
/// cleaning up, the session moved on without the standard cleanup event, or
/// the session is gone entirely.
pub fn sweep_stale_pending(state: &StateDir, liveness: &dyn Liveness) -> usize {
    let mut removed = 0;
    for session_id in state.list_session_ids() {
        let status = match load_session(state, &session_id) {
            Ok(Some(info)) => Some(info.status),
            _ => None,
        };

        for request in store::list_pending(state, &session_id) {
            let orphaned = match status {
                None => true,
                Some(status) => {
                    let producer_dead = request
                        .producer_pid
                        .map(|pid| !liveness.is_alive(pid, None))
                        .unwrap_or(false);
                    let status_mismatch = match request.kind {
                        RequestKind::Elicitation => status != SessionStatus::Question,
                        RequestKind::Permission => status != SessionStatus::Permission,
                    };
                    producer_dead || status_mismatch
                }
            };
            if orphaned {
                tracing::debug!(%session_id, request_id = %request.id, "removing orphaned pending request");
                store::remove_pending(state, &session_id, &request.id);
                removed += 1;
            }
        }
    }
    removed
}
