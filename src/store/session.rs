use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{atomic_write_json, read_json, StateDir};

/// Where a session's status currently stands. The on-disk record is the
/// single source of truth; derived display state is layered on top and never
/// written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Working,
    Question,
    Permission,
    Done,
    Idle,
}

impl SessionStatus {
    /// An interactive prompt is on screen (terminal dialog or tray entry).
    pub fn is_interactive(self) -> bool {
        matches!(self, SessionStatus::Question | SessionStatus::Permission)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Working => write!(f, "working"),
            SessionStatus::Question => write!(f, "question"),
            SessionStatus::Permission => write!(f, "permission"),
            SessionStatus::Done => write!(f, "done"),
            SessionStatus::Idle => write!(f, "idle"),
        }
    }
}

/// Context the session runs in, decided at session start and immutable after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Terminal,
    Vscode,
}

/// One tracked session: `sessions/<session_id>/info.json`.
///
/// Unknown fields written by collaborators are ignored on read; absent
/// optional fields get defaults, so records from older writers still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub project_name: String,
    /// Pid whose liveness governs this session's existence.
    #[serde(default, alias = "parent_pid")]
    pub owner_pid: Option<u32>,
    /// Start-time fingerprint of `owner_pid`, when the platform provides one.
    /// Guards the liveness check against pid reuse.
    #[serde(default)]
    pub owner_started_at: Option<u64>,
    #[serde(default, alias = "client")]
    pub client_kind: Option<ClientKind>,
    pub status: SessionStatus,
    #[serde(default)]
    pub waiting_for: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl SessionInfo {
    pub fn new(session_id: &str, cwd: &str, owner_pid: Option<u32>) -> Self {
        let project_name = std::path::Path::new(cwd)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".into());
        Self {
            session_id: session_id.to_string(),
            cwd: cwd.to_string(),
            project_name,
            owner_pid,
            owner_started_at: None,
            client_kind: None,
            status: SessionStatus::Working,
            waiting_for: None,
            last_updated: Utc::now(),
        }
    }
}

/// Load one session record. Missing file is `None`; a malformed record is an
/// error (the responder's GC removes those, producers treat them as absent).
pub fn load_session(state: &StateDir, session_id: &str) -> Result<Option<SessionInfo>> {
    read_json(&state.info_path(session_id)?)
}

pub fn save_session(state: &StateDir, info: &SessionInfo) -> Result<()> {
    atomic_write_json(&state.info_path(&info.session_id)?, info)
}

/// Read-modify-write one session record. There is no cross-process lock;
/// last write wins, and the precondition closures below keep the races that
/// matter order-independent. Every successful mutation bumps `last_updated`.
///
/// Returns `Ok(false)` when the record does not exist or the mutation
/// declined to apply.
pub fn update_session<F>(state: &StateDir, session_id: &str, mutate: F) -> Result<bool>
where
    F: FnOnce(&mut SessionInfo) -> bool,
{
    let Some(mut info) = load_session(state, session_id)? else {
        return Ok(false);
    };
    if !mutate(&mut info) {
        return Ok(false);
    }
    info.last_updated = Utc::now();
    save_session(state, &info)?;
    Ok(true)
}

/// Transition: a permission request was raised.
pub fn raise_permission(state: &StateDir, session_id: &str) -> Result<bool> {
    update_session(state, session_id, |info| {
        if info.status == SessionStatus::Done {
            return false;
        }
        info.status = SessionStatus::Permission;
        info.waiting_for = Some("permission".into());
        true
    })
}

/// Transition: an elicitation (question) request was raised.
pub fn raise_question(state: &StateDir, session_id: &str) -> Result<bool> {
    update_session(state, session_id, |info| {
        info.status = SessionStatus::Question;
        info.waiting_for = Some("elicitation".into());
        true
    })
}

/// Transition: a request was resolved or cancelled, or a new prompt started.
/// Unconditional reset to `working`.
pub fn settle_to_working(state: &StateDir, session_id: &str) -> Result<bool> {
    update_session(state, session_id, |info| {
        info.status = SessionStatus::Working;
        info.waiting_for = None;
        true
    })
}

/// Transition: generic tool activity observed. Only downgrades an interactive
/// prompt back to `working`; never touches a `done`/`idle` it didn't cause,
/// and never races ahead of a just-raised request.
pub fn downgrade_after_activity(state: &StateDir, session_id: &str) -> Result<bool> {
    update_session(state, session_id, |info| {
        if !info.status.is_interactive() {
            return false;
        }
        info.status = SessionStatus::Working;
        info.waiting_for = None;
        true
    })
}

/// Transition: the session's turn finished.
pub fn mark_done(state: &StateDir, session_id: &str) -> Result<bool> {
    update_session(state, session_id, |info| {
        info.status = SessionStatus::Done;
        info.waiting_for = Some("input".into());
        true
    })
}

/// Transition: an out-of-band notification arrived. Does not clobber an
/// active interactive prompt unless the notification itself is about one.
pub fn mark_notified(
    state: &StateDir,
    session_id: &str,
    status: SessionStatus,
    waiting_for: &str,
) -> Result<bool> {
    let waiting = waiting_for.to_string();
    update_session(state, session_id, move |info| {
        if info.status.is_interactive() && !status.is_interactive() {
            return false;
        }
        info.status = status;
        info.waiting_for = Some(waiting);
        true
    })
}
