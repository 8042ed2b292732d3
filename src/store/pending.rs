use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{atomic_write_json, is_safe_id, read_json, remove_file_quiet, StateDir};

/// The two request shapes the protocol supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Binary/ternary tool-call decision.
    #[default]
    Permission,
    /// Multi-question multiple choice.
    Elicitation,
}

/// One question of an elicitation request, options in presentation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub index: usize,
    pub question: String,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// A decision or question awaiting a human response:
/// `sessions/<session_id>/pending/<id>.json`.
///
/// Presence on disk means "awaiting a human action"; absence means resolved
/// or abandoned. Exactly one file per id, in exactly one session's pending
/// set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: RequestKind,
    pub session_id: String,
    /// Pid of the blocking producer; absent for fire-and-forget requests.
    #[serde(default, alias = "pid")]
    pub producer_pid: Option<u32>,
    /// Permission payload: raw tool call plus a human-readable description.
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    /// Elicitation payload.
    #[serde(default)]
    pub questions: Vec<Question>,
    pub timestamp: DateTime<Utc>,
}

impl PendingRequest {
    pub fn permission(
        session_id: &str,
        tool_name: &str,
        tool_input: serde_json::Value,
        description: String,
        producer_pid: Option<u32>,
    ) -> Self {
        Self {
            id: new_request_id(),
            kind: RequestKind::Permission,
            session_id: session_id.to_string(),
            producer_pid,
            tool_name: Some(tool_name.to_string()),
            tool_input: Some(tool_input),
            description: Some(description),
            questions: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn elicitation(session_id: &str, questions: Vec<Question>, producer_pid: Option<u32>) -> Self {
        Self {
            id: new_request_id(),
            kind: RequestKind::Elicitation,
            session_id: session_id.to_string(),
            producer_pid,
            tool_name: None,
            tool_input: None,
            description: None,
            questions,
            timestamp: Utc::now(),
        }
    }
}

/// Random, globally unique, and safe as a path component.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn write_pending(state: &StateDir, request: &PendingRequest) -> Result<()> {
    let path = state.pending_path(&request.session_id, &request.id)?;
    atomic_write_json(&path, request)
}

pub fn remove_pending(state: &StateDir, session_id: &str, request_id: &str) {
    if let Ok(path) = state.pending_path(session_id, request_id) {
        remove_file_quiet(&path);
    }
}

/// All readable pending requests of one session. Malformed or mid-write
/// files are skipped, not errors; the next poll will see them complete.
pub fn list_pending(state: &StateDir, session_id: &str) -> Vec<PendingRequest> {
    let Ok(dir) = state.pending_dir(session_id) else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut requests = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match read_json::<PendingRequest>(&path) {
            Ok(Some(req)) if is_safe_id(&req.id) && req.session_id == session_id => {
                requests.push(req);
            }
            Ok(Some(req)) => {
                tracing::warn!(
                    "pending file {} disagrees with its location (id {:?})",
                    path.display(),
                    req.id
                );
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("skipping unreadable pending file: {}", e),
        }
    }
    requests.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    requests
}

/// Pending requests across every session on disk.
pub fn list_all_pending(state: &StateDir) -> Vec<PendingRequest> {
    state
        .list_session_ids()
        .iter()
        .flat_map(|id| list_pending(state, id))
        .collect()
}
