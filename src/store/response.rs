use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{atomic_write_json, read_json, remove_file_quiet, StateDir};

/// The human's verdict on a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    Allow,
    AlwaysAllow,
    Deny,
}

impl PermissionDecision {
    /// The normalized value the hook contract understands. `always_allow`
    /// collapses to `allow`; the stronger intent only matters to the tray.
    pub fn as_hook_decision(self) -> &'static str {
        match self {
            PermissionDecision::Allow | PermissionDecision::AlwaysAllow => "allow",
            PermissionDecision::Deny => "deny",
        }
    }
}

impl std::fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionDecision::Allow => write!(f, "allow"),
            PermissionDecision::AlwaysAllow => write!(f, "always_allow"),
            PermissionDecision::Deny => write!(f, "deny"),
        }
    }
}

/// The answer to exactly one pending request: `responses/<id>.json`.
/// Written by the responder, consumed and deleted by the producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    /// Permission requests: the decision value.
    #[serde(default)]
    pub decision: Option<PermissionDecision>,
    /// Elicitation requests: question index (as string key) to the chosen
    /// option label. Built up incrementally, one answer per write.
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

/// Write a complete permission decision for a request.
pub fn write_decision(
    state: &StateDir,
    request_id: &str,
    decision: PermissionDecision,
) -> Result<()> {
    let response = Response {
        id: request_id.to_string(),
        decision: Some(decision),
        answers: BTreeMap::new(),
        timestamp: Utc::now(),
    };
    atomic_write_json(&state.response_path(request_id)?, &response)
}

/// Merge one elicitation answer into the response for `request_id`.
/// Answers already recorded for other question indices are kept; answering
/// the same index again replaces the earlier choice.
pub fn merge_answer(
    state: &StateDir,
    request_id: &str,
    question_index: usize,
    selected: &str,
) -> Result<()> {
    let path = state.response_path(request_id)?;
    let mut answers = match read_json::<Response>(&path) {
        Ok(Some(existing)) => existing.answers,
        _ => BTreeMap::new(),
    };
    answers.insert(question_index.to_string(), selected.to_string());

    let response = Response {
        id: request_id.to_string(),
        decision: None,
        answers,
        timestamp: Utc::now(),
    };
    atomic_write_json(&path, &response)
}

/// Read the response for a request, if one has been fully written.
/// A file caught mid-write reads as malformed and surfaces as an error;
/// the polling producer treats that as "not present yet".
pub fn read_response(state: &StateDir, request_id: &str) -> Result<Option<Response>> {
    read_json(&state.response_path(request_id)?)
}

pub fn remove_response(state: &StateDir, request_id: &str) {
    if let Ok(path) = state.response_path(request_id) {
        remove_file_quiet(&path);
    }
}
