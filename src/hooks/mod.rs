//! Hook entry points: the short-lived producers.
//!
//! Each hook reads one JSON document from stdin, acts on the state tree,
//! and reports back through its exit code (0 = proceed/handled, 1 = fall
//! back to native behavior), optionally emitting a single JSON document on
//! stdout. Protocol failures never escape as panics or nonzero noise; they
//! resolve to a clean outcome.

pub mod activity;
pub mod elicitation;
pub mod permission;
pub mod session;

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraybridgeError};

/// What the hook process tells its caller via exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Exit 0: handled (possibly with a decision document on stdout).
    Proceed,
    /// Exit 1: the caller should fall back to its native prompt.
    Fallback,
}

impl HookOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            HookOutcome::Proceed => 0,
            HookOutcome::Fallback => 1,
        }
    }
}

/// The document every hook receives on stdin. Field set is defined by the
/// external assistant; unknown fields are ignored and absent ones default,
/// so new hook-contract versions keep parsing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
    #[serde(default)]
    pub notification_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

/// Read and parse the hook document from stdin.
pub fn read_hook_input() -> Result<HookInput> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| TraybridgeError::HookInput {
            reason: format!("stdin read failed: {e}"),
        })?;
    serde_json::from_str(&raw).map_err(|e| TraybridgeError::HookInput {
        reason: format!("invalid hook JSON: {e}"),
    })
}

/// The single stdout document a deciding hook may emit, shaped for the
/// assistant's hook contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    hook_specific_output: HookSpecificOutput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HookSpecificOutput {
    hook_event_name: &'static str,
    permission_decision: &'static str,
    permission_decision_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_context: Option<String>,
}

impl HookOutput {
    /// A permission verdict for the PermissionRequest event.
    pub fn permission(decision: &'static str, reason: String) -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: "PermissionRequest",
                permission_decision: decision,
                permission_decision_reason: reason,
                additional_context: None,
            },
        }
    }

    /// A tray-answered question: deny the elicitation tool and hand the
    /// chosen answers back as additional context.
    pub fn question_answered(context: String) -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: "PreToolUse",
                permission_decision: "deny",
                permission_decision_reason: "User answered via traybridge tray".into(),
                additional_context: Some(context),
            },
        }
    }

    pub fn emit(&self) -> Result<()> {
        println!("{}", serde_json::to_string(self)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_input_tolerates_unknown_and_missing_fields() {
        let input: HookInput = serde_json::from_str(
            r#"{"session_id": "s1", "hook_event_name": "Stop", "transcript_path": "/x"}"#,
        )
        .unwrap();
        assert_eq!(input.session_id, "s1");
        assert!(input.cwd.is_empty());
        assert!(input.tool_input.is_null());
    }

    #[test]
    fn permission_output_shape() {
        let out = HookOutput::permission("allow", "Approved via traybridge tray".into());
        let json = serde_json::to_value(&out).unwrap();
        let inner = &json["hookSpecificOutput"];
        assert_eq!(inner["hookEventName"], "PermissionRequest");
        assert_eq!(inner["permissionDecision"], "allow");
        assert!(inner.get("additionalContext").is_none());
    }

    #[test]
    fn answered_question_output_carries_context() {
        let out = HookOutput::question_answered("- Q -> A".into());
        let json = serde_json::to_value(&out).unwrap();
        let inner = &json["hookSpecificOutput"];
        assert_eq!(inner["hookEventName"], "PreToolUse");
        assert_eq!(inner["permissionDecision"], "deny");
        assert_eq!(inner["additionalContext"], "- Q -> A");
    }
}
