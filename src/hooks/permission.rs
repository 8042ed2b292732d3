//! PermissionRequest: the blocking permission handshake.

use crate::channel::{self, HandshakeOutcome};
use crate::config::Config;
use crate::error::Result;
use crate::hooks::{HookInput, HookOutcome, HookOutput};
use crate::store::{self, PendingRequest, PermissionDecision, StateDir};

/// Publish the permission request and block until the tray answers, the
/// timeout elapses, or we are cancelled. Timeout and cancellation both
/// restore `working` and exit 1 so the terminal dialog takes over.
pub async fn run_permission(config: &Config, input: &HookInput) -> Result<HookOutcome> {
    if !store::is_safe_id(&input.session_id) {
        return Ok(HookOutcome::Fallback);
    }

    let state = StateDir::new(config);
    // Unregistered session: the terminal handles it natively.
    if store::load_session(&state, &input.session_id)
        .ok()
        .flatten()
        .is_none()
    {
        return Ok(HookOutcome::Fallback);
    }
    state.ensure_layout()?;

    let tool_name = if input.tool_name.is_empty() {
        "unknown"
    } else {
        &input.tool_name
    };
    let description = describe_request(tool_name, &input.tool_input);
    let request = PendingRequest::permission(
        &input.session_id,
        tool_name,
        input.tool_input.clone(),
        description,
        Some(std::process::id()),
    );

    let guard = channel::publish(&state, &request)?;
    store::raise_permission(&state, &input.session_id)?;

    match channel::await_response(&state, config, &request.id).await? {
        HandshakeOutcome::Answered(response) => {
            let decision = response.decision.unwrap_or(PermissionDecision::Deny);
            let verdict = decision.as_hook_decision();
            let reason = if verdict == "allow" {
                "Approved via traybridge tray".to_string()
            } else {
                "Denied via traybridge tray".to_string()
            };
            HookOutput::permission(verdict, reason).emit()?;
            drop(guard);
            Ok(HookOutcome::Proceed)
        }
        HandshakeOutcome::TimedOut | HandshakeOutcome::Cancelled => {
            // Guard restores `working` and removes both files.
            drop(guard);
            Ok(HookOutcome::Fallback)
        }
    }
}

/// Human-readable one-liner for the tray menu.
pub fn describe_request(tool_name: &str, tool_input: &serde_json::Value) -> String {
    let str_field = |key: &str| {
        tool_input
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    };

    match tool_name {
        "Bash" => {
            let description = str_field("description");
            if !description.is_empty() {
                return format!("[Bash] {description}");
            }
            format!("[Bash] {}", truncate(str_field("command"), 80))
        }
        "Edit" | "Write" | "Read" => {
            let path = str_field("file_path");
            let name = std::path::Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".into());
            format!("[{tool_name}] {name}")
        }
        other => format!("[{other}]"),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{truncated}...")
    }
}
