//! Session lifecycle hooks: registration and teardown.

use crate::config::Config;
use crate::error::Result;
use crate::hooks::{HookInput, HookOutcome};
use crate::liveness::SystemLiveness;
use crate::store::{self, ClientKind, SessionInfo, StateDir};

/// SessionStart: register the session with `status = working`. The owner
/// pid is our parent, the assistant process whose liveness governs the
/// session from here on.
pub fn run_session_start(config: &Config, input: &HookInput) -> Result<HookOutcome> {
    if !store::is_safe_id(&input.session_id) {
        tracing::warn!("session-start: unusable session id, skipping");
        return Ok(HookOutcome::Proceed);
    }

    let state = StateDir::new(config);
    state.ensure_layout()?;

    let owner_pid = parent_pid();
    let mut info = SessionInfo::new(&input.session_id, &input.cwd, owner_pid);
    info.owner_started_at = owner_pid.and_then(SystemLiveness::process_start_time);
    info.client_kind = Some(detect_client());
    store::save_session(&state, &info)?;

    // Pre-create the pending dir so the responder lists the session
    // consistently from the first tick.
    std::fs::create_dir_all(state.pending_dir(&input.session_id)?)?;

    tracing::debug!(session_id = %input.session_id, "session registered");
    Ok(HookOutcome::Proceed)
}

/// SessionEnd: destroy the session record and its pending subtree.
pub fn run_session_end(config: &Config, input: &HookInput) -> Result<HookOutcome> {
    if !store::is_safe_id(&input.session_id) {
        return Ok(HookOutcome::Proceed);
    }
    let state = StateDir::new(config);
    state.remove_session_subtree(&input.session_id);
    Ok(HookOutcome::Proceed)
}

#[cfg(unix)]
fn parent_pid() -> Option<u32> {
    let ppid = unsafe { libc::getppid() };
    u32::try_from(ppid).ok()
}

#[cfg(not(unix))]
fn parent_pid() -> Option<u32> {
    None
}

/// Terminal vs editor-embedded, decided once at session start.
fn detect_client() -> ClientKind {
    let entrypoint = std::env::var("CLAUDE_CODE_ENTRYPOINT").unwrap_or_default();
    if entrypoint.contains("vscode") || std::env::var_os("VSCODE_PID").is_some() {
        ClientKind::Vscode
    } else {
        ClientKind::Terminal
    }
}
