//! Non-blocking status hooks: tool activity, prompt, stop, notification.

use crate::config::Config;
use crate::error::Result;
use crate::hooks::{HookInput, HookOutcome};
use crate::store::{self, SessionStatus, StateDir};

/// PostToolUse (catch-all): if tools are running, the session is working.
/// Only downgrades a stale `question`/`permission`; never touches
/// `done`/`idle` it did not cause.
pub fn run_activity(config: &Config, input: &HookInput) -> Result<HookOutcome> {
    if store::is_safe_id(&input.session_id) {
        store::downgrade_after_activity(&StateDir::new(config), &input.session_id)?;
    }
    Ok(HookOutcome::Proceed)
}

/// UserPromptSubmit: a new turn begins, the session is working again.
pub fn run_prompt(config: &Config, input: &HookInput) -> Result<HookOutcome> {
    if store::is_safe_id(&input.session_id) {
        store::settle_to_working(&StateDir::new(config), &input.session_id)?;
    }
    Ok(HookOutcome::Proceed)
}

/// Stop: the turn finished; the session waits for the next prompt.
pub fn run_stop(config: &Config, input: &HookInput) -> Result<HookOutcome> {
    if store::is_safe_id(&input.session_id) {
        store::mark_done(&StateDir::new(config), &input.session_id)?;
    }
    Ok(HookOutcome::Proceed)
}

/// Notification: classify the out-of-band message and record what the
/// session is waiting for. An active interactive prompt is never clobbered
/// by an idle-style notification.
pub fn run_notification(config: &Config, input: &HookInput) -> Result<HookOutcome> {
    if !store::is_safe_id(&input.session_id) {
        return Ok(HookOutcome::Proceed);
    }

    let (status, waiting_for) = classify(input);
    store::mark_notified(
        &StateDir::new(config),
        &input.session_id,
        status,
        &waiting_for,
    )?;
    Ok(HookOutcome::Proceed)
}

fn classify(input: &HookInput) -> (SessionStatus, String) {
    let subject = if input.notification_type.is_empty() {
        &input.title
    } else {
        &input.notification_type
    };
    let lower = subject.to_lowercase();

    if lower.contains("permission") {
        (SessionStatus::Permission, "permission".into())
    } else if lower.contains("idle") || lower.contains("input") {
        (SessionStatus::Idle, "input".into())
    } else if lower.contains("elicitation") {
        (SessionStatus::Idle, "elicitation".into())
    } else {
        let reason = if input.title.is_empty() {
            "notification".into()
        } else {
            input.title.clone()
        };
        (SessionStatus::Idle, reason)
    }
}
