use crate::config::Config;
use crate::error::Result;
use crate::store::{self, StateDir};

/// List tracked sessions and their current status.
pub async fn run_sessions(config: &Config) -> Result<()> {
    let state = StateDir::new(config);
    let ids = state.list_session_ids();

    if ids.is_empty() {
        println!("No tracked sessions.");
        return Ok(());
    }

    for session_id in &ids {
        let Ok(Some(info)) = store::load_session(&state, session_id) else {
            println!("{session_id}: <unreadable>");
            continue;
        };
        let waiting = info
            .waiting_for
            .as_deref()
            .map(|w| format!(", waiting for {w}"))
            .unwrap_or_default();
        let pending = store::list_pending(&state, session_id).len();
        println!(
            "{}\n  Project: {} ({})\n  Status: {}{}\n  Owner pid: {}\n  Pending: {}\n  Updated: {}\n",
            info.session_id,
            info.project_name,
            info.cwd,
            info.status,
            waiting,
            info.owner_pid
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".into()),
            pending,
            info.last_updated,
        );
    }

    println!("{} session(s)", ids.len());
    Ok(())
}
