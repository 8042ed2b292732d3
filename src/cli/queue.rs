//! Resolve pending requests from the command line. These are the same
//! writes the tray frontend performs from its menu.

use crate::config::Config;
use crate::error::Result;
use crate::store::{self, PendingRequest, PermissionDecision, RequestKind, StateDir};

/// List pending requests across all sessions.
pub async fn run_queue(config: &Config) -> Result<()> {
    let state = StateDir::new(config);
    let pending = store::list_all_pending(&state);

    if pending.is_empty() {
        println!("No pending requests.");
        return Ok(());
    }

    for request in &pending {
        match request.kind {
            RequestKind::Permission => println!(
                "ID: {}\n  Session: {}\n  Kind: permission\n  Request: {}\n  Queued: {}\n",
                request.id,
                request.session_id,
                request.description.as_deref().unwrap_or("-"),
                request.timestamp,
            ),
            RequestKind::Elicitation => {
                println!(
                    "ID: {}\n  Session: {}\n  Kind: elicitation\n  Queued: {}",
                    request.id, request.session_id, request.timestamp,
                );
                for q in &request.questions {
                    println!("  Question {}: {}", q.index, q.question);
                    for opt in &q.options {
                        println!("    - {opt}");
                    }
                }
                println!();
            }
        }
    }

    println!("{} pending request(s)", pending.len());
    Ok(())
}

/// Approve a pending permission request. The blocking producer polling
/// `responses/<id>.json` picks the decision up within its next poll.
pub async fn run_approve(config: &Config, id: &str, always: bool) -> Result<()> {
    let state = StateDir::new(config);
    let request = find_pending(&state, id);

    let decision = if always {
        PermissionDecision::AlwaysAllow
    } else {
        PermissionDecision::Allow
    };
    store::write_decision(&state, &request.id, decision)?;
    eprintln!("traybridge: approved {id}");
    if always {
        eprintln!("  (recorded as 'always allow')");
    }
    Ok(())
}

/// Deny a pending permission request.
pub async fn run_deny(config: &Config, id: &str) -> Result<()> {
    let state = StateDir::new(config);
    let request = find_pending(&state, id);

    store::write_decision(&state, &request.id, PermissionDecision::Deny)?;
    eprintln!("traybridge: denied {id}");
    Ok(())
}

/// Answer one question of a pending elicitation request. Each invocation
/// merges one answer; earlier answers to other questions are kept.
pub async fn run_answer(config: &Config, id: &str, question: usize, option: &str) -> Result<()> {
    let state = StateDir::new(config);
    let request = find_pending(&state, id);

    let Some(q) = request.questions.iter().find(|q| q.index == question) else {
        eprintln!("traybridge: request {id} has no question {question}");
        std::process::exit(1);
    };
    if !q.options.is_empty() && !q.options.iter().any(|o| o == option) {
        eprintln!("traybridge: '{option}' is not an option. Choose one of:");
        for opt in &q.options {
            eprintln!("  - {opt}");
        }
        std::process::exit(1);
    }

    store::merge_answer(&state, &request.id, question, option)?;
    eprintln!("traybridge: answered question {question} of {id}");
    Ok(())
}

fn find_pending(state: &StateDir, id: &str) -> PendingRequest {
    match store::list_all_pending(state).into_iter().find(|r| r.id == id) {
        Some(request) => request,
        None => {
            eprintln!("traybridge: no pending request with id {id}");
            std::process::exit(1);
        }
    }
}
