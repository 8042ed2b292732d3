//! AskUserQuestion hooks: the elicitation request and its cleanup.

use crate::channel::{self, HandshakeOutcome};
use crate::config::{Config, ElicitationMode, TrayConfig};
use crate::error::Result;
use crate::hooks::{HookInput, HookOutcome, HookOutput};
use crate::store::{self, ClientKind, PendingRequest, Question, RequestKind, StateDir};

/// PreToolUse (AskUserQuestion). In terminal mode the request is
/// informational and the tool proceeds; in menubar mode we block for the
/// tray's answers and deny the tool with the answers as context.
pub async fn run_elicitation(config: &Config, input: &HookInput) -> Result<HookOutcome> {
    if !store::is_safe_id(&input.session_id) || input.tool_name != "AskUserQuestion" {
        return Ok(HookOutcome::Proceed);
    }

    let questions = parse_questions(&input.tool_input);
    if questions.is_empty() {
        return Ok(HookOutcome::Proceed);
    }

    let state = StateDir::new(config);
    let Some(session) = store::load_session(&state, &input.session_id).ok().flatten() else {
        return Ok(HookOutcome::Proceed);
    };

    // Editor-embedded sessions always get the native question UI; the tray
    // request stays informational regardless of the configured mode.
    let mode = if session.client_kind == Some(ClientKind::Vscode) {
        ElicitationMode::Terminal
    } else {
        TrayConfig::load(config).elicitation_mode
    };

    match mode {
        ElicitationMode::Terminal => run_notify(&state, input, questions),
        ElicitationMode::Menubar => run_interactive(&state, config, input, questions).await,
    }
}

/// Notify mode: publish the request and let the tool through. The request
/// stays visible until the cleanup hook (or GC) removes it.
fn run_notify(state: &StateDir, input: &HookInput, questions: Vec<Question>) -> Result<HookOutcome> {
    let request = PendingRequest::elicitation(&input.session_id, questions, None);
    store::write_pending(state, &request)?;
    store::raise_question(state, &input.session_id)?;
    Ok(HookOutcome::Proceed)
}

/// Interactive mode: block for tray answers. On answer, deny the tool and
/// return the choices as context. On timeout, keep `question` status so the
/// terminal path stays visibly pending; on cancellation, restore `working`.
async fn run_interactive(
    state: &StateDir,
    config: &Config,
    input: &HookInput,
    questions: Vec<Question>,
) -> Result<HookOutcome> {
    state.ensure_layout()?;
    let request = PendingRequest::elicitation(
        &input.session_id,
        questions.clone(),
        Some(std::process::id()),
    );

    let mut guard = channel::publish(state, &request)?;
    store::raise_question(state, &input.session_id)?;
    print_terminal_hint(&questions);

    match channel::await_response(state, config, &request.id).await? {
        HandshakeOutcome::Answered(response) => {
            let mut lines = Vec::new();
            for (index_key, selected) in &response.answers {
                let line = match index_key.parse::<usize>().ok().and_then(|i| questions.get(i)) {
                    Some(q) => format!("- {} -> {}", q.question, selected),
                    None => format!("- Question {index_key}: {selected}"),
                };
                lines.push(line);
            }
            let context = format!(
                "The user responded via traybridge tray:\n{}",
                lines.join("\n")
            );
            HookOutput::question_answered(context).emit()?;
            drop(guard);
            Ok(HookOutcome::Proceed)
        }
        HandshakeOutcome::TimedOut => {
            guard.preserve_status();
            drop(guard);
            Ok(HookOutcome::Fallback)
        }
        HandshakeOutcome::Cancelled => {
            drop(guard);
            Ok(HookOutcome::Fallback)
        }
    }
}

/// PostToolUse (AskUserQuestion): the question was answered natively.
/// Remove this session's elicitation requests and settle back to working.
pub fn run_elicitation_cleanup(config: &Config, input: &HookInput) -> Result<HookOutcome> {
    if !store::is_safe_id(&input.session_id) {
        return Ok(HookOutcome::Proceed);
    }
    let state = StateDir::new(config);

    for request in store::list_pending(&state, &input.session_id) {
        if request.kind == RequestKind::Elicitation {
            store::remove_pending(&state, &input.session_id, &request.id);
        }
    }
    store::settle_to_working(&state, &input.session_id)?;
    Ok(HookOutcome::Proceed)
}

/// Tolerant extraction of the question list from the raw tool input.
/// Options may be plain strings or `{"label": ...}` objects.
fn parse_questions(tool_input: &serde_json::Value) -> Vec<Question> {
    let Some(raw) = tool_input.get("questions").and_then(|q| q.as_array()) else {
        return Vec::new();
    };

    raw.iter()
        .enumerate()
        .map(|(index, q)| Question {
            index,
            question: q
                .get("question")
                .and_then(|v| v.as_str())
                .unwrap_or("Question")
                .to_string(),
            header: q
                .get("header")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            options: q
                .get("options")
                .and_then(|v| v.as_array())
                .map(|opts| {
                    opts.iter()
                        .map(|opt| match opt.get("label").and_then(|l| l.as_str()) {
                            Some(label) => label.to_string(),
                            None => opt.as_str().map(str::to_string).unwrap_or_else(|| {
                                opt.to_string()
                            }),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

fn print_terminal_hint(questions: &[Question]) {
    eprintln!("\n  [traybridge] Question pending in tray:");
    for q in questions {
        eprintln!("    {}", q.question);
        for (i, opt) in q.options.iter().enumerate() {
            eprintln!("      {}) {}", i + 1, opt);
        }
    }
    eprintln!("  Answer in the tray, or Ctrl+C to answer here.\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        load_session, merge_answer, save_session, SessionInfo, SessionStatus,
    };
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Config, StateDir) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::with_root(tmp.path().to_path_buf());
        config.producer_poll = Duration::from_millis(10);
        config.request_timeout = Duration::from_millis(150);
        let state = StateDir::new(&config);
        state.ensure_layout().unwrap();
        save_session(&state, &SessionInfo::new("s1", "/p", Some(1))).unwrap();
        (tmp, config, state)
    }

    fn question_input(session_id: &str) -> HookInput {
        HookInput {
            session_id: session_id.into(),
            tool_name: "AskUserQuestion".into(),
            tool_input: serde_json::json!({
                "questions": [
                    {"question": "Pick one", "options": [{"label": "A"}, {"label": "B"}]},
                    {"question": "Pick another", "options": ["C", "D"]}
                ]
            }),
            ..HookInput::default()
        }
    }

    #[tokio::test]
    async fn terminal_mode_publishes_and_proceeds() {
        let (_tmp, config, state) = setup();

        let outcome = run_elicitation(&config, &question_input("s1")).await.unwrap();
        assert_eq!(outcome, HookOutcome::Proceed);

        let pending = store::list_pending(&state, "s1");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, RequestKind::Elicitation);
        assert!(pending[0].producer_pid.is_none());
        assert_eq!(pending[0].questions.len(), 2);
        assert_eq!(pending[0].questions[1].options, vec!["C", "D"]);

        let info = load_session(&state, "s1").unwrap().unwrap();
        assert_eq!(info.status, SessionStatus::Question);
        assert_eq!(info.waiting_for.as_deref(), Some("elicitation"));
    }

    #[tokio::test]
    async fn interactive_timeout_preserves_question_status() {
        let (_tmp, config, state) = setup();
        TrayConfig {
            elicitation_mode: ElicitationMode::Menubar,
        }
        .save(&config)
        .unwrap();

        let outcome = run_elicitation(&config, &question_input("s1")).await.unwrap();
        assert_eq!(outcome, HookOutcome::Fallback);

        // Pending file is cleaned up, but the status asymmetry holds: the
        // terminal prompt is still live, so the session stays `question`.
        assert!(store::list_pending(&state, "s1").is_empty());
        let info = load_session(&state, "s1").unwrap().unwrap();
        assert_eq!(info.status, SessionStatus::Question);
    }

    #[tokio::test]
    async fn interactive_answer_denies_with_context() {
        let (_tmp, mut config, state) = setup();
        config.request_timeout = Duration::from_secs(5);
        TrayConfig {
            elicitation_mode: ElicitationMode::Menubar,
        }
        .save(&config)
        .unwrap();

        // Answer as the tray would, as soon as the pending file appears.
        let answer_state = state.clone();
        let answerer = tokio::spawn(async move {
            loop {
                let pending = store::list_pending(&answer_state, "s1");
                if let Some(req) = pending.first() {
                    merge_answer(&answer_state, &req.id, 0, "A").unwrap();
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let outcome = run_elicitation(&config, &question_input("s1")).await.unwrap();
        answerer.await.unwrap();
        assert_eq!(outcome, HookOutcome::Proceed);

        let info = load_session(&state, "s1").unwrap().unwrap();
        assert_eq!(info.status, SessionStatus::Working);
        assert!(store::list_pending(&state, "s1").is_empty());
    }

    #[tokio::test]
    async fn vscode_sessions_stay_in_notify_mode() {
        let (_tmp, config, state) = setup();
        TrayConfig {
            elicitation_mode: ElicitationMode::Menubar,
        }
        .save(&config)
        .unwrap();

        let mut info = SessionInfo::new("s2", "/p", Some(1));
        info.client_kind = Some(ClientKind::Vscode);
        save_session(&state, &info).unwrap();

        // Menubar mode is configured, yet this returns immediately.
        let outcome = run_elicitation(&config, &question_input("s2")).await.unwrap();
        assert_eq!(outcome, HookOutcome::Proceed);
        assert_eq!(store::list_pending(&state, "s2").len(), 1);
    }

    #[tokio::test]
    async fn cleanup_removes_elicitations_and_settles() {
        let (_tmp, config, state) = setup();
        run_elicitation(&config, &question_input("s1")).await.unwrap();
        let perm = PendingRequest::permission(
            "s1",
            "Bash",
            serde_json::json!({}),
            "[Bash]".into(),
            None,
        );
        store::write_pending(&state, &perm).unwrap();

        run_elicitation_cleanup(&config, &question_input("s1")).unwrap();

        let remaining = store::list_pending(&state, "s1");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, RequestKind::Permission);
        let info = load_session(&state, "s1").unwrap().unwrap();
        assert_eq!(info.status, SessionStatus::Working);
    }

    #[tokio::test]
    async fn other_tools_are_ignored() {
        let (_tmp, config, state) = setup();
        let mut input = question_input("s1");
        input.tool_name = "Bash".into();

        let outcome = run_elicitation(&config, &input).await.unwrap();
        assert_eq!(outcome, HookOutcome::Proceed);
        assert!(store::list_pending(&state, "s1").is_empty());
    }
}
