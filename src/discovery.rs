//! Fallback producer for sessions that bypassed the session-start hook.
//!
//! Scans the process table for assistant processes, maps each candidate's
//! working directory to the assistant's per-project log location, and
//! synthesizes a session record from the freshest log artifact found there.
//! Idempotent: it never creates a second record for a known session and
//! never overwrites `status`/`waiting_for` on an existing one.

use std::path::{Path, PathBuf};

use sysinfo::{ProcessRefreshKind, System, UpdateKind};

use crate::config::Config;
use crate::liveness::SystemLiveness;
use crate::store::{self, is_safe_id, SessionInfo, StateDir};

/// One candidate from the process table.
#[derive(Debug, Clone)]
pub struct ProcessCandidate {
    pub pid: u32,
    pub name: String,
    pub cwd: Option<PathBuf>,
    pub started_at: Option<u64>,
}

/// Seam for the poller: production scans the live process table, tests
/// inject canned candidates.
pub trait ProcessScanner {
    fn scan(&self) -> Vec<ProcessCandidate>;
}

#[derive(Debug, Default)]
pub struct SystemScanner;

impl ProcessScanner for SystemScanner {
    fn scan(&self) -> Vec<ProcessCandidate> {
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessRefreshKind::new().with_cwd(UpdateKind::Always),
        );
        sys.processes()
            .iter()
            .map(|(pid, process)| ProcessCandidate {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                cwd: process.cwd().map(Path::to_path_buf),
                started_at: Some(process.start_time()),
            })
            .collect()
    }
}

/// Map a working directory to the assistant's project-log directory name.
/// The transform mirrors the assistant's own encoding: every separator or
/// dot becomes `-`, so `/home/me/proj.rs` lives under `-home-me-proj-rs`.
pub fn project_dir_name(cwd: &Path) -> String {
    cwd.to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '.' | ':' => '-',
            other => other,
        })
        .collect()
}

/// The most recently modified `.jsonl` session log in a project directory.
/// Its file stem is the session id.
fn latest_session_artifact(project_dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(project_dir).ok()?;
    let mut best: Option<(std::time::SystemTime, String)> = None;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if best.as_ref().map_or(true, |(t, _)| modified > *t) {
            best = Some((modified, stem.to_string()));
        }
    }
    best.map(|(_, stem)| stem)
}

/// Run one discovery pass. Returns how many records were created or
/// backfilled.
pub fn discover_sessions(
    state: &StateDir,
    config: &Config,
    scanner: &dyn ProcessScanner,
) -> usize {
    let mut touched = 0;
    for candidate in scanner.scan() {
        if !candidate.name.contains(&config.monitored_process) {
            continue;
        }
        let Some(cwd) = candidate.cwd.as_deref() else {
            continue;
        };

        let project_dir = config.projects_root.join(project_dir_name(cwd));
        let Some(session_id) = latest_session_artifact(&project_dir) else {
            continue;
        };
        if !is_safe_id(&session_id) {
            continue;
        }

        match store::load_session(state, &session_id) {
            Ok(None) => {
                let mut info =
                    SessionInfo::new(&session_id, &cwd.to_string_lossy(), Some(candidate.pid));
                info.owner_started_at = candidate
                    .started_at
                    .or_else(|| SystemLiveness::process_start_time(candidate.pid));
                if store::save_session(state, &info).is_ok() {
                    tracing::debug!(%session_id, pid = candidate.pid, "discovered session");
                    touched += 1;
                }
            }
            Ok(Some(mut info)) if info.owner_pid.is_none() => {
                // Backfill the owner pid only; status, waiting_for and
                // last_updated stay exactly as the hooks left them.
                info.owner_pid = Some(candidate.pid);
                info.owner_started_at = candidate.started_at;
                if store::save_session(state, &info).is_ok() {
                    tracing::debug!(%session_id, pid = candidate.pid, "backfilled owner pid");
                    touched += 1;
                }
            }
            // Known and owned, or unreadable: leave it alone.
            _ => {}
        }
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{load_session, save_session, SessionStatus};
    use tempfile::TempDir;

    struct FakeScanner {
        candidates: Vec<ProcessCandidate>,
    }

    impl ProcessScanner for FakeScanner {
        fn scan(&self) -> Vec<ProcessCandidate> {
            self.candidates.clone()
        }
    }

    fn candidate(pid: u32, cwd: &Path) -> ProcessCandidate {
        ProcessCandidate {
            pid,
            name: "claude".into(),
            cwd: Some(cwd.to_path_buf()),
            started_at: Some(1000),
        }
    }

    /// State root, projects root, and a fake project with one session log.
    fn setup(session_id: &str) -> (TempDir, Config, StateDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::with_root(tmp.path().join("state"));
        config.projects_root = tmp.path().join("projects");

        let cwd = tmp.path().join("work").join("demo");
        std::fs::create_dir_all(&cwd).unwrap();
        let log_dir = config.projects_root.join(project_dir_name(&cwd));
        std::fs::create_dir_all(&log_dir).unwrap();
        std::fs::write(log_dir.join(format!("{session_id}.jsonl")), "{}\n").unwrap();

        let state = StateDir::new(&config);
        state.ensure_layout().unwrap();
        (tmp, config, state, cwd)
    }

    #[test]
    fn transform_is_deterministic_and_flat() {
        assert_eq!(
            project_dir_name(Path::new("/home/me/proj.rs")),
            "-home-me-proj-rs"
        );
        assert_eq!(
            project_dir_name(Path::new("/home/me/proj.rs")),
            project_dir_name(Path::new("/home/me/proj.rs"))
        );
    }

    #[test]
    fn synthesizes_record_for_untracked_process() {
        let (_tmp, config, state, cwd) = setup("found-1");
        let scanner = FakeScanner {
            candidates: vec![candidate(77, &cwd)],
        };

        assert_eq!(discover_sessions(&state, &config, &scanner), 1);
        let info = load_session(&state, "found-1").unwrap().unwrap();
        assert_eq!(info.status, SessionStatus::Working);
        assert_eq!(info.owner_pid, Some(77));
        assert_eq!(info.owner_started_at, Some(1000));
    }

    #[test]
    fn rediscovery_is_idempotent() {
        let (_tmp, config, state, cwd) = setup("found-2");
        let scanner = FakeScanner {
            candidates: vec![candidate(77, &cwd)],
        };

        assert_eq!(discover_sessions(&state, &config, &scanner), 1);
        assert_eq!(discover_sessions(&state, &config, &scanner), 0);
        assert_eq!(state.list_session_ids().len(), 1);
    }

    #[test]
    fn backfills_pid_without_touching_status() {
        let (_tmp, config, state, cwd) = setup("found-3");
        let mut info = SessionInfo::new("found-3", &cwd.to_string_lossy(), None);
        info.status = SessionStatus::Question;
        info.waiting_for = Some("elicitation".into());
        let stamped = info.last_updated;
        save_session(&state, &info).unwrap();

        let scanner = FakeScanner {
            candidates: vec![candidate(88, &cwd)],
        };
        assert_eq!(discover_sessions(&state, &config, &scanner), 1);

        let after = load_session(&state, "found-3").unwrap().unwrap();
        assert_eq!(after.owner_pid, Some(88));
        assert_eq!(after.status, SessionStatus::Question);
        assert_eq!(after.waiting_for.as_deref(), Some("elicitation"));
        assert_eq!(after.last_updated, stamped);
    }

    #[test]
    fn ignores_processes_with_other_names() {
        let (_tmp, config, state, cwd) = setup("found-4");
        let scanner = FakeScanner {
            candidates: vec![ProcessCandidate {
                name: "bash".into(),
                ..candidate(99, &cwd)
            }],
        };
        assert_eq!(discover_sessions(&state, &config, &scanner), 0);
        assert!(state.list_session_ids().is_empty());
    }

    #[test]
    fn picks_the_freshest_artifact() {
        let (_tmp, config, state, cwd) = setup("older");
        let log_dir = config.projects_root.join(project_dir_name(&cwd));
        // A younger artifact wins the scan.
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(log_dir.join("newer.jsonl"), "{}\n").unwrap();

        let scanner = FakeScanner {
            candidates: vec![candidate(77, &cwd)],
        };
        discover_sessions(&state, &config, &scanner);
        assert!(load_session(&state, "newer").unwrap().is_some());
        assert!(load_session(&state, "older").unwrap().is_none());
    }
}
