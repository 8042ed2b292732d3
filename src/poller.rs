//! The responder's poll engine: one `tick` runs the sweeps that are due,
//! then projects the state tree into an immutable snapshot for display.
//!
//! The snapshot is derived from session records only. Pending request files
//! feed the per-session detail, never the aggregate attention level, so a
//! stray pending file can never light up the tray on its own.

use crate::config::Config;
use crate::discovery::{self, ProcessScanner};
use crate::gc;
use crate::liveness::Liveness;
use crate::store::{self, SessionStatus, StateDir};

/// Stale-session sweeps are expensive relative to the others and the stale
/// threshold is measured in hours, so they run on startup and then every
/// 300 ticks (ten minutes at the default tick).
const STALE_SWEEP_EVERY: u64 = 300;

/// What the tray icon should convey. Absent entirely when no sessions are
/// tracked; otherwise the most urgent level across sessions wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Attention {
    /// At least one session is working; nothing needs the human.
    Working,
    /// A session finished or went idle and is waiting for input.
    Resting,
    /// A permission decision is pending.
    Permission,
    /// A question is pending.
    Question,
}

impl Attention {
    fn of(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Question => Attention::Question,
            SessionStatus::Permission => Attention::Permission,
            SessionStatus::Done | SessionStatus::Idle => Attention::Resting,
            SessionStatus::Working => Attention::Working,
        }
    }
}

/// One session as the tray shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub session_id: String,
    pub project_name: String,
    pub status: SessionStatus,
    pub waiting_for: Option<String>,
    /// Requests currently awaiting a human action.
    pub pending: usize,
}

/// The full display state after one tick. `PartialEq` so the watch loop can
/// cheaply skip redraws when nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub sessions: Vec<SessionView>,
    pub attention: Option<Attention>,
}

impl Snapshot {
    fn aggregate(sessions: Vec<SessionView>) -> Self {
        let attention = sessions.iter().map(|s| Attention::of(s.status)).max();
        Self {
            sessions,
            attention,
        }
    }
}

/// Drives sweeps and discovery on a schedule and produces snapshots.
/// Single-owner: exactly one poller runs per state root.
pub struct Poller {
    config: Config,
    state: StateDir,
    ticks: u64,
}

impl Poller {
    pub fn new(config: Config) -> Self {
        let state = StateDir::new(&config);
        Self {
            config,
            state,
            ticks: 0,
        }
    }

    pub fn state(&self) -> &StateDir {
        &self.state
    }

    /// One poll cycle. Sweeps run before the projection so a snapshot never
    /// shows a session that was just collected.
    pub fn tick(&mut self, liveness: &dyn Liveness, scanner: &dyn ProcessScanner) -> Snapshot {
        if self.ticks % STALE_SWEEP_EVERY == 0 {
            gc::sweep_stale_sessions(&self.state, &self.config);
        }
        gc::sweep_dead_sessions(&self.state, liveness);
        gc::sweep_stale_pending(&self.state, liveness);

        if self.ticks % self.config.discovery_every == 0 {
            discovery::discover_sessions(&self.state, &self.config, scanner);
        }
        self.ticks += 1;

        self.snapshot()
    }

    /// Project the current state tree without sweeping.
    pub fn snapshot(&self) -> Snapshot {
        let mut sessions = Vec::new();
        for session_id in self.state.list_session_ids() {
            let info = match store::load_session(&self.state, &session_id) {
                Ok(Some(info)) => info,
                // Unreadable records are the stale sweep's problem; skip.
                _ => continue,
            };
            sessions.push(SessionView {
                pending: store::list_pending(&self.state, &session_id).len(),
                session_id: info.session_id,
                project_name: info.project_name,
                status: info.status,
                waiting_for: info.waiting_for,
            });
        }
        Snapshot::aggregate(sessions)
    }
}
