//! The responder loop, in terminal form: poll the state tree and print the
//! snapshot whenever it changes. The tray frontend runs the same poller and
//! renders to a menu instead.

use crate::config::Config;
use crate::discovery::SystemScanner;
use crate::error::Result;
use crate::liveness::SystemLiveness;
use crate::poller::{Attention, Poller, Snapshot};
use crate::store::{self, RequestKind};

/// Poll on the responder tick until Ctrl+C, printing on change only.
pub async fn run_watch(config: Config) -> Result<()> {
    let tick = config.responder_tick;
    let mut poller = Poller::new(config);
    poller.state().ensure_layout()?;

    eprintln!("traybridge: watching {}", poller.state().root().display());
    eprintln!("Press Ctrl+C to stop.\n");

    let liveness = SystemLiveness;
    let scanner = SystemScanner;
    let mut last: Option<Snapshot> = None;

    loop {
        let snapshot = poller.tick(&liveness, &scanner);
        if last.as_ref() != Some(&snapshot) {
            print_snapshot(poller.state(), &snapshot);
            last = Some(snapshot);
        }

        tokio::select! {
            _ = tokio::time::sleep(tick) => {}
            _ = tokio::signal::ctrl_c() => {
                eprintln!("traybridge: stopping");
                return Ok(());
            }
        }
    }
}

fn print_snapshot(state: &store::StateDir, snapshot: &Snapshot) {
    let attention = match snapshot.attention {
        Some(Attention::Question) => "QUESTION",
        Some(Attention::Permission) => "PERMISSION",
        Some(Attention::Resting) => "resting",
        Some(Attention::Working) => "working",
        None => "no sessions",
    };
    println!("[{}] {}", chrono::Utc::now().format("%H:%M:%S"), attention);

    for session in &snapshot.sessions {
        let waiting = session
            .waiting_for
            .as_deref()
            .map(|w| format!(" (waiting for {w})"))
            .unwrap_or_default();
        println!(
            "  {} {} -- {}{}",
            session.session_id, session.project_name, session.status, waiting
        );

        for request in store::list_pending(state, &session.session_id) {
            match request.kind {
                RequestKind::Permission => println!(
                    "    pending {}: {}",
                    request.id,
                    request.description.as_deref().unwrap_or("-")
                ),
                RequestKind::Elicitation => {
                    println!("    pending {}: question", request.id);
                    for q in &request.questions {
                        println!("      {}) {}", q.index, q.question);
                    }
                }
            }
        }
    }
    println!();
}
