//! The pending-request / response handshake.
//!
//! A producer publishes a pending request, blocks polling for a response
//! file, and unblocks on answer, timeout, or cancellation. There is no lock
//! stronger than atomic create/replace: a response file becoming visible
//! means it was fully written, and a read failure is "not present yet".
//!
//! Cleanup is scoped, not signal-handler-driven: [`PendingGuard`] removes
//! both files and (by default) restores the session to `working` when it
//! drops, so cleanup runs exactly once on every exit path.

use std::time::Instant;

use crate::config::Config;
use crate::error::Result;
use crate::store::{
    self, remove_file_quiet, settle_to_working, PendingRequest, Response, StateDir,
};

/// How a blocking wait ended.
#[derive(Debug)]
pub enum HandshakeOutcome {
    /// A response was written for our request id.
    Answered(Response),
    /// No response within the configured timeout; the caller falls back to
    /// its native prompt.
    TimedOut,
    /// SIGTERM/SIGHUP arrived; the request is being handled elsewhere.
    Cancelled,
}

/// Scoped cleanup for one published request. Dropping the guard removes the
/// pending and response files (best-effort, tolerant of concurrent removal)
/// and restores the session status unless [`preserve_status`] was called.
///
/// [`preserve_status`]: PendingGuard::preserve_status
pub struct PendingGuard {
    state: StateDir,
    session_id: String,
    request_id: String,
    restore_status: bool,
}

impl PendingGuard {
    pub fn new(state: &StateDir, session_id: &str, request_id: &str) -> Self {
        Self {
            state: state.clone(),
            session_id: session_id.to_string(),
            request_id: request_id.to_string(),
            restore_status: true,
        }
    }

    /// Leave the session status as-is on drop. Elicitation timeouts use this
    /// so the terminal path stays visibly pending; explicit cancellation
    /// never does.
    pub fn preserve_status(&mut self) {
        self.restore_status = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        store::remove_pending(&self.state, &self.session_id, &self.request_id);
        if let Ok(path) = self.state.response_path(&self.request_id) {
            remove_file_quiet(&path);
        }
        if self.restore_status {
            if let Err(e) = settle_to_working(&self.state, &self.session_id) {
                tracing::warn!(
                    session_id = %self.session_id,
                    "could not restore session status: {}", e
                );
            }
        }
    }
}

/// Write the pending file and return its cleanup guard. The caller raises
/// the session status separately; the guard's restore undoes it.
pub fn publish(state: &StateDir, request: &PendingRequest) -> Result<PendingGuard> {
    store::write_pending(state, request)?;
    Ok(PendingGuard::new(state, &request.session_id, &request.id))
}

/// Block until a response for `request_id` appears, the timeout elapses, or
/// a termination/hangup signal arrives. Malformed reads (a writer mid-flight)
/// are retried on the next poll.
pub async fn await_response(
    state: &StateDir,
    config: &Config,
    request_id: &str,
) -> Result<HandshakeOutcome> {
    let start = Instant::now();

    #[cfg(unix)]
    let (mut sigterm, mut sighup) = {
        use tokio::signal::unix::{signal, SignalKind};
        (signal(SignalKind::terminate())?, signal(SignalKind::hangup())?)
    };

    loop {
        if start.elapsed() >= config.request_timeout {
            return Ok(HandshakeOutcome::TimedOut);
        }

        match store::read_response(state, request_id) {
            Ok(Some(response)) => return Ok(HandshakeOutcome::Answered(response)),
            Ok(None) => {}
            Err(e) => tracing::debug!("response not readable yet: {}", e),
        }

        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::time::sleep(config.producer_poll) => {}
                _ = sigterm.recv() => return Ok(HandshakeOutcome::Cancelled),
                _ = sighup.recv() => return Ok(HandshakeOutcome::Cancelled),
            }
        }
        #[cfg(not(unix))]
        tokio::time::sleep(config.producer_poll).await;
    }
}
