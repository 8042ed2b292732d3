//! Process liveness checks.
//!
//! "Alive" means a process with that pid currently exists, nothing more.
//! Pid reuse is narrowed (not eliminated) by recording the owner's start
//! time at registration and treating a later mismatch as dead.

use sysinfo::{Pid, ProcessRefreshKind, System};

/// Seam for the GC sweeps: production uses [`SystemLiveness`], tests inject
/// a canned process table.
pub trait Liveness {
    /// Whether a process with `pid` exists. When `started_at` (epoch secs)
    /// was recorded for the pid, a process whose start time disagrees is
    /// reported dead: the pid has been reused by an unrelated process.
    fn is_alive(&self, pid: u32, started_at: Option<u64>) -> bool;
}

#[derive(Debug, Default)]
pub struct SystemLiveness;

impl SystemLiveness {
    /// Start-time fingerprint for a pid, if the platform exposes one.
    pub fn process_start_time(pid: u32) -> Option<u64> {
        let mut sys = System::new();
        let sys_pid = Pid::from_u32(pid);
        sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new());
        sys.process(sys_pid).map(|p| p.start_time())
    }
}

impl Liveness for SystemLiveness {
    fn is_alive(&self, pid: u32, started_at: Option<u64>) -> bool {
        if !pid_exists(pid) {
            return false;
        }
        if let (Some(recorded), Some(current)) =
            (started_at, Self::process_start_time(pid))
        {
            // Coarse clocks on some platforms round differently between
            // reads; a one-second skew is still the same process.
            if current.abs_diff(recorded) > 1 {
                return false;
            }
        }
        true
    }
}

/// Signal-probe existence check. A permission error means the pid exists
/// but belongs to someone else; the conservative reading here is "alive",
/// so the GC never destroys state owned by a live process it cannot probe.
#[cfg(unix)]
fn pid_exists(pid: u32) -> bool {
    let ret = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if ret == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn pid_exists(pid: u32) -> bool {
    let mut sys = System::new();
    let sys_pid = Pid::from_u32(pid);
    sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new());
    sys.process(sys_pid).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_process_is_alive() {
        let liveness = SystemLiveness;
        assert!(liveness.is_alive(std::process::id(), None));
    }

    #[test]
    fn own_process_with_matching_fingerprint_is_alive() {
        let liveness = SystemLiveness;
        let started = SystemLiveness::process_start_time(std::process::id());
        assert!(liveness.is_alive(std::process::id(), started));
    }

    #[test]
    fn reused_pid_with_wrong_fingerprint_is_dead() {
        let liveness = SystemLiveness;
        // Our own pid, but a fingerprint from a different epoch.
        assert!(!liveness.is_alive(std::process::id(), Some(1)));
    }

    #[test]
    fn absurd_pid_is_dead() {
        let liveness = SystemLiveness;
        assert!(!liveness.is_alive(u32::MAX - 7, None));
    }
}
