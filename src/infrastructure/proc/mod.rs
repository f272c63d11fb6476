//! Process-tree termination.
//!
//! Deployed artifacts may spawn their own children (worker processes,
//! reloaders), so stopping one must reclaim the whole tree. POSIX targets
//! signal the process group; other platforms walk the tree via the OS
//! task tooling. The implementation is selected at build time so the
//! deployment code never branches on OS.

/// Signal strength for tree termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Ask nicely (SIGTERM / default taskkill)
    Graceful,
    /// Do not ask (SIGKILL / taskkill -F)
    Forced,
}

/// Terminate the process group/tree rooted at `pid`.
///
/// Errors are returned for logging only; callers always proceed to their
/// own wait/escalation logic regardless.
#[cfg(unix)]
pub fn terminate_tree(pid: u32, termination: Termination) -> std::io::Result<()> {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let signal = match termination {
        Termination::Graceful => Signal::SIGTERM,
        Termination::Forced => Signal::SIGKILL,
    };

    let pid = Pid::from_raw(pid as i32);
    // The child is spawned as its own group leader; fall back to a single
    // kill when the group is already gone.
    killpg(pid, signal)
        .or_else(|_| kill(pid, signal))
        .map_err(|e| std::io::Error::other(format!("signal delivery failed: {e}")))
}

#[cfg(not(unix))]
pub fn terminate_tree(pid: u32, termination: Termination) -> std::io::Result<()> {
    use std::process::Command;

    let mut cmd = Command::new("taskkill");
    cmd.args(["/PID", &pid.to_string(), "/T"]);
    if termination == Termination::Forced {
        cmd.arg("/F");
    }
    let status = cmd.status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "taskkill exited with {status}"
        )))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_tree_reports_missing_process() {
        // PID near the top of the default pid space; almost certainly unused.
        let result = terminate_tree(4_000_000, Termination::Graceful);
        assert!(result.is_err());
    }
}
