//! Process liveness checks used by master election.

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Answers whether a process id refers to a running process.
pub trait ProcessProbe: Send + Sync {
    /// Whether `pid` is alive. `0` is never alive.
    fn is_alive(&self, pid: u32) -> bool;
}

/// [`ProcessProbe`] backed by `sysinfo`.
#[derive(Debug, Default)]
pub struct SystemProcessProbe {
    system: Mutex<System>,
}

impl SystemProcessProbe {
    /// Create a probe with an empty process table.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessProbe for SystemProcessProbe {
    fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }
        if pid == std::process::id() {
            return true;
        }

        let pid = Pid::from_u32(pid);
        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        system.process(pid).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_is_alive() {
        assert!(SystemProcessProbe::new().is_alive(std::process::id()));
    }

    #[test]
    fn test_pid_zero_is_never_alive() {
        assert!(!SystemProcessProbe::new().is_alive(0));
    }

    #[test]
    fn test_exited_child_is_not_alive() -> Result<(), Box<dyn std::error::Error>> {
        let exe = std::env::current_exe()?;
        let mut child = std::process::Command::new(exe)
            .arg("--list")
            .stdout(std::process::Stdio::null())
            .spawn()?;
        let pid = child.id();
        child.wait()?;

        assert!(!SystemProcessProbe::new().is_alive(pid));
        Ok(())
    }
}
