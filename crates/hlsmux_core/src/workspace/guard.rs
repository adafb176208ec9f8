//! Scoped cleanup of a run's workspace.

use super::Workspace;

/// Removes a run's artifacts when dropped, unless disarmed.
///
/// Armed at the start of a run so that failures and panics leave no
/// partial segments behind for the next run's scan to pick up.
pub struct WorkspaceGuard {
    workspace: Workspace,
    remove_dir: bool,
    armed: bool,
}

impl WorkspaceGuard {
    /// Guard `workspace`. `remove_dir` should be true only when the run
    /// created the directory.
    pub fn new(workspace: Workspace, remove_dir: bool) -> Self {
        Self {
            workspace,
            remove_dir,
            armed: true,
        }
    }

    /// Keep the workspace as it is on drop.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        match self.workspace.cleanup(self.remove_dir) {
            Ok(report) if !report.removed.is_empty() => {
                tracing::debug!(
                    "Removed {} leftover file(s) from {}",
                    report.removed.len(),
                    self.workspace.dir().display()
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Workspace cleanup failed: {}", e),
        }
    }
}
