//! Deployment launching.
//!
//! A deployment is a shell command run in the repository's working directory.
//! Launching is fire-and-forget: the request that triggered it never waits for
//! the command, and a command that cannot be started is only logged.

use crate::config::RepositoryConfig;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Starts deployments for repositories.
pub trait DeploymentLauncher: Send + Sync {
    /// Start the repository's deployment command and return immediately.
    fn launch(&self, repository: &RepositoryConfig);
}

/// Runs `cmd` through the system shell (`sh -c`, or `cmd /C` on Windows).
///
/// stdin is closed and stdout/stderr are captured into buffers that are
/// drained and discarded by a background task, which also reaps the child.
/// Must be called from within a tokio runtime; outside one the launch is
/// logged and skipped.
#[derive(Debug, Clone, Default)]
pub struct ShellLauncher;

impl ShellLauncher {
    pub fn new() -> Self {
        Self
    }

    fn command(&self, repository: &RepositoryConfig) -> Command {
        #[cfg(not(windows))]
        let mut command = {
            let mut command = Command::new("sh");
            command.arg("-c").arg(&repository.cmd);
            command
        };

        #[cfg(windows)]
        let mut command = {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(&repository.cmd);
            command
        };

        command
            .current_dir(&repository.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        command
    }
}

impl DeploymentLauncher for ShellLauncher {
    #[instrument(skip(self, repository), fields(repository = %repository.name))]
    fn launch(&self, repository: &RepositoryConfig) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "No async runtime available, deployment not started");
                return;
            }
        };

        let child = match self.command(repository).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    cwd = %repository.cwd.display(),
                    error = %e,
                    "Failed to launch deployment command"
                );
                return;
            }
        };

        info!(pid = ?child.id(), cwd = %repository.cwd.display(), "Deployment command launched");

        let name = repository.name.clone();
        runtime.spawn(async move {
            match child.wait_with_output().await {
                Ok(output) => debug!(
                    repository = %name,
                    status = %output.status,
                    stdout_bytes = output.stdout.len(),
                    stderr_bytes = output.stderr.len(),
                    "Deployment command exited"
                ),
                Err(e) => warn!(repository = %name, error = %e, "Failed to collect deployment command"),
            }
        });
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
