//! Bounded-wait command execution abstraction.
//!
//! Every external invocation in routerctl goes through [`CommandExecutor`]:
//! a trait-based abstraction over `tokio::process::Command` that enforces a
//! fixed timeout and lets unit tests mock system commands without running
//! them.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

#[cfg(test)]
use mockall::automock;

/// Default bounded wait for external invocations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Output from command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// The exit code, if available
    pub code: Option<i32>,
}

/// Trait for command execution, allowing dependency injection for testing.
///
/// `run` resolves to `Ok` whenever the child ran to completion, even with a
/// non-zero exit; launch failures and timeouts are `Err`. Use
/// [`run_checked`] when a non-zero exit should be an error carrying the
/// tool's stderr verbatim.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute `program` with `args` under the bounded wait.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Run a command and treat a non-zero exit as [`Error::CommandFailed`],
/// surfacing the tool's stderr unmodified. Returns stdout on success.
pub async fn run_checked(
    exec: &dyn CommandExecutor,
    program: &str,
    args: &[String],
) -> Result<String> {
    let output = exec.run(program, args).await?;
    if output.success {
        Ok(output.stdout)
    } else {
        Err(Error::CommandFailed {
            program: program.to_string(),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Real executor backed by `tokio::process` with `kill_on_drop`, so a
/// cancelled or timed-out invocation terminates the child instead of leaving
/// it running unobserved.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    timeout: Duration,
}

impl SystemExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl CommandExecutor for SystemExecutor {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Err(_) => {
                return Err(Error::TimedOut {
                    program: program.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(source)) => {
                return Err(Error::Launch {
                    program: program.to_string(),
                    source,
                })
            }
            Ok(Ok(output)) => output,
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Helper to convert a slice of &str to Vec<String>.
///
/// The trait takes `&[String]` because mockall has lifetime issues with
/// `&[&str]` arguments.
pub fn args_to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Check that the process runs with root privileges (effective UID == 0).
///
/// Firewall mutations, interface configuration, and service control all need
/// CAP_NET_ADMIN or more; a plain UID check covers the common sudo case.
pub fn check_root() -> anyhow::Result<()> {
    // SAFETY: geteuid() reads the effective user ID, has no preconditions,
    // never fails, and modifies no state.
    let euid = unsafe { libc::geteuid() };

    if euid != 0 {
        anyhow::bail!("this operation requires root privileges; run with sudo")
    }
    Ok(())
}
