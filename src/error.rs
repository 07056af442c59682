//! Error types for routerctl.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Neither firewall tool is invocable on this host. Listing degrades to
    /// an empty rule set; mutations and persistence fail with this.
    #[error("no usable firewall backend (tried nft and iptables)")]
    BackendUnavailable,

    /// Bad input rejected before any external process is started.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The invoked tool exited non-zero. Carries the tool's own diagnostic
    /// verbatim; the operation must be treated as not applied.
    #[error("{program} failed: {stderr}")]
    CommandFailed { program: String, stderr: String },

    /// The invocation exceeded the bounded wait. Distinguishable from
    /// [`Error::CommandFailed`] so callers can choose to retry.
    #[error("{program} timed out after {timeout_secs}s")]
    TimedOut { program: String, timeout_secs: u64 },

    /// The tool could not be launched at all (missing binary, permissions).
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the failure came from the external tool rather than from
    /// input validation (non-zero exit, timeout, or launch failure).
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Error::CommandFailed { .. } | Error::TimedOut { .. } | Error::Launch { .. }
        )
    }
}
