//! CLI command implementations.
//!
//! Each `run` function performs one operation and prints exactly one JSON
//! document to stdout on success. Failures propagate to `main`, which
//! writes the diagnostic to stderr and exits 1.

pub mod dhcp;
pub mod firewall;
pub mod network;
pub mod system;

use serde::Serialize;

/// Response shape for mutating operations.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Print a value as the command's single JSON document.
pub(crate) fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
