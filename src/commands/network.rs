//! Network command implementations.

use std::path::Path;

use anyhow::{Context, Result};

use super::{emit, ActionResponse};
use crate::config::Config;
use crate::exec::{check_root, SystemExecutor};
use crate::network::{self, InterfaceConfig};

pub async fn interfaces(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let exec = SystemExecutor::new(config.command_timeout());
    emit(&network::list_interfaces(&exec).await?)
}

pub async fn status(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let exec = SystemExecutor::new(config.command_timeout());
    emit(&network::network_status(&exec).await?)
}

pub async fn configure(config_path: &Path, interface: &str, config_json: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let request: InterfaceConfig =
        serde_json::from_str(config_json).context("invalid interface config JSON")?;

    check_root()?;
    let exec = SystemExecutor::new(config.command_timeout());
    network::configure_interface(&exec, interface, &request).await?;
    emit(&ActionResponse::ok(format!(
        "interface {} configured",
        interface
    )))
}
