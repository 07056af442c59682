//! System command implementations.

use std::path::Path;

use anyhow::Result;

use super::{emit, ActionResponse};
use crate::config::Config;
use crate::exec::{check_root, SystemExecutor};
use crate::system;

pub async fn status(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let exec = SystemExecutor::new(config.command_timeout());
    emit(&system::system_status(&exec, &config).await?)
}

pub fn resources() -> Result<()> {
    emit(&system::resource_usage()?)
}

pub async fn reboot(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    check_root()?;
    let exec = SystemExecutor::new(config.command_timeout());
    system::reboot(&exec).await?;
    emit(&ActionResponse::ok("reboot requested"))
}

pub async fn logs(config_path: &Path, unit: &str, lines: u32) -> Result<()> {
    let config = Config::load(config_path)?;
    let exec = SystemExecutor::new(config.command_timeout());
    emit(&system::journal_logs(&exec, &config, unit, lines).await?)
}

pub async fn services(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let exec = SystemExecutor::new(config.command_timeout());
    emit(&system::service_status(&exec, &config).await)
}

pub async fn service(config_path: &Path, name: &str, action: &str) -> Result<()> {
    let config = Config::load(config_path)?;

    check_root()?;
    let exec = SystemExecutor::new(config.command_timeout());
    system::service_control(&exec, name, action).await?;
    emit(&ActionResponse::ok(format!("{} {}", action, name)))
}
