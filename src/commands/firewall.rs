//! Firewall command implementations.

use std::path::Path;

use anyhow::{Context, Result};

use super::{emit, ActionResponse};
use crate::config::Config;
use crate::exec::check_root;
use crate::firewall::{Chain, Firewall, RuleSpec};

pub async fn list(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let rules = Firewall::new(&config).list().await?;
    emit(&rules)
}

pub async fn add(config_path: &Path, rule_json: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let spec: RuleSpec =
        serde_json::from_str(rule_json).context("invalid rule JSON")?;

    check_root()?;
    Firewall::new(&config).add(&spec).await?;
    emit(&ActionResponse::ok("firewall rule added"))
}

pub async fn delete(config_path: &Path, chain: &str, line: u32) -> Result<()> {
    let config = Config::load(config_path)?;
    let chain: Chain = chain.parse()?;

    check_root()?;
    Firewall::new(&config).delete(chain, line).await?;
    emit(&ActionResponse::ok(format!(
        "deleted rule {} from chain {}",
        line, chain
    )))
}

pub async fn save(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    check_root()?;
    let report = Firewall::new(&config).save().await?;
    emit(&report)
}

pub async fn status(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let status = Firewall::new(&config).status().await?;
    emit(&status)
}
