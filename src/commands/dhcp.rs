//! DHCP command implementations.

use std::path::Path;

use anyhow::Result;

use super::emit;
use crate::config::Config;
use crate::dhcp::load_leases;

pub fn leases(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    emit(&load_leases(&config))
}
