//! Configuration for routerctl.
//!
//! All fields have working defaults, so the config file is optional: a
//! missing file yields [`Config::default`], a present but malformed file is
//! an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/routerctl/config.json";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bounded wait for external invocations, in seconds
    pub command_timeout_secs: u64,

    /// ISC dhcpd leases file
    pub dhcpd_leases_path: PathBuf,

    /// dnsmasq leases file (fallback when the ISC file is absent)
    pub dnsmasq_leases_path: PathBuf,

    /// Where `firewall save` persists the iptables ruleset dump
    pub iptables_rules_path: PathBuf,

    /// Where `firewall save` persists the nftables ruleset dump
    pub nftables_rules_path: PathBuf,

    /// systemd units reported by `system status` / `system services`
    pub managed_units: Vec<String>,

    /// Unit glob used by `system logs` when no unit is given
    pub journal_unit_glob: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_secs: 10,
            dhcpd_leases_path: PathBuf::from("/var/lib/dhcp/dhcpd.leases"),
            dnsmasq_leases_path: PathBuf::from("/var/lib/misc/dnsmasq.leases"),
            iptables_rules_path: PathBuf::from("/etc/iptables/rules.v4"),
            nftables_rules_path: PathBuf::from("/etc/nftables.conf"),
            managed_units: vec![
                "dnsmasq".to_string(),
                "NetworkManager".to_string(),
                "hostapd".to_string(),
                "iptables".to_string(),
                "nftables".to_string(),
            ],
            journal_unit_glob: "routerctl*".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Bounded wait as a [`Duration`].
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
