//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "routerctl")]
#[command(author, version, about = "Management CLI for hybrid router hosts")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Firewall rules (uniform across nftables and iptables)
    Firewall {
        #[command(subcommand)]
        action: FirewallAction,
    },

    /// DHCP leases
    Dhcp {
        #[command(subcommand)]
        action: DhcpAction,
    },

    /// Network interfaces, routes, and DNS
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },

    /// System status, logs, and services
    System {
        #[command(subcommand)]
        action: SystemAction,
    },

    /// Show version
    Version,
}

#[derive(Subcommand)]
pub enum FirewallAction {
    /// List the live ruleset as canonical records
    List,
    /// Add a rule described as a JSON document
    Add {
        /// Rule JSON, e.g. '{"chain":"INPUT","protocol":"tcp","dest_port":22,"action":"ACCEPT"}'
        rule: String,
    },
    /// Delete a rule by chain and line number (iptables backend only)
    Delete {
        /// Chain (INPUT, FORWARD, OUTPUT)
        chain: String,
        /// 1-based line number from the most recent listing
        line: u32,
    },
    /// Persist the live ruleset so it survives a restart
    Save,
    /// Show the active backend and its service state
    Status,
}

#[derive(Subcommand)]
pub enum DhcpAction {
    /// List current DHCP leases
    Leases,
}

#[derive(Subcommand)]
pub enum NetworkAction {
    /// List interfaces with addresses and counters
    Interfaces,
    /// Full network status (interfaces, routes, DNS, gateway)
    Status,
    /// Configure an interface from a JSON document
    Configure {
        /// Interface name
        interface: String,
        /// Config JSON, e.g. '{"enabled":true,"ip_address":"10.0.0.1","prefix_len":24}'
        config: String,
    },
}

#[derive(Subcommand)]
pub enum SystemAction {
    /// Hostname, uptime, kernel, and managed service states
    Status,
    /// Load averages and memory usage
    Resources,
    /// Reboot the host
    Reboot,
    /// Fetch journal lines
    Logs {
        /// systemd unit ("all" for the managed glob)
        #[arg(long, default_value = "all")]
        unit: String,
        /// Number of lines
        #[arg(long, default_value_t = 100)]
        lines: u32,
    },
    /// Active state of the managed units
    Services,
    /// Control a service (start, stop, restart, enable, disable)
    Service {
        /// Unit name
        name: String,
        /// Action to perform
        action: String,
    },
}
