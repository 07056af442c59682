//! Network interface, route, and DNS reporting plus interface configuration.
//!
//! Reads are single-shot: sysfs/procfs for link state and counters,
//! `ip route show` for the routing table, `/etc/resolv.conf` for DNS.
//! Configuration drives `ip link` / `ip addr` / `ip route` through the
//! bounded-wait executor.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::exec::{args_to_strings, run_checked, CommandExecutor};

const SYS_CLASS_NET: &str = "/sys/class/net";
const PROC_NET_DEV: &str = "/proc/net/dev";
const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Linux IFNAMSIZ minus the trailing NUL.
const MAX_IFACE_NAME_LEN: usize = 15;

/// Per-interface traffic counters from /proc/net/dev.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LinkStats {
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_dropped: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_dropped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Ethernet,
    Wireless,
    Loopback,
}

/// One network interface with its addresses and counters.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceReport {
    pub name: String,
    pub kind: InterfaceKind,
    pub up: bool,
    pub ipv4_addresses: Vec<String>,
    pub stats: Option<LinkStats>,
}

/// One routing table entry.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub destination: String,
    pub gateway: Option<String>,
    pub interface: Option<String>,
    pub metric: Option<u32>,
}

/// Aggregate network status document.
#[derive(Debug, Serialize)]
pub struct NetworkStatus {
    pub timestamp: DateTime<Utc>,
    pub interfaces: Vec<InterfaceReport>,
    pub routing_table: Vec<Route>,
    pub dns_servers: Vec<String>,
    pub default_gateway: Option<String>,
}

/// Interface configuration request (the wire shape). Absent fields are
/// left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub prefix_len: Option<u8>,
    #[serde(default)]
    pub gateway: Option<String>,
}

/// Enumerate interfaces from sysfs, with addresses from `ip -o -4 addr`
/// and counters from /proc/net/dev.
pub async fn list_interfaces(exec: &dyn CommandExecutor) -> Result<Vec<InterfaceReport>> {
    let stats = std::fs::read_to_string(PROC_NET_DEV)
        .map(|content| parse_proc_net_dev(&content))
        .unwrap_or_else(|err| {
            warn!("failed to read {}: {}", PROC_NET_DEV, err);
            HashMap::new()
        });

    let addresses = match run_checked(exec, "ip", &args_to_strings(&["-o", "-4", "addr", "show"]))
        .await
    {
        Ok(raw) => parse_ip_addr_output(&raw),
        Err(err) => {
            debug!("ip addr listing failed: {}", err);
            HashMap::new()
        }
    };

    let mut reports = Vec::new();
    let entries = std::fs::read_dir(SYS_CLASS_NET)?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        reports.push(interface_report(&name, &stats, &addresses));
    }
    reports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(reports)
}

fn interface_report(
    name: &str,
    stats: &HashMap<String, LinkStats>,
    addresses: &HashMap<String, Vec<String>>,
) -> InterfaceReport {
    let kind = if name == "lo" {
        InterfaceKind::Loopback
    } else if name.starts_with("wl")
        || std::path::Path::new(SYS_CLASS_NET)
            .join(name)
            .join("wireless")
            .exists()
    {
        InterfaceKind::Wireless
    } else {
        InterfaceKind::Ethernet
    };

    let operstate =
        std::fs::read_to_string(format!("{}/{}/operstate", SYS_CLASS_NET, name))
            .unwrap_or_default();
    let operstate = operstate.trim();
    // Loopback reports "unknown" while being perfectly up
    let up = operstate == "up" || (operstate == "unknown" && kind == InterfaceKind::Loopback);

    InterfaceReport {
        name: name.to_string(),
        kind,
        up,
        ipv4_addresses: addresses.get(name).cloned().unwrap_or_default(),
        stats: stats.get(name).copied(),
    }
}

/// Parse /proc/net/dev counter rows (two header lines, then
/// `iface: rx_bytes rx_packets errs drop ... tx_bytes tx_packets errs drop ...`).
pub fn parse_proc_net_dev(content: &str) -> HashMap<String, LinkStats> {
    let mut stats = HashMap::new();

    for line in content.lines().skip(2) {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<u64> = counters
            .split_whitespace()
            .map(|f| f.parse().unwrap_or(0))
            .collect();
        if fields.len() < 12 {
            continue;
        }
        stats.insert(
            name.trim().to_string(),
            LinkStats {
                rx_bytes: fields[0],
                rx_packets: fields[1],
                rx_errors: fields[2],
                rx_dropped: fields[3],
                tx_bytes: fields[8],
                tx_packets: fields[9],
                tx_errors: fields[10],
                tx_dropped: fields[11],
            },
        );
    }

    stats
}

/// Parse `ip -o -4 addr show` rows: `2: eth0    inet 10.0.0.2/24 brd ...`.
pub fn parse_ip_addr_output(raw: &str) -> HashMap<String, Vec<String>> {
    let mut addresses: HashMap<String, Vec<String>> = HashMap::new();

    for line in raw.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(inet_pos) = tokens.iter().position(|t| *t == "inet") else {
            continue;
        };
        let (Some(name), Some(addr)) = (tokens.get(1), tokens.get(inet_pos + 1)) else {
            continue;
        };
        addresses
            .entry(name.trim_end_matches(':').to_string())
            .or_default()
            .push((*addr).to_string());
    }

    addresses
}

/// Routing table from `ip route show`.
pub async fn routing_table(exec: &dyn CommandExecutor) -> Result<Vec<Route>> {
    let raw = run_checked(exec, "ip", &args_to_strings(&["route", "show"])).await?;
    Ok(raw.lines().filter_map(parse_route_line).collect())
}

/// Parse one `ip route show` row, e.g.
/// `default via 10.0.0.1 dev eth0 proto dhcp metric 100`.
pub fn parse_route_line(line: &str) -> Option<Route> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let destination = (*tokens.first()?).to_string();

    let after = |keyword: &str| {
        tokens
            .iter()
            .position(|t| *t == keyword)
            .and_then(|pos| tokens.get(pos + 1))
            .map(|t| (*t).to_string())
    };

    Some(Route {
        destination,
        gateway: after("via"),
        interface: after("dev"),
        metric: after("metric").and_then(|m| m.parse().ok()),
    })
}

/// DNS servers from resolv.conf. Missing file degrades to empty.
pub fn dns_servers() -> Vec<String> {
    match std::fs::read_to_string(RESOLV_CONF) {
        Ok(content) => parse_resolv_conf(&content),
        Err(err) => {
            debug!("failed to read {}: {}", RESOLV_CONF, err);
            Vec::new()
        }
    }
}

pub fn parse_resolv_conf(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            line.trim()
                .strip_prefix("nameserver")
                .map(|rest| rest.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Default gateway from the routing table, when one exists.
pub async fn default_gateway(exec: &dyn CommandExecutor) -> Option<String> {
    let raw = run_checked(exec, "ip", &args_to_strings(&["route", "show", "default"]))
        .await
        .ok()?;
    raw.lines().find_map(|line| parse_route_line(line)?.gateway)
}

/// Full network status document.
pub async fn network_status(exec: &dyn CommandExecutor) -> Result<NetworkStatus> {
    Ok(NetworkStatus {
        timestamp: Utc::now(),
        interfaces: list_interfaces(exec).await?,
        routing_table: routing_table(exec).await.unwrap_or_default(),
        dns_servers: dns_servers(),
        default_gateway: default_gateway(exec).await,
    })
}

/// Interface names come from callers and end up in command lines; keep them
/// to the character set the kernel itself allows.
pub fn validate_interface_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IFACE_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid interface name '{}'", name)))
    }
}

/// Apply an [`InterfaceConfig`]: link state, then addressing, then the
/// default route. The first failing step aborts and is reported; earlier
/// steps are not rolled back.
pub async fn configure_interface(
    exec: &dyn CommandExecutor,
    name: &str,
    config: &InterfaceConfig,
) -> Result<()> {
    validate_interface_name(name)?;

    if let Some(address) = &config.ip_address {
        // Validate before flushing anything
        crate::firewall::parse_addr_or_cidr(address)?;
        if config.prefix_len.map_or(false, |p| p > 32) {
            return Err(Error::Validation(format!(
                "invalid prefix length {}",
                config.prefix_len.unwrap_or_default()
            )));
        }
    }
    if let Some(gateway) = &config.gateway {
        crate::firewall::parse_addr_or_cidr(gateway)?;
    }

    if let Some(enabled) = config.enabled {
        let state = if enabled { "up" } else { "down" };
        run_checked(exec, "ip", &args_to_strings(&["link", "set", name, state])).await?;
    }

    if let Some(address) = &config.ip_address {
        let cidr = match config.prefix_len {
            Some(prefix) => format!("{}/{}", address, prefix),
            None => address.clone(),
        };
        run_checked(exec, "ip", &args_to_strings(&["addr", "flush", "dev", name])).await?;
        run_checked(exec, "ip", &args_to_strings(&["addr", "add", &cidr, "dev", name])).await?;
    }

    if let Some(gateway) = &config.gateway {
        run_checked(
            exec,
            "ip",
            &args_to_strings(&["route", "replace", "default", "via", gateway]),
        )
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CommandOutput, MockCommandExecutor};

    const PROC_NET_DEV_SAMPLE: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  123456     789    0    0    0     0          0         0   123456     789    0    0    0     0       0          0
  eth0: 99999999  555555    2    1    0     0          0         0 88888888  444444    3    4    0     0       0          0
";

    #[test]
    fn test_parse_proc_net_dev() {
        let stats = parse_proc_net_dev(PROC_NET_DEV_SAMPLE);
        assert_eq!(stats.len(), 2);

        let eth0 = &stats["eth0"];
        assert_eq!(eth0.rx_bytes, 99_999_999);
        assert_eq!(eth0.rx_errors, 2);
        assert_eq!(eth0.rx_dropped, 1);
        assert_eq!(eth0.tx_bytes, 88_888_888);
        assert_eq!(eth0.tx_packets, 444_444);
        assert_eq!(eth0.tx_dropped, 4);
    }

    #[test]
    fn test_parse_ip_addr_output() {
        let raw = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever
2: eth0    inet 10.0.0.2/24 brd 10.0.0.255 scope global dynamic eth0\\       valid_lft 86117sec
2: eth0    inet 10.0.0.3/24 scope global secondary eth0\\       valid_lft forever
";
        let addresses = parse_ip_addr_output(raw);
        assert_eq!(addresses["lo"], vec!["127.0.0.1/8"]);
        assert_eq!(addresses["eth0"], vec!["10.0.0.2/24", "10.0.0.3/24"]);
    }

    #[test]
    fn test_parse_route_line() {
        let route =
            parse_route_line("default via 10.0.0.1 dev eth0 proto dhcp metric 100").unwrap();
        assert_eq!(route.destination, "default");
        assert_eq!(route.gateway.as_deref(), Some("10.0.0.1"));
        assert_eq!(route.interface.as_deref(), Some("eth0"));
        assert_eq!(route.metric, Some(100));

        let route = parse_route_line("10.0.0.0/24 dev eth0 proto kernel scope link").unwrap();
        assert_eq!(route.gateway, None);
        assert_eq!(route.metric, None);

        assert!(parse_route_line("").is_none());
    }

    #[test]
    fn test_parse_resolv_conf() {
        let content = "\
# Generated by NetworkManager
search lan
nameserver 1.1.1.1
nameserver 9.9.9.9
options edns0
";
        assert_eq!(parse_resolv_conf(content), vec!["1.1.1.1", "9.9.9.9"]);
    }

    #[test]
    fn test_validate_interface_name() {
        assert!(validate_interface_name("eth0").is_ok());
        assert!(validate_interface_name("wlp2s0").is_ok());
        assert!(validate_interface_name("br-lan.10").is_ok());
        assert!(validate_interface_name("").is_err());
        assert!(validate_interface_name("eth0; rm -rf /").is_err());
        assert!(validate_interface_name("averylonginterfacename").is_err());
    }

    #[tokio::test]
    async fn test_configure_interface_rejects_bad_input_without_invocation() {
        let exec = MockCommandExecutor::new();
        let config = InterfaceConfig {
            ip_address: Some("not-an-ip".to_string()),
            ..Default::default()
        };
        let err = configure_interface(&exec, "eth0", &config).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = configure_interface(&exec, "eth0;x", &InterfaceConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_configure_interface_sequences_commands() {
        let mut exec = MockCommandExecutor::new();
        exec.expect_run()
            .withf(|p, args| p == "ip" && args == ["link", "set", "eth1", "up"])
            .times(1)
            .returning(|_, _| Ok(CommandOutput { success: true, ..Default::default() }));
        exec.expect_run()
            .withf(|p, args| p == "ip" && args == ["addr", "flush", "dev", "eth1"])
            .times(1)
            .returning(|_, _| Ok(CommandOutput { success: true, ..Default::default() }));
        exec.expect_run()
            .withf(|p, args| p == "ip" && args == ["addr", "add", "192.168.7.1/24", "dev", "eth1"])
            .times(1)
            .returning(|_, _| Ok(CommandOutput { success: true, ..Default::default() }));
        exec.expect_run()
            .withf(|p, args| p == "ip" && args == ["route", "replace", "default", "via", "192.168.7.254"])
            .times(1)
            .returning(|_, _| Ok(CommandOutput { success: true, ..Default::default() }));

        let config = InterfaceConfig {
            enabled: Some(true),
            ip_address: Some("192.168.7.1".to_string()),
            prefix_len: Some(24),
            gateway: Some("192.168.7.254".to_string()),
        };
        configure_interface(&exec, "eth1", &config).await.unwrap();
    }
}
