//! DHCP lease enumeration.
//!
//! Reads the ISC dhcpd leases file when present, falling back to the
//! dnsmasq leases file. Missing files are not fatal: the listing degrades
//! to an empty set with a logged diagnostic.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;

const ISC_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseState {
    Active,
    Expired,
}

/// A single DHCP lease.
#[derive(Debug, Clone, Serialize)]
pub struct Lease {
    pub ip_address: String,
    pub mac_address: Option<String>,
    pub hostname: Option<String>,
    pub starts: Option<NaiveDateTime>,
    pub ends: Option<NaiveDateTime>,
    pub state: LeaseState,
}

/// Enumerate current leases from the configured files.
pub fn load_leases(config: &Config) -> Vec<Lease> {
    let now = Local::now().naive_local();

    match std::fs::read_to_string(&config.dhcpd_leases_path) {
        Ok(content) => return parse_dhcpd_leases(&content, now),
        Err(err) => debug!(
            "no ISC leases file at {}: {}",
            config.dhcpd_leases_path.display(),
            err
        ),
    }

    match std::fs::read_to_string(&config.dnsmasq_leases_path) {
        Ok(content) => parse_dnsmasq_leases(&content, now),
        Err(err) => {
            warn!(
                "no DHCP leases file found ({} or {}): {}",
                config.dhcpd_leases_path.display(),
                config.dnsmasq_leases_path.display(),
                err
            );
            Vec::new()
        }
    }
}

/// Parse ISC dhcpd leases: `lease <ip> { ... }` blocks with
/// `hardware ethernet`, `client-hostname`, and `starts`/`ends` statements.
pub fn parse_dhcpd_leases(content: &str, now: NaiveDateTime) -> Vec<Lease> {
    let mut leases = Vec::new();
    let mut current: Option<Lease> = None;

    for line in content.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("lease ") {
            let ip = rest.trim_end_matches('{').trim();
            current = Some(Lease {
                ip_address: ip.to_string(),
                mac_address: None,
                hostname: None,
                starts: None,
                ends: None,
                state: LeaseState::Active,
            });
            continue;
        }

        if line.starts_with('}') {
            if let Some(mut lease) = current.take() {
                if lease.ends.is_some_and(|ends| ends < now) {
                    lease.state = LeaseState::Expired;
                }
                leases.push(lease);
            }
            continue;
        }

        let Some(lease) = current.as_mut() else {
            continue;
        };

        if let Some(rest) = line.strip_prefix("hardware ethernet ") {
            lease.mac_address = Some(rest.trim_end_matches(';').to_string());
        } else if let Some(rest) = line.strip_prefix("client-hostname ") {
            lease.hostname = Some(rest.trim_end_matches(';').trim_matches('"').to_string());
        } else if line.starts_with("starts") {
            lease.starts = parse_isc_time(line);
        } else if line.starts_with("ends") {
            lease.ends = parse_isc_time(line);
        }
    }

    leases
}

/// Extract the timestamp from a `starts <weekday> 2024/01/05 10:22:00;`
/// statement. The weekday number is skipped by looking for the token that
/// carries the date separators.
fn parse_isc_time(line: &str) -> Option<NaiveDateTime> {
    let mut tokens = line.split_whitespace();
    let date = tokens.find(|t| t.contains('/'))?;
    let time = tokens.next()?.trim_end_matches(';');
    NaiveDateTime::parse_from_str(&format!("{} {}", date, time), ISC_TIME_FORMAT).ok()
}

/// Parse dnsmasq leases: one `<expiry-epoch> <mac> <ip> [hostname] ...` row
/// per lease. A hostname of `*` means unknown.
pub fn parse_dnsmasq_leases(content: &str, now: NaiveDateTime) -> Vec<Lease> {
    let mut leases = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let ends = parts[0]
            .parse::<i64>()
            .ok()
            .and_then(|epoch| chrono::DateTime::from_timestamp(epoch, 0))
            .map(|dt| dt.naive_local());
        let state = match ends {
            Some(ends) if ends < now => LeaseState::Expired,
            _ => LeaseState::Active,
        };

        leases.push(Lease {
            ip_address: parts[2].to_string(),
            mac_address: Some(parts[1].to_string()),
            hostname: parts.get(3).filter(|h| **h != "*").map(|h| h.to_string()),
            starts: None,
            ends,
            state,
        });
    }

    leases
}
