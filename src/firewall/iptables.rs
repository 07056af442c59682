//! iptables listing parser.
//!
//! Consumes the free-text output of `iptables -L <chain> -n --line-numbers`,
//! one fixed chain per invocation. Header lines are discarded; each
//! remaining row is split on whitespace and mapped positionally:
//!
//! ```text
//! num  target  prot  opt  source       destination
//! 1    ACCEPT  tcp   --   10.0.0.5     0.0.0.0/0     tcp dpt:80
//! ```
//!
//! The literal `all` protocol and the `0.0.0.0/0` wildcard addresses
//! normalize to absent. Ports are not positional in this grammar; they are
//! recovered by scanning the row for `dpt:`/`spt:` annotations. Column 0 is
//! retained as the positional deletion identity.

use ipnet::IpNet;
use tracing::debug;

use super::rule::{parse_addr_or_cidr, Action, Chain, Protocol, RuleIdentity, RuleRecord};

/// Minimum column count for a parseable rule row.
const MIN_COLUMNS: usize = 6;

/// Parse one chain's listing into rule records.
///
/// Rows with fewer than six columns, rows whose target is outside
/// ACCEPT/DROP/REJECT (LOG, RETURN, user chains), and the header rows are
/// all skipped as unparseable rather than treated as errors.
pub fn parse_chain_listing(chain: Chain, raw: &str) -> Vec<RuleRecord> {
    let mut rules = Vec::new();

    for line in raw.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with("Chain") {
            continue;
        }

        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < MIN_COLUMNS {
            continue;
        }

        // The column-header row fails here ("num" is not a line number)
        let Ok(number) = columns[0].parse::<u32>() else {
            continue;
        };
        let Ok(action) = columns[1].parse::<Action>() else {
            debug!("skipping row with unmodeled target '{}': {}", columns[1], line);
            continue;
        };

        rules.push(RuleRecord {
            chain,
            table: None,
            protocol: parse_protocol_column(columns[2]),
            source_address: parse_address_column(columns[4]),
            dest_address: parse_address_column(columns[5]),
            source_port: scan_port(line, "spt:"),
            dest_port: scan_port(line, "dpt:"),
            action,
            identity: RuleIdentity::Line { number },
            raw: line.to_string(),
        });
    }

    rules
}

/// `all` (and unknown protocol spellings) normalize to absent.
fn parse_protocol_column(column: &str) -> Option<Protocol> {
    if column == "all" {
        return None;
    }
    column.parse::<Protocol>().ok()
}

/// The `0.0.0.0/0` wildcard normalizes to absent.
fn parse_address_column(column: &str) -> Option<IpNet> {
    if column == "0.0.0.0/0" {
        return None;
    }
    parse_addr_or_cidr(column).ok()
}

/// Scan the row's free text for a `dpt:`/`spt:` marker followed by digits.
fn scan_port(line: &str, marker: &str) -> Option<u16> {
    let rest = &line[line.find(marker)? + marker.len()..];
    let digits: &str = &rest[..rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len())];
    digits.parse().ok()
}
