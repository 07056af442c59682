//! nftables listing parser.
//!
//! Consumes the free-text output of `nft list ruleset` as a small
//! line-oriented state machine. Two pieces of context are carried forward:
//! the current table (lines beginning with `table`) and the current chain
//! (lines beginning with `chain`, trailing brace stripped). Lines beginning
//! with a protocol token (`ip`, `tcp`, `udp`) are rule lines; everything
//! else is ignored, not rejected - the grammar is deliberately partial.

use std::net::{IpAddr, Ipv4Addr};

use ipnet::{IpNet, Ipv4Net};
use tracing::debug;

use super::rule::{Action, Chain, Protocol, RuleIdentity, RuleRecord};

/// Parse a full `nft list ruleset` listing into rule records.
///
/// Rules in chains other than INPUT/FORWARD/OUTPUT (case-insensitive) are
/// outside the model and skipped.
pub fn parse_ruleset(raw: &str) -> Vec<RuleRecord> {
    let mut current_table: Option<String> = None;
    let mut current_chain: Option<String> = None;
    let mut rules = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("table") => {
                // "table ip filter {" - the family token precedes the name
                current_table = tokens.find(|t| *t != "ip" && *t != "ip6" && *t != "inet")
                    .map(|name| name.trim_end_matches('{').to_string());
            }
            Some("chain") => {
                current_chain = tokens
                    .next()
                    .map(|name| name.trim_end_matches('{').to_string());
            }
            Some("ip" | "tcp" | "udp") => {
                if let Some(rule) =
                    extract_rule(line, current_table.as_deref(), current_chain.as_deref())
                {
                    rules.push(rule);
                } else {
                    debug!("skipping unparseable nft rule line: {}", line);
                }
            }
            _ => {}
        }
    }

    rules
}

/// Per-line extractor for a rule line.
///
/// Returns `None` when the line cannot be attributed to one of the fixed
/// chains or carries no recognizable action. Other missing fields simply
/// stay absent; partial extraction is never fatal.
fn extract_rule(line: &str, table: Option<&str>, chain: Option<&str>) -> Option<RuleRecord> {
    let chain = chain?.parse::<Chain>().ok()?;
    let action = extract_action(line)?;
    let protocol = extract_protocol(line);
    let (source_address, dest_address) = extract_addresses(line);
    let (source_port, dest_port) = extract_ports(line);

    Some(RuleRecord {
        chain,
        table: table.map(str::to_string),
        protocol,
        source_address,
        dest_address,
        source_port,
        dest_port,
        action,
        identity: RuleIdentity::Context,
        raw: line.to_string(),
    })
}

/// Substring containment with fixed precedence tcp > udp > icmp; a line
/// naming several protocols is attributed to the first match.
fn extract_protocol(line: &str) -> Option<Protocol> {
    if line.contains("tcp") {
        Some(Protocol::Tcp)
    } else if line.contains("udp") {
        Some(Protocol::Udp)
    } else if line.contains("icmp") {
        Some(Protocol::Icmp)
    } else {
        None
    }
}

/// Substring containment with fixed precedence accept > drop > reject.
fn extract_action(line: &str) -> Option<Action> {
    if line.contains("accept") {
        Some(Action::Accept)
    } else if line.contains("drop") {
        Some(Action::Drop)
    } else if line.contains("reject") {
        Some(Action::Reject)
    } else {
        None
    }
}

/// Up to two dotted-quad (optionally CIDR-suffixed) tokens, positionally
/// source then destination. A single address is taken as the source.
fn extract_addresses(line: &str) -> (Option<IpNet>, Option<IpNet>) {
    let mut found = line.split_whitespace().filter_map(parse_quad_token);
    let source = found.next();
    let dest = found.next();
    (source, dest)
}

fn parse_quad_token(token: &str) -> Option<IpNet> {
    let token = token.trim_matches(|c| c == ',' || c == ';');
    if token.contains('/') {
        token.parse::<Ipv4Net>().ok().map(IpNet::V4)
    } else {
        token
            .parse::<Ipv4Addr>()
            .ok()
            .map(|ip| IpNet::from(IpAddr::V4(ip)))
    }
}

/// Port recovery.
///
/// `sport`/`dport` keywords bind the integer that follows them. Remaining
/// bare integer tokens then fill unset slots positionally, source first.
/// Known limitation: an unrelated bare numeric token (a counter value, a
/// standalone prefix length) can be misattributed as a port this way; it is
/// preserved as a documented imprecision of the free-text grammar.
fn extract_ports(line: &str) -> (Option<u16>, Option<u16>) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut source_port: Option<u16> = None;
    let mut dest_port: Option<u16> = None;
    let mut bare = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        if matches!(tokens[i], "sport" | "dport") && i + 1 < tokens.len() {
            if let Ok(port) = tokens[i + 1].trim_end_matches(';').parse::<u16>() {
                match tokens[i] {
                    "sport" => source_port = source_port.or(Some(port)),
                    _ => dest_port = dest_port.or(Some(port)),
                }
                i += 2;
                continue;
            }
        } else if let Ok(port) = tokens[i].parse::<u16>() {
            bare.push(port);
        }
        i += 1;
    }

    let mut bare = bare.into_iter();
    if source_port.is_none() {
        source_port = bare.next();
    }
    if dest_port.is_none() {
        dest_port = bare.next();
    }
    (source_port, dest_port)
}
