//! Canonical, backend-agnostic rule representation.
//!
//! A [`RuleRecord`] is created fresh on every listing call and never mutated
//! in place. Its [`RuleIdentity`] is backend-typed: the iptables backend
//! addresses rules by per-chain line number, the nftables backend only by
//! table+chain context plus the raw rule text. Mixing identities across
//! backends is a programming error, not a runtime state.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The three fixed chains modeled by routerctl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    Input,
    Forward,
    Output,
}

impl Chain {
    pub const ALL: [Chain; 3] = [Chain::Input, Chain::Forward, Chain::Output];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Input => "INPUT",
            Chain::Forward => "FORWARD",
            Chain::Output => "OUTPUT",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INPUT" => Ok(Chain::Input),
            "FORWARD" => Ok(Chain::Forward),
            "OUTPUT" => Ok(Chain::Output),
            _ => Err(Error::Validation(format!(
                "invalid chain '{}'; valid chains: INPUT, FORWARD, OUTPUT",
                s
            ))),
        }
    }
}

/// Rule verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Accept,
    Drop,
    Reject,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Accept => "ACCEPT",
            Action::Drop => "DROP",
            Action::Reject => "REJECT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ACCEPT" => Ok(Action::Accept),
            "DROP" => Ok(Action::Drop),
            "REJECT" => Ok(Action::Reject),
            _ => Err(Error::Validation(format!(
                "invalid action '{}'; valid actions: ACCEPT, DROP, REJECT",
                s
            ))),
        }
    }
}

/// Transport/network protocol. Absent means any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "icmp" => Ok(Protocol::Icmp),
            _ => Err(Error::Validation(format!(
                "invalid protocol '{}'; valid protocols: tcp, udp, icmp",
                s
            ))),
        }
    }
}

/// Backend-specific key used to target an existing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleIdentity {
    /// iptables: 1-based position within the chain listing. Every successful
    /// add/delete on the chain shifts positions, so a held line number is
    /// stale after the next mutation and must not be reused.
    Line { number: u32 },
    /// nftables: the rule is addressed only by the table+chain context and
    /// the raw listing text carried on the record; no stable numeric handle
    /// is exposed.
    Context,
}

impl RuleIdentity {
    /// Positional line number, when this is a legacy-backend identity.
    pub fn line_number(&self) -> Option<u32> {
        match self {
            RuleIdentity::Line { number } => Some(*number),
            RuleIdentity::Context => None,
        }
    }
}

/// Canonical firewall rule, recovered from either backend's listing.
///
/// Absent optional fields mean "any" and serialize as explicit nulls, never
/// as empty strings.
#[derive(Debug, Clone, Serialize)]
pub struct RuleRecord {
    pub chain: Chain,
    /// nftables table context; always absent for iptables records
    pub table: Option<String>,
    pub protocol: Option<Protocol>,
    pub source_address: Option<IpNet>,
    pub dest_address: Option<IpNet>,
    pub source_port: Option<u16>,
    pub dest_port: Option<u16>,
    pub action: Action,
    pub identity: RuleIdentity,
    /// Original listing line, kept for diagnostics
    pub raw: String,
}

/// Untyped add request as supplied by the caller (the wire shape).
///
/// Validation happens in [`RuleSpec::validate`], before any external
/// process is started.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSpec {
    pub chain: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub source_address: Option<String>,
    #[serde(default)]
    pub dest_address: Option<String>,
    #[serde(default)]
    pub source_port: Option<u16>,
    #[serde(default)]
    pub dest_port: Option<u16>,
    pub action: String,
}

/// A [`RuleSpec`] that passed validation, with every field strongly typed.
#[derive(Debug, Clone)]
pub struct ValidRule {
    pub chain: Chain,
    pub protocol: Option<Protocol>,
    pub source_address: Option<IpNet>,
    pub dest_address: Option<IpNet>,
    pub source_port: Option<u16>,
    pub dest_port: Option<u16>,
    pub action: Action,
}

impl RuleSpec {
    /// Validate the spec into a [`ValidRule`].
    ///
    /// A protocol of `all` or `any` normalizes to absent; plain addresses
    /// become /32 networks.
    pub fn validate(&self) -> Result<ValidRule> {
        let chain = self.chain.parse::<Chain>()?;
        let action = self.action.parse::<Action>()?;

        let protocol = match self.protocol.as_deref() {
            None | Some("all") | Some("any") => None,
            Some(p) => Some(p.parse::<Protocol>()?),
        };

        let source_address = self
            .source_address
            .as_deref()
            .map(parse_addr_or_cidr)
            .transpose()?;
        let dest_address = self
            .dest_address
            .as_deref()
            .map(parse_addr_or_cidr)
            .transpose()?;

        Ok(ValidRule {
            chain,
            protocol,
            source_address,
            dest_address,
            source_port: self.source_port,
            dest_port: self.dest_port,
            action,
        })
    }
}

/// Parse an address or CIDR; a plain address becomes a /32 (or /128) net.
pub fn parse_addr_or_cidr(s: &str) -> Result<IpNet> {
    if s.contains('/') {
        s.parse()
            .map_err(|_| Error::Validation(format!("invalid CIDR '{}'", s)))
    } else {
        let ip: IpAddr = s
            .parse()
            .map_err(|_| Error::Validation(format!("invalid IP address '{}'", s)))?;
        Ok(IpNet::from(ip))
    }
}
