//! # routerctl - Management CLI for Hybrid Router Hosts
//!
//! A single binary giving a management layer a uniform, JSON-speaking view of
//! a Linux router host: firewall rules, DHCP leases, network interfaces, and
//! system services.
//!
//! The hard part is the firewall layer. A host may run either of two mutually
//! incompatible packet filters:
//!
//! - **nftables** (modern) - rules live in table/chain context with no stable
//!   numeric handle exposed by the listing.
//! - **iptables** (legacy) - a fixed set of flat chains where rules are
//!   addressed by per-chain positional line number.
//!
//! routerctl detects which tool is usable, recovers a canonical
//! [`firewall::RuleRecord`] model from either listing grammar, and synthesizes
//! backend-correct mutation commands, so callers never need to know which
//! filter is present.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       routerctl                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Groups: firewall, dhcp, network, system              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_json)                                        │
//! │    └── Paths, managed units, command timeout                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Firewall (Backend tagged enum)                             │
//! │    ├── nft listing parser (table/chain state machine)       │
//! │    ├── iptables listing parser (positional columns)         │
//! │    ├── mutation engine (add / positional delete)            │
//! │    └── persistence gateway (atomic ruleset dump)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Collaborators (single-shot read or invoke)                 │
//! │    ├── dhcp    - lease file parsing                         │
//! │    ├── network - interfaces, routes, DNS, configuration     │
//! │    └── system  - status, logs, services, reboot             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Exec (CommandExecutor trait)                               │
//! │    └── Bounded-wait tokio process invocation, mockable      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency model
//!
//! Every operation is a single external invocation under a fixed timeout.
//! Nothing is cached: each listing re-reads live kernel state. The engine
//! does not lock the shared firewall state; serializing mutations (and not
//! reusing positional identities across them) is the caller's job.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Runtime configuration (paths, units, timeout)
//! - [`dhcp`] - DHCP lease file parsing
//! - [`error`] - Error taxonomy
//! - [`exec`] - Bounded-wait command execution abstraction
//! - [`firewall`] - Backend selection, listing parsers, mutation engine
//! - [`network`] - Interface, route, and DNS reporting and configuration
//! - [`system`] - System status, logs, and service control

pub mod cli;
pub mod commands;
pub mod config;
pub mod dhcp;
pub mod error;
pub mod exec;
pub mod firewall;
pub mod network;
pub mod system;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{Error, Result};
