//! Firewall backend selection, listing, mutation, and persistence.
//!
//! The host may run nftables (modern) or iptables (legacy); [`Firewall`]
//! probes for the usable tool on every call, so a host can transition
//! between tools without restarting the management layer. No ruleset state
//! is cached: every listing is a fresh read of live kernel state, and the
//! engine provides no locking - callers serialize their own mutations.

mod iptables;
mod nft;
mod rule;

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use rule::{
    parse_addr_or_cidr, Action, Chain, Protocol, RuleIdentity, RuleRecord, RuleSpec, ValidRule,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec::{args_to_strings, run_checked, CommandExecutor, SystemExecutor};

/// Which packet-filter tool is usable on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Nftables,
    Iptables,
    Unavailable,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Nftables => "nftables",
            Backend::Iptables => "iptables",
            Backend::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Firewall service status report.
#[derive(Debug, Serialize)]
pub struct FirewallStatus {
    pub backend: Backend,
    pub service: Option<String>,
    pub active: bool,
    pub error: Option<String>,
}

/// Persistence report returned by [`Firewall::save`].
#[derive(Debug, Serialize)]
pub struct SaveReport {
    pub backend: Backend,
    pub path: String,
}

/// Uniform view of the host firewall across both backends.
pub struct Firewall {
    exec: Box<dyn CommandExecutor>,
    config: Config,
}

impl Firewall {
    /// Firewall driven by real system commands under the configured timeout.
    pub fn new(config: &Config) -> Self {
        Self::with_executor(config, Box::new(SystemExecutor::new(config.command_timeout())))
    }

    /// Firewall with an injected executor (tests).
    pub fn with_executor(config: &Config, exec: Box<dyn CommandExecutor>) -> Self {
        Self {
            exec,
            config: config.clone(),
        }
    }

    /// Detect the usable backend. nftables is probed first; iptables is
    /// probed per fixed chain. The choice is re-evaluated on every call.
    pub async fn select(&self) -> Backend {
        if let Ok(output) = self
            .exec
            .run("nft", &args_to_strings(&["list", "ruleset"]))
            .await
        {
            if output.success {
                return Backend::Nftables;
            }
        }

        for chain in Chain::ALL {
            let args = args_to_strings(&["-L", chain.as_str(), "-n", "--line-numbers"]);
            if let Ok(output) = self.exec.run("iptables", &args).await {
                if output.success {
                    return Backend::Iptables;
                }
            }
        }

        warn!("no usable firewall backend (tried nft and iptables)");
        Backend::Unavailable
    }

    /// List the live ruleset as canonical records.
    ///
    /// An unavailable backend is not fatal: the listing degrades to an
    /// empty set with a logged diagnostic.
    pub async fn list(&self) -> Result<Vec<RuleRecord>> {
        match self.select().await {
            Backend::Nftables => {
                let raw =
                    run_checked(self.exec.as_ref(), "nft", &args_to_strings(&["list", "ruleset"]))
                        .await?;
                Ok(nft::parse_ruleset(&raw))
            }
            Backend::Iptables => {
                let mut rules = Vec::new();
                for chain in Chain::ALL {
                    let args =
                        args_to_strings(&["-L", chain.as_str(), "-n", "--line-numbers"]);
                    match run_checked(self.exec.as_ref(), "iptables", &args).await {
                        Ok(raw) => rules.extend(iptables::parse_chain_listing(chain, &raw)),
                        Err(err) => debug!("listing chain {} failed: {}", chain, err),
                    }
                }
                Ok(rules)
            }
            Backend::Unavailable => {
                warn!("firewall listing unavailable; returning empty rule set");
                Ok(Vec::new())
            }
        }
    }

    /// Validate and add a rule.
    ///
    /// Validation happens before any external process is started; a
    /// non-zero exit from the tool surfaces its diagnostic verbatim and
    /// means the ruleset is unchanged. No retry.
    pub async fn add(&self, spec: &RuleSpec) -> Result<()> {
        let rule = spec.validate()?;

        match self.select().await {
            Backend::Iptables => {
                let args = build_iptables_add(&rule);
                run_checked(self.exec.as_ref(), "iptables", &args).await?;
            }
            Backend::Nftables => {
                let args = build_nft_add(&rule)?;
                run_checked(self.exec.as_ref(), "nft", &args).await?;
            }
            Backend::Unavailable => return Err(Error::BackendUnavailable),
        }

        info!("added {} rule on chain {}", rule.action, rule.chain);
        Ok(())
    }

    /// Delete a rule by positional line number (iptables only).
    ///
    /// A successful delete renumbers every subsequent rule in the chain
    /// downward by one: batched deletions must proceed highest-first or
    /// re-list between deletions. That ordering is the caller's job.
    pub async fn delete(&self, chain: Chain, line_number: u32) -> Result<()> {
        match self.select().await {
            Backend::Iptables => {
                let args =
                    args_to_strings(&["-D", chain.as_str(), &line_number.to_string()]);
                run_checked(self.exec.as_ref(), "iptables", &args).await?;
                info!("deleted rule {} from chain {}", line_number, chain);
                Ok(())
            }
            Backend::Nftables => Err(Error::Validation(
                "positional delete is only supported on the iptables backend; \
                 nftables rules expose no stable line number"
                    .to_string(),
            )),
            Backend::Unavailable => Err(Error::BackendUnavailable),
        }
    }

    /// Dump the live ruleset and persist it so it survives a restart.
    ///
    /// Fire-and-forget: a failure is reported but never retried. The dump
    /// is written atomically (temp file, then rename) so a timeout or kill
    /// never leaves a half-written rules file.
    pub async fn save(&self) -> Result<SaveReport> {
        let (backend, dump, path) = match self.select().await {
            Backend::Iptables => {
                let dump = run_checked(self.exec.as_ref(), "iptables-save", &[]).await?;
                (Backend::Iptables, dump, self.config.iptables_rules_path.clone())
            }
            Backend::Nftables => {
                let dump =
                    run_checked(self.exec.as_ref(), "nft", &args_to_strings(&["list", "ruleset"]))
                        .await?;
                (Backend::Nftables, dump, self.config.nftables_rules_path.clone())
            }
            Backend::Unavailable => return Err(Error::BackendUnavailable),
        };

        write_atomically(&path, &dump)?;
        info!("persisted {} ruleset to {}", backend, path.display());
        Ok(SaveReport {
            backend,
            path: path.display().to_string(),
        })
    }

    /// Report the active backend and its service state.
    pub async fn status(&self) -> Result<FirewallStatus> {
        let backend = self.select().await;
        let service = match backend {
            Backend::Nftables => "nftables",
            Backend::Iptables => "iptables",
            Backend::Unavailable => {
                return Ok(FirewallStatus {
                    backend,
                    service: None,
                    active: false,
                    error: Some("no usable firewall backend".to_string()),
                })
            }
        };

        let output = self
            .exec
            .run("systemctl", &args_to_strings(&["is-active", service]))
            .await?;
        Ok(FirewallStatus {
            backend,
            service: Some(service.to_string()),
            active: output.success,
            error: if output.success {
                None
            } else {
                Some(output.stderr.trim().to_string())
            },
        })
    }
}

/// iptables add command: optional arguments only for present fields, the
/// action argument always last.
fn build_iptables_add(rule: &ValidRule) -> Vec<String> {
    let mut args = vec!["-A".to_string(), rule.chain.as_str().to_string()];

    if let Some(protocol) = rule.protocol {
        args.push("-p".to_string());
        args.push(protocol.as_str().to_string());
    }
    if let Some(source) = rule.source_address {
        args.push("-s".to_string());
        args.push(source.to_string());
    }
    if let Some(dest) = rule.dest_address {
        args.push("-d".to_string());
        args.push(dest.to_string());
    }
    if let Some(port) = rule.source_port {
        args.push("--sport".to_string());
        args.push(port.to_string());
    }
    if let Some(port) = rule.dest_port {
        args.push("--dport".to_string());
        args.push(port.to_string());
    }

    args.push("-j".to_string());
    args.push(rule.action.as_str().to_string());
    args
}

/// nft add command targeting the `filter` table. Port matches need a
/// transport protocol expression, so a rule with ports but no protocol is
/// rejected on this backend.
fn build_nft_add(rule: &ValidRule) -> Result<Vec<String>> {
    let mut args = vec![
        "add".to_string(),
        "rule".to_string(),
        "ip".to_string(),
        "filter".to_string(),
        rule.chain.as_str().to_ascii_lowercase(),
    ];

    if let Some(source) = rule.source_address {
        args.extend(["ip".to_string(), "saddr".to_string(), source.to_string()]);
    }
    if let Some(dest) = rule.dest_address {
        args.extend(["ip".to_string(), "daddr".to_string(), dest.to_string()]);
    }

    let has_ports = rule.source_port.is_some() || rule.dest_port.is_some();
    match (rule.protocol, has_ports) {
        (Some(protocol), true) => {
            if let Some(port) = rule.source_port {
                args.extend([
                    protocol.as_str().to_string(),
                    "sport".to_string(),
                    port.to_string(),
                ]);
            }
            if let Some(port) = rule.dest_port {
                args.extend([
                    protocol.as_str().to_string(),
                    "dport".to_string(),
                    port.to_string(),
                ]);
            }
        }
        (Some(protocol), false) => {
            args.extend([
                "ip".to_string(),
                "protocol".to_string(),
                protocol.as_str().to_string(),
            ]);
        }
        (None, true) => {
            return Err(Error::Validation(
                "a protocol is required to match ports on the nftables backend".to_string(),
            ))
        }
        (None, false) => {}
    }

    args.push(rule.action.as_str().to_ascii_lowercase());
    Ok(args)
}

/// Write `content` to `path` via a temp file in the same directory plus a
/// rename, so readers never observe a partial file.
fn write_atomically(path: &Path, content: &str) -> Result<()> {
    use std::io::Write;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CommandOutput, MockCommandExecutor};

    fn ok_output(stdout: &str) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    fn failed_output(stderr: &str) -> CommandOutput {
        CommandOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            success: false,
            code: Some(1),
        }
    }

    fn firewall(mock: MockCommandExecutor) -> Firewall {
        Firewall::with_executor(&Config::default(), Box::new(mock))
    }

    const NFT_RULESET: &str = "\
table ip filter {
	chain INPUT {
		ip saddr 10.0.0.0/24 tcp dport 22 accept
	}
}
";

    const IPT_INPUT: &str = "\
Chain INPUT (policy ACCEPT)
num  target     prot opt source               destination
1    ACCEPT     tcp  --  10.0.0.5             0.0.0.0/0            tcp dpt:80
";

    const IPT_EMPTY: &str = "\
Chain X (policy ACCEPT)
num  target     prot opt source               destination
";

    /// Mock where nft works; iptables must never be probed.
    fn nft_host() -> MockCommandExecutor {
        let mut mock = MockCommandExecutor::new();
        mock.expect_run()
            .withf(|program, _| program == "nft")
            .returning(|_, _| Ok(ok_output(NFT_RULESET)));
        mock
    }

    /// Mock where nft is absent and iptables answers chain listings.
    fn iptables_host() -> MockCommandExecutor {
        let mut mock = MockCommandExecutor::new();
        mock.expect_run()
            .withf(|program, _| program == "nft")
            .returning(|program, _| {
                Err(Error::Launch {
                    program: program.to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
            });
        mock.expect_run()
            .withf(|program, args| program == "iptables" && args.first().map(String::as_str) == Some("-L"))
            .returning(|_, args| {
                if args[1] == "INPUT" {
                    Ok(ok_output(IPT_INPUT))
                } else {
                    Ok(ok_output(IPT_EMPTY))
                }
            });
        mock
    }

    #[tokio::test]
    async fn test_select_prefers_nftables_when_both_usable() {
        // iptables expectations are deliberately absent: probing it while
        // nft works would panic the mock.
        let fw = firewall(nft_host());
        assert_eq!(fw.select().await, Backend::Nftables);
    }

    #[tokio::test]
    async fn test_select_falls_back_to_iptables() {
        let fw = firewall(iptables_host());
        assert_eq!(fw.select().await, Backend::Iptables);
    }

    #[tokio::test]
    async fn test_select_unavailable_when_neither_tool_works() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_run()
            .returning(|_, _| Ok(failed_output("command not found")));
        let fw = firewall(mock);
        assert_eq!(fw.select().await, Backend::Unavailable);
    }

    #[tokio::test]
    async fn test_list_unavailable_degrades_to_empty_set() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_run()
            .returning(|_, _| Ok(failed_output("nope")));
        let fw = firewall(mock);
        assert!(fw.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_nftables() {
        let fw = firewall(nft_host());
        let rules = fw.list().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].chain, Chain::Input);
        assert_eq!(rules[0].identity, RuleIdentity::Context);
        assert_eq!(rules[0].dest_port, Some(22));
    }

    #[tokio::test]
    async fn test_list_iptables() {
        let fw = firewall(iptables_host());
        let rules = fw.list().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].identity, RuleIdentity::Line { number: 1 });
        assert_eq!(rules[0].dest_port, Some(80));
    }

    #[tokio::test]
    async fn test_add_invalid_chain_performs_no_invocation() {
        // No expectations set: any executor call would panic the mock.
        let fw = firewall(MockCommandExecutor::new());
        let spec = RuleSpec {
            chain: "DMZ".to_string(),
            action: "ACCEPT".to_string(),
            ..Default::default()
        };
        let err = fw.add(&spec).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_invalid_action_performs_no_invocation() {
        let fw = firewall(MockCommandExecutor::new());
        let spec = RuleSpec {
            chain: "INPUT".to_string(),
            action: "LOG".to_string(),
            ..Default::default()
        };
        assert!(matches!(fw.add(&spec).await.unwrap_err(), Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_builds_iptables_command() {
        let mut mock = iptables_host();
        mock.expect_run()
            .withf(|program, args| {
                program == "iptables"
                    && args
                        == [
                            "-A", "INPUT", "-p", "tcp", "-s", "10.0.0.0/24", "--dport", "22",
                            "-j", "ACCEPT",
                        ]
            })
            .times(1)
            .returning(|_, _| Ok(ok_output("")));

        let fw = firewall(mock);
        let spec = RuleSpec {
            chain: "INPUT".to_string(),
            protocol: Some("tcp".to_string()),
            source_address: Some("10.0.0.0/24".to_string()),
            dest_port: Some(22),
            action: "ACCEPT".to_string(),
            ..Default::default()
        };
        fw.add(&spec).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_builds_nft_command() {
        let mut mock = MockCommandExecutor::new();
        // Backend probe
        mock.expect_run()
            .withf(|program, args| program == "nft" && args.first().map(String::as_str) == Some("list"))
            .returning(|_, _| Ok(ok_output(NFT_RULESET)));
        mock.expect_run()
            .withf(|program, args| {
                program == "nft"
                    && args
                        == [
                            "add", "rule", "ip", "filter", "input", "ip", "saddr",
                            "10.0.0.5/32", "tcp", "dport", "443", "accept",
                        ]
            })
            .times(1)
            .returning(|_, _| Ok(ok_output("")));

        let fw = firewall(mock);
        let spec = RuleSpec {
            chain: "INPUT".to_string(),
            protocol: Some("tcp".to_string()),
            source_address: Some("10.0.0.5".to_string()),
            dest_port: Some(443),
            action: "ACCEPT".to_string(),
            ..Default::default()
        };
        fw.add(&spec).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_ports_without_protocol_rejected_on_nftables() {
        let fw = firewall(nft_host());
        let spec = RuleSpec {
            chain: "INPUT".to_string(),
            dest_port: Some(22),
            action: "DROP".to_string(),
            ..Default::default()
        };
        assert!(matches!(fw.add(&spec).await.unwrap_err(), Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_failure_surfaces_tool_diagnostic() {
        let mut mock = iptables_host();
        mock.expect_run()
            .withf(|program, args| program == "iptables" && args.first().map(String::as_str) == Some("-A"))
            .returning(|_, _| Ok(failed_output("iptables: No chain/target/match by that name.")));

        let fw = firewall(mock);
        let spec = RuleSpec {
            chain: "INPUT".to_string(),
            action: "DROP".to_string(),
            ..Default::default()
        };
        match fw.add(&spec).await.unwrap_err() {
            Error::CommandFailed { stderr, .. } => {
                assert_eq!(stderr, "iptables: No chain/target/match by that name.");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_builds_positional_command() {
        let mut mock = iptables_host();
        mock.expect_run()
            .withf(|program, args| program == "iptables" && args == ["-D", "FORWARD", "3"])
            .times(1)
            .returning(|_, _| Ok(ok_output("")));

        let fw = firewall(mock);
        fw.delete(Chain::Forward, 3).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_rejected_on_nftables() {
        let fw = firewall(nft_host());
        let err = fw.delete(Chain::Input, 1).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_save_writes_ruleset_dump_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.nftables_rules_path = dir.path().join("nftables.conf");

        let mock = nft_host();
        let fw = Firewall::with_executor(&config, Box::new(mock));
        let report = fw.save().await.unwrap();

        assert_eq!(report.backend, Backend::Nftables);
        let written = std::fs::read_to_string(&config.nftables_rules_path).unwrap();
        assert_eq!(written, NFT_RULESET);
    }

    #[tokio::test]
    async fn test_save_unavailable_is_error() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_run()
            .returning(|_, _| Ok(failed_output("no tools")));
        let fw = firewall(mock);
        assert!(matches!(fw.save().await.unwrap_err(), Error::BackendUnavailable));
    }

    #[tokio::test]
    async fn test_status_reports_backend_and_service() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_run()
            .withf(|program, _| program == "nft")
            .returning(|_, _| Ok(ok_output(NFT_RULESET)));
        mock.expect_run()
            .withf(|program, args| program == "systemctl" && args == ["is-active", "nftables"])
            .times(1)
            .returning(|_, _| Ok(ok_output("active\n")));

        let fw = firewall(mock);
        let status = fw.status().await.unwrap();
        assert_eq!(status.backend, Backend::Nftables);
        assert!(status.active);
        assert_eq!(status.service.as_deref(), Some("nftables"));
    }
}
