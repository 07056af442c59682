//! System status, resource usage, logs, and service control.
//!
//! Thin single-shot wrappers over procfs and systemctl/journalctl; no
//! cross-call state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec::{args_to_strings, run_checked, CommandExecutor};

/// Allowed service control verbs; anything else is rejected before
/// systemctl is invoked.
pub const SERVICE_ACTIONS: &[&str] = &["start", "stop", "restart", "enable", "disable"];

/// Overall system status document.
#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub timestamp: DateTime<Utc>,
    pub hostname: String,
    pub uptime_seconds: f64,
    pub kernel: String,
    pub services: BTreeMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct MemoryUsage {
    pub total_kb: u64,
    pub available_kb: u64,
    pub used_kb: u64,
    pub percent: f64,
}

/// Load averages plus memory usage.
#[derive(Debug, Serialize)]
pub struct ResourceUsage {
    pub load_1m: f64,
    pub load_5m: f64,
    pub load_15m: f64,
    pub memory: MemoryUsage,
}

/// Journal excerpt for one unit (or the managed glob).
#[derive(Debug, Serialize)]
pub struct LogReport {
    pub unit: String,
    pub lines: Vec<String>,
}

/// Gather hostname, uptime, kernel version, and managed-unit states.
pub async fn system_status(exec: &dyn CommandExecutor, config: &Config) -> Result<SystemStatus> {
    let hostname = std::fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let uptime_seconds = std::fs::read_to_string("/proc/uptime")
        .ok()
        .and_then(|content| parse_uptime(&content))
        .unwrap_or(0.0);

    let kernel = run_checked(exec, "uname", &args_to_strings(&["-r"]))
        .await
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    Ok(SystemStatus {
        timestamp: Utc::now(),
        hostname,
        uptime_seconds,
        kernel,
        services: service_status(exec, config).await,
    })
}

pub fn parse_uptime(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

/// Load and memory snapshot from procfs.
pub fn resource_usage() -> Result<ResourceUsage> {
    let loadavg = std::fs::read_to_string("/proc/loadavg")?;
    let meminfo = std::fs::read_to_string("/proc/meminfo")?;
    let (load_1m, load_5m, load_15m) = parse_loadavg(&loadavg)
        .ok_or_else(|| Error::Validation("unparseable /proc/loadavg".to_string()))?;
    let memory = parse_meminfo(&meminfo)
        .ok_or_else(|| Error::Validation("unparseable /proc/meminfo".to_string()))?;

    Ok(ResourceUsage {
        load_1m,
        load_5m,
        load_15m,
        memory,
    })
}

pub fn parse_loadavg(content: &str) -> Option<(f64, f64, f64)> {
    let mut fields = content.split_whitespace();
    Some((
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
    ))
}

pub fn parse_meminfo(content: &str) -> Option<MemoryUsage> {
    let field = |name: &str| {
        content.lines().find_map(|line| {
            line.strip_prefix(name)?
                .trim_start_matches(':')
                .split_whitespace()
                .next()?
                .parse::<u64>()
                .ok()
        })
    };

    let total_kb = field("MemTotal")?;
    let available_kb = field("MemAvailable")?;
    let used_kb = total_kb.saturating_sub(available_kb);
    let percent = if total_kb == 0 {
        0.0
    } else {
        used_kb as f64 * 100.0 / total_kb as f64
    };

    Some(MemoryUsage {
        total_kb,
        available_kb,
        used_kb,
        percent,
    })
}

/// Per-unit active map for the configured managed units. A failing probe
/// simply reports the unit inactive.
pub async fn service_status(exec: &dyn CommandExecutor, config: &Config) -> BTreeMap<String, bool> {
    let mut services = BTreeMap::new();
    for unit in &config.managed_units {
        let active = match exec
            .run("systemctl", &args_to_strings(&["is-active", unit]))
            .await
        {
            Ok(output) => output.success,
            Err(err) => {
                debug!("probing unit {} failed: {}", unit, err);
                false
            }
        };
        services.insert(unit.clone(), active);
    }
    services
}

/// Reboot the host.
pub async fn reboot(exec: &dyn CommandExecutor) -> Result<()> {
    run_checked(exec, "systemctl", &args_to_strings(&["reboot"])).await?;
    Ok(())
}

/// Fetch the last `lines` journal lines for `unit`; `all` expands to the
/// configured unit glob.
pub async fn journal_logs(
    exec: &dyn CommandExecutor,
    config: &Config,
    unit: &str,
    lines: u32,
) -> Result<LogReport> {
    let unit = if unit == "all" {
        config.journal_unit_glob.as_str()
    } else {
        validate_unit_name(unit)?;
        unit
    };

    let args = args_to_strings(&["-u", unit, "-n", &lines.to_string(), "--no-pager"]);
    let output = run_checked(exec, "journalctl", &args).await?;
    Ok(LogReport {
        unit: unit.to_string(),
        lines: output.lines().map(str::to_string).collect(),
    })
}

/// Run a whitelisted systemctl verb against a unit. The verb and the unit
/// name are validated before anything is invoked.
pub async fn service_control(
    exec: &dyn CommandExecutor,
    service: &str,
    action: &str,
) -> Result<()> {
    if !SERVICE_ACTIONS.contains(&action) {
        return Err(Error::Validation(format!(
            "invalid action '{}'; valid actions: {}",
            action,
            SERVICE_ACTIONS.join(", ")
        )));
    }
    validate_unit_name(service)?;

    run_checked(exec, "systemctl", &args_to_strings(&[action, service])).await?;
    Ok(())
}

/// Unit names end up on a command line; restrict them to the systemd
/// unit-name character set.
fn validate_unit_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 255
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.@:\\".contains(c));
    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid unit name '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CommandOutput, MockCommandExecutor};

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("12345.67 54321.00\n"), Some(12345.67));
        assert_eq!(parse_uptime(""), None);
    }

    #[test]
    fn test_parse_loadavg() {
        let (l1, l5, l15) = parse_loadavg("0.52 0.58 0.59 1/428 12345\n").unwrap();
        assert_eq!(l1, 0.52);
        assert_eq!(l5, 0.58);
        assert_eq!(l15, 0.59);
        assert!(parse_loadavg("garbage").is_none());
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "\
MemTotal:        8000000 kB
MemFree:         1000000 kB
MemAvailable:    6000000 kB
Buffers:          200000 kB
";
        let memory = parse_meminfo(content).unwrap();
        assert_eq!(memory.total_kb, 8_000_000);
        assert_eq!(memory.available_kb, 6_000_000);
        assert_eq!(memory.used_kb, 2_000_000);
        assert!((memory.percent - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_unit_name() {
        assert!(validate_unit_name("dnsmasq").is_ok());
        assert!(validate_unit_name("wpa_supplicant@wlan0").is_ok());
        assert!(validate_unit_name("").is_err());
        assert!(validate_unit_name("unit; reboot").is_err());
    }

    #[tokio::test]
    async fn test_service_control_rejects_bad_action_without_invocation() {
        // No expectations: any systemctl call would panic the mock
        let exec = MockCommandExecutor::new();
        let err = service_control(&exec, "dnsmasq", "purge").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_service_control_invokes_systemctl() {
        let mut exec = MockCommandExecutor::new();
        exec.expect_run()
            .withf(|p, args| p == "systemctl" && args == ["restart", "dnsmasq"])
            .times(1)
            .returning(|_, _| Ok(CommandOutput { success: true, ..Default::default() }));
        service_control(&exec, "dnsmasq", "restart").await.unwrap();
    }

    #[tokio::test]
    async fn test_journal_logs_expands_all_to_glob() {
        let mut exec = MockCommandExecutor::new();
        exec.expect_run()
            .withf(|p, args| {
                p == "journalctl" && args == ["-u", "routerctl*", "-n", "50", "--no-pager"]
            })
            .times(1)
            .returning(|_, _| {
                Ok(CommandOutput {
                    stdout: "line one\nline two\n".to_string(),
                    success: true,
                    ..Default::default()
                })
            });

        let report = journal_logs(&exec, &Config::default(), "all", 50).await.unwrap();
        assert_eq!(report.unit, "routerctl*");
        assert_eq!(report.lines, vec!["line one", "line two"]);
    }

    #[tokio::test]
    async fn test_service_status_reports_inactive_on_failure() {
        let mut exec = MockCommandExecutor::new();
        exec.expect_run().returning(|_, args| {
            Ok(CommandOutput {
                success: args[1] == "dnsmasq",
                ..Default::default()
            })
        });

        let services = service_status(&exec, &Config::default()).await;
        assert_eq!(services["dnsmasq"], true);
        assert_eq!(services["hostapd"], false);
    }
}
