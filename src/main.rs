//! routerctl - Management CLI for hybrid router hosts.
//!
//! One JSON document on stdout per successful operation; diagnostics on
//! stderr and exit code 1 on failure.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use routerctl::cli::{
    Cli, Commands, DhcpAction, FirewallAction, NetworkAction, SystemAction,
};
use routerctl::commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity; diagnostics go to stderr so stdout
    // stays a clean JSON channel.
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Firewall { action } => match action {
            FirewallAction::List => commands::firewall::list(&cli.config).await,
            FirewallAction::Add { rule } => commands::firewall::add(&cli.config, &rule).await,
            FirewallAction::Delete { chain, line } => {
                commands::firewall::delete(&cli.config, &chain, line).await
            }
            FirewallAction::Save => commands::firewall::save(&cli.config).await,
            FirewallAction::Status => commands::firewall::status(&cli.config).await,
        },
        Commands::Dhcp { action } => match action {
            DhcpAction::Leases => commands::dhcp::leases(&cli.config),
        },
        Commands::Network { action } => match action {
            NetworkAction::Interfaces => commands::network::interfaces(&cli.config).await,
            NetworkAction::Status => commands::network::status(&cli.config).await,
            NetworkAction::Configure { interface, config } => {
                commands::network::configure(&cli.config, &interface, &config).await
            }
        },
        Commands::System { action } => match action {
            SystemAction::Status => commands::system::status(&cli.config).await,
            SystemAction::Resources => commands::system::resources(),
            SystemAction::Reboot => commands::system::reboot(&cli.config).await,
            SystemAction::Logs { unit, lines } => {
                commands::system::logs(&cli.config, &unit, lines).await
            }
            SystemAction::Services => commands::system::services(&cli.config).await,
            SystemAction::Service { name, action } => {
                commands::system::service(&cli.config, &name, &action).await
            }
        },
        Commands::Version => {
            println!("routerctl {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
