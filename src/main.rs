use std::path::PathBuf;

use clap::Parser;

use contest_portal::config::{
    load_config, misconfiguration_warnings, validate_config, ConfigError, PortalConfig,
};
use contest_portal::lifecycle::{signals, Shutdown};
use contest_portal::observability::logging;
use contest_portal::portal::PortalState;
use contest_portal::{net, PortalServer};

#[derive(Debug, Parser)]
#[command(name = "contest-portal", version, about = "Event-time-gated contest portal")]
struct Cli {
    /// Address to listen on when no listener is inherited.
    #[arg(long)]
    listen: Option<String>,

    /// Hour the contest starts at (event local time); negative disables the bound.
    #[arg(long = "starts-at")]
    starts_at: Option<i32>,

    /// Hour the contest ends at (event local time); negative disables the bound.
    #[arg(long = "ends-at")]
    ends_at: Option<i32>,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Negative hours mean "no bound on that side", mirroring the flag
/// convention operators already know.
fn hour_bound(value: i32) -> Option<u32> {
    u32::try_from(value).ok()
}

fn build_config(cli: &Cli) -> Result<PortalConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PortalConfig::default(),
    };

    if let Some(listen) = &cli.listen {
        config.listener.bind_address = listen.clone();
    }
    if let Some(hour) = cli.starts_at {
        config.contest.starts_at_hour = hour_bound(hour);
    }
    if let Some(hour) = cli.ends_at {
        config.contest.ends_at_hour = hour_bound(hour);
    }

    // CLI overrides can invalidate a valid file, so validate the merge.
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    logging::init(&config.observability.log_level);
    logging::install_panic_hook();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "contest-portal starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        starts_at_hour = ?config.contest.starts_at_hour,
        ends_at_hour = ?config.contest.ends_at_hour,
        teams = config.teams.len(),
        "configuration loaded"
    );
    for warning in misconfiguration_warnings(&config) {
        tracing::warn!("{warning}");
    }

    let shutdown = Shutdown::new();
    let _signals = signals::spawn(shutdown.clone());

    let listener = net::acquire(&config.listener.bind_address).await?;

    let state = PortalState::new(config).into_shared();
    let server = PortalServer::new(state);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_hours_disable_the_bound() {
        assert_eq!(hour_bound(-1), None);
        assert_eq!(hour_bound(10), Some(10));
        assert_eq!(hour_bound(0), Some(0));
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli {
            listen: Some("0.0.0.0:8080".to_string()),
            starts_at: Some(-1),
            ends_at: Some(20),
            config: None,
        };

        let config = build_config(&cli).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.contest.starts_at_hour, None);
        assert_eq!(config.contest.ends_at_hour, Some(20));
    }

    #[test]
    fn invalid_cli_hours_are_rejected() {
        let cli = Cli {
            listen: None,
            starts_at: Some(24),
            ends_at: None,
            config: None,
        };

        assert!(matches!(
            build_config(&cli),
            Err(ConfigError::Validation(_))
        ));
    }
}
