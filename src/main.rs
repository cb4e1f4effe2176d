//! Parchis match server (default binary).
//!
//! Parses flags (with `PARCHIS_*` environment fallbacks), installs the
//! tracing subscriber and runs the TCP server until it fails or is killed.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parchis_server::adapter::{run_server, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "parchis-server", version, about = "Authoritative Parchis match server")]
struct Cli {
    /// Address to bind
    #[arg(long, env = "PARCHIS_HOST")]
    host: Option<String>,

    /// Port to bind (0 picks a free port)
    #[arg(long, short, env = "PARCHIS_PORT")]
    port: Option<u16>,

    /// Players required before the admin may start (2-4)
    #[arg(long, env = "PARCHIS_MIN_PLAYERS")]
    min_players: Option<usize>,

    /// Release jailed pieces automatically after a double
    #[arg(long, env = "PARCHIS_AUTO_RELEASE")]
    auto_release: Option<bool>,

    /// Seed the dice for a reproducible match
    #[arg(long, env = "PARCHIS_DICE_SEED")]
    dice_seed: Option<u64>,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            protocol_version: defaults.protocol_version,
            min_players: self.min_players.unwrap_or(defaults.min_players),
            auto_release: self.auto_release.unwrap_or(defaults.auto_release),
            dice_seed: self.dice_seed.or(defaults.dice_seed),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();
    info!(
        host = %config.host,
        port = config.port,
        min_players = config.min_players,
        auto_release = config.auto_release,
        seeded = config.dice_seed.is_some(),
        "starting parchis server"
    );

    run_server(config, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "parchis-server",
            "--port",
            "9000",
            "--min-players",
            "3",
            "--auto-release",
            "false",
            "--dice-seed",
            "42",
        ])
        .unwrap();
        let config = cli.into_config();
        assert_eq!(config.port, 9000);
        assert_eq!(config.min_players, 3);
        assert!(!config.auto_release);
        assert_eq!(config.dice_seed, Some(42));
        assert_eq!(config.host, ServerConfig::default().host);
    }
}
