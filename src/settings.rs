use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result, bail, ensure};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::cli::{Cli, LogFormat};

const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: i64 = 3000;

/// What a single process invocation does. Clearing and serving are mutually
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    ClearCache,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub listen_host: IpAddr,
    pub port: u16,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub clear_cache: bool,
    pub log: LogFormat,
    /// Overall deadline for one origin fetch, in seconds. Unset means none.
    #[serde(default)]
    pub origin_timeout: Option<u64>,
    #[serde(default)]
    pub metrics_listen: Option<SocketAddr>,
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("listen_host", DEFAULT_LISTEN_HOST)
            .map_err(to_anyhow)?
            .set_default("port", DEFAULT_PORT)
            .map_err(to_anyhow)?
            .set_default("log", LogFormat::Text.as_str())
            .map_err(to_anyhow)?;

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::from(path.clone()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CACHING_PROXY")
                .separator("__")
                .try_parsing(true),
        );

        builder = builder
            .set_override_option("port", cli.port.map(i64::from))
            .map_err(to_anyhow)?
            .set_override_option("origin", cli.origin.clone())
            .map_err(to_anyhow)?
            .set_override_option("clear_cache", cli.clear_cache.then_some(true))
            .map_err(to_anyhow)?
            .set_override_option("log", cli.log.map(|format| format.as_str()))
            .map_err(to_anyhow)?;

        let cfg = builder
            .build()
            .map_err(to_anyhow)
            .context("failed to load settings")?;
        let settings: Settings = cfg.try_deserialize().map_err(to_anyhow)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn command(&self) -> Command {
        if self.clear_cache {
            Command::ClearCache
        } else {
            Command::Serve
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_host, self.port)
    }

    pub fn origin_timeout(&self) -> Option<Duration> {
        self.origin_timeout.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        // Clearing never contacts the origin, so none of the serve settings matter.
        if self.command() == Command::ClearCache {
            return Ok(());
        }
        if let Some(timeout) = self.origin_timeout {
            ensure!(
                timeout > 0,
                "origin_timeout must be greater than 0 seconds (got {timeout})"
            );
        }
        if self.origin.is_empty() {
            bail!("origin URL is required (pass --origin)");
        }
        ensure!(
            self.origin.starts_with("http://") || self.origin.starts_with("https://"),
            "origin must be an http:// or https:// URL (got {})",
            self.origin
        );
        Ok(())
    }
}

fn to_anyhow(err: ConfigError) -> anyhow::Error {
    anyhow::anyhow!(err)
}
