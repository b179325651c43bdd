use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "caching-proxy", about = "In-memory caching reverse proxy")]
pub struct Cli {
    /// Port to listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Origin base URL; each request path is appended to it verbatim.
    #[arg(long)]
    pub origin: Option<String>,

    /// Clear the response cache and exit without starting the server.
    #[arg(long)]
    pub clear_cache: bool,

    /// Optional TOML file with settings (CLI flags take precedence).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum)]
    pub log: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Text => "text",
        }
    }
}
