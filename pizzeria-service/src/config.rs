use std::env;
use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_DATABASE_URL: &str = "app.db";

#[derive(Parser, Debug)]
#[command(version, about = "Restaurants, pizzas and their prices over HTTP")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run pending migrations and serve the HTTP API
    Serve,
    /// Run pending migrations and exit
    Migrate,
    /// Replace all data with a small sample menu
    Seed,
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// SQLite database path. Falls back to DB_URI, then to app.db
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:5555")]
    pub bind_address: SocketAddr,
}

impl Settings {
    pub fn database_url(&self) -> String {
        let url = self
            .database_url
            .clone()
            .or_else(|| env::var("DB_URI").ok())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        normalize_database_url(&url).to_string()
    }
}

/// Accepts SQLAlchemy style `sqlite:///path` URLs as plain paths.
fn normalize_database_url(url: &str) -> &str {
    url.strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .unwrap_or(url)
}
