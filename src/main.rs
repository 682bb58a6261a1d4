use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stargazer::config::{self, DEFAULT_CACHE_TTL_DAYS, Settings};

#[derive(Parser)]
#[command(name = "stargazer")]
#[command(version, about = "Star-neighbour service for GitHub repositories")]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: std::net::SocketAddr,

    /// Path to the cache database (defaults to the user data directory)
    #[arg(long)]
    db: Option<PathBuf>,

    /// GitHub API token (falls back to the GH_TOKEN environment variable)
    #[arg(long)]
    gh_token: Option<String>,

    /// Cache entry lifetime in days; 0 keeps entries forever
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_DAYS)]
    cache_ttl_days: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings {
        bind: cli.bind,
        db_path: cli.db.unwrap_or_else(config::db_path),
        token: cli.gh_token.or_else(|| std::env::var("GH_TOKEN").ok()),
        cache_ttl: (cli.cache_ttl_days > 0)
            .then(|| Duration::from_secs(cli.cache_ttl_days * 24 * 60 * 60)),
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(stargazer::server::run(settings))
}
