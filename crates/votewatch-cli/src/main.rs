mod display;
mod watch;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use votewatch_client::{ProxyClient, UpstreamQuery};
use votewatch_core::{BoardQuery, SortDirection, SortKey};
use votewatch_proxy::ProxyConfig;

#[derive(Parser)]
#[command(name = "votewatch", version, about = "Live vote leaderboard: upstream proxy and terminal watcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy endpoint (GET /api/nominee).
    Serve {
        #[arg(long, env = "VOTEWATCH_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
    },
    /// Poll the proxy and render the leaderboard in the terminal.
    Watch(WatchArgs),
}

#[derive(Args)]
struct WatchArgs {
    /// Base URL of a running proxy.
    #[arg(long, env = "VOTEWATCH_PROXY_URL", default_value = "http://127.0.0.1:3000")]
    proxy: String,

    /// Poll interval in milliseconds.
    #[arg(
        long,
        env = "VOTEWATCH_REFRESH_MS",
        default_value_t = 10_000,
        value_parser = clap::value_parser!(u64).range(100..)
    )]
    refresh_ms: u64,

    #[arg(long, env = "VOTEWATCH_KEY_CATEGORY")]
    key_category: Option<String>,

    #[arg(long, env = "VOTEWATCH_TYPE_SORT")]
    type_sort: Option<String>,

    #[arg(long, env = "VOTEWATCH_TYPE_PERIOD")]
    type_period: Option<String>,

    /// Initial filter on name and brand.
    #[arg(long, env = "VOTEWATCH_FILTER", default_value = "")]
    filter: String,

    /// Initial sort key: rank, count, percent or subject.
    #[arg(long, env = "VOTEWATCH_SORT", default_value = "rank")]
    sort: SortKey,

    #[arg(long, env = "VOTEWATCH_DIRECTION", default_value = "asc")]
    direction: SortDirection,

    #[arg(long, env = "VOTEWATCH_TITLE", default_value = "Live Leaderboard")]
    title: String,

    /// Print one snapshot and exit.
    #[arg(long, env = "VOTEWATCH_ONCE")]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The watcher owns stdout; keep routine request logs out of its way.
    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        Commands::Watch(_) => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("votewatch v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { bind } => votewatch_proxy::serve(bind, ProxyConfig::from_env())
            .await
            .with_context(|| format!("proxy server on {bind} failed")),
        Commands::Watch(args) => {
            let client = ProxyClient::new(args.proxy).context("failed to build proxy client")?;
            let opts = watch::WatchOptions {
                refresh: Duration::from_millis(args.refresh_ms),
                upstream: UpstreamQuery {
                    key_category: args.key_category,
                    type_sort: args.type_sort,
                    type_period: args.type_period,
                },
                board: BoardQuery {
                    filter: args.filter,
                    sort_key: args.sort,
                    direction: args.direction,
                },
                title: args.title,
                once: args.once,
            };
            watch::run(client, opts).await.context("leaderboard watcher failed")
        }
    }
}
