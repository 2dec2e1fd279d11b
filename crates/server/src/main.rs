mod archive;
mod fetcher;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use timetable_transit::{
    DepartureQueryEngine, IndexMode, RealtimeConfig, RealtimeFeedCache, StopIdentifier,
};

use crate::fetcher::HttpFetcher;
use crate::routes::WindowParams;

/// JSON departure boards from a static GTFS feed and its GTFS-RT feeds
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    feeds: FeedArgs,

    /// Log every query phase
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct FeedArgs {
    /// URL of the GTFS zip archive, including any API key
    #[arg(long = "gtfs", env = "TIMETABLE_GTFS_URL")]
    gtfs_url: String,

    /// URL of the TripUpdates.pb feed, including any API key
    #[arg(long, env = "TIMETABLE_TRIP_UPDATES_URL")]
    trip_updates: String,

    /// URL of the VehiclePositions.pb feed, including any API key
    #[arg(long, env = "TIMETABLE_VEHICLE_POSITIONS_URL")]
    vehicle_positions: String,

    /// Where downloaded archives are extracted
    #[arg(long, default_value = "gtfs")]
    cache_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Serve departure boards over HTTP
    Serve {
        #[arg(long, env = "TIMETABLE_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,

        /// Scan stop_times.txt per query. Much less memory, much slower queries.
        #[arg(long)]
        uncached: bool,
    },
    /// Print one departure board as JSON and exit
    Query {
        stop_id: String,

        /// Window start, as YYYY-MM-DDTHH:MM:SS local time
        #[arg(long)]
        from: Option<String>,

        /// Window end, as YYYY-MM-DDTHH:MM:SS local time
        #[arg(long)]
        to: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn open_engine(
    feeds: &FeedArgs,
    fetcher: HttpFetcher,
    mode: IndexMode,
) -> anyhow::Result<DepartureQueryEngine> {
    let snapshot =
        archive::fetch_and_extract(&reqwest::Client::new(), &feeds.gtfs_url, &feeds.cache_dir)
            .await?;

    let realtime = Arc::new(RealtimeFeedCache::new(
        Arc::new(fetcher),
        RealtimeConfig::new(&feeds.trip_updates, &feeds.vehicle_positions),
    ));

    let root = snapshot.clone();
    tokio::task::spawn_blocking(move || DepartureQueryEngine::open(&root, mode, realtime))
        .await?
        .with_context(|| format!("Cannot index schedule at {}", snapshot.display()))
}

async fn serve(engine: DepartureQueryEngine, bind: SocketAddr) -> anyhow::Result<()> {
    let app = routes::create_router(Arc::new(engine));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Cannot bind {bind}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

async fn query(
    engine: DepartureQueryEngine,
    stop_id: String,
    params: WindowParams,
) -> anyhow::Result<()> {
    let (start, end) = routes::resolve_window(&params, Local::now().naive_local())?;
    let board = engine
        .create_departures_timetable(&StopIdentifier::new(stop_id), start, end)
        .await?;
    println!("{}", serde_json::to_string_pretty(&board)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let fetcher = HttpFetcher::new()?;

    match cli.command {
        Command::Serve { bind, uncached } => {
            let mode = if uncached { IndexMode::Scan } else { IndexMode::Eager };
            let engine = open_engine(&cli.feeds, fetcher, mode).await?;
            serve(engine, bind).await
        }
        Command::Query { stop_id, from, to } => {
            let engine = open_engine(&cli.feeds, fetcher, IndexMode::Scan).await?;
            query(engine, stop_id, WindowParams { from, to }).await
        }
    }
}
