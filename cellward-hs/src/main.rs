//! cellward-hs (Housing Service) - authoritative jail housing records API
//!
//! Serves cell and inmate records over HTTP, keeps an in-process
//! Occupancy Ledger in step with every mutation, and streams occupancy
//! events to connected UIs.

use anyhow::Result;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cellward_common::{config, EventBus};
use cellward_hs::{bridge, build_router, db, AppState};

/// Event bus capacity; old events are dropped past this depth
const EVENT_BUS_CAPACITY: usize = 1000;

#[derive(Debug, Parser)]
#[command(name = "cellward-hs", about = "CellWard housing records service")]
struct Args {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1", env = "CELLWARD_HS_HOST")]
    host: String,

    /// Bind port
    #[arg(long, default_value_t = 5810, env = "CELLWARD_HS_PORT")]
    port: u16,

    /// Data folder (overrides CELLWARD_DATA and the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Database file (overrides the data folder layout)
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting CellWard Housing Service (cellward-hs) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let db_path = match &args.database {
        Some(path) => std::path::PathBuf::from(path),
        None => {
            let data_dir = config::resolve_data_dir(args.data_dir.as_deref());
            config::ensure_data_dir(&data_dir)?;
            config::database_path(&data_dir)
        }
    };
    info!("Database path: {}", db_path.display());

    let pool = db::init_database(&db_path).await?;

    // Seed the ledger from the authoritative records before serving.
    let cells = db::cells::list_cells(&pool).await?;
    let inmates = db::inmates::list_all_inmates(&pool).await?;
    info!(
        "Seeding ledger with {} cells, {} inmates",
        cells.len(),
        inmates.len()
    );

    let mut ledger = cellward_common::OccupancyLedger::new();
    let events = EventBus::new(EVENT_BUS_CAPACITY);
    bridge::register_event_bridge(&mut ledger, events.clone());
    ledger.initialize(cells, inmates);

    let state = AppState::new(pool, ledger, events);
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("cellward-hs listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
