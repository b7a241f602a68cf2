//! cellward-om (Occupancy Monitor) - roster observer
//!
//! Polls the Housing Service roster endpoints, maintains its own
//! Occupancy Ledger, and logs occupancy statistics plus capacity
//! warnings. Demonstrates the consumer side of the ledger: seed from the
//! API, react to what the API reports, reconcile on an interval.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use cellward_common::api::RosterClient;
use cellward_common::{InmateStatus, LedgerEvent, OccupancyLedger};

#[derive(Debug, Parser)]
#[command(name = "cellward-om", about = "CellWard occupancy monitor")]
struct Args {
    /// Base URL of the housing service
    #[arg(long, default_value = "http://127.0.0.1:5810", env = "CELLWARD_HS_URL")]
    base_url: String,

    /// Seconds between reconciliation passes
    #[arg(long, default_value_t = 30, env = "CELLWARD_OM_INTERVAL")]
    interval: u64,

    /// Take a single snapshot and exit
    #[arg(long)]
    once: bool,
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
        "Starting CellWard Occupancy Monitor (cellward-om) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();
    let client = RosterClient::new(args.base_url.as_str())?;

    let mut ledger = OccupancyLedger::new();
    ledger.subscribe(log_event);

    // Seed from the authoritative roster.
    let cells = client.fetch_cells().await?;
    let inmates = client.fetch_inmates(Some(InmateStatus::Active)).await?;
    info!(
        "Seeded ledger from {}: {} cells, {} active inmates",
        args.base_url,
        cells.len(),
        inmates.len()
    );
    ledger.initialize(cells, inmates);

    report(&ledger);
    if args.once {
        return Ok(());
    }

    loop {
        tokio::time::sleep(Duration::from_secs(args.interval)).await;

        // Fetches run sequentially on this task, so a slow response can
        // never be overtaken by a newer one.
        match client.fetch_cells().await {
            Ok(cells) => {
                ledger.refresh_cells(cells);
                report(&ledger);
            }
            Err(e) => warn!("Reconciliation fetch failed: {}", e),
        }
    }
}

/// Ledger listener logging count changes and capacity warnings
fn log_event(event: &LedgerEvent) {
    match event {
        LedgerEvent::CellAtCapacity {
            cell_id, capacity, ..
        } => {
            warn!("Cell {} at capacity ({})", cell_id, capacity);
        }
        LedgerEvent::CellCountIncreased { cell_id, count, .. }
        | LedgerEvent::CellCountDecreased { cell_id, count, .. } => {
            info!("Cell {} occupancy now {}", cell_id, count);
        }
        _ => {}
    }
}

/// Log aggregate statistics and any drift against the backend counts
fn report(ledger: &OccupancyLedger) {
    let stats = ledger.statistics();
    info!(
        "Occupancy: {}/{} across {} cells ({} at capacity, {} with space)",
        stats.total_occupied,
        stats.total_capacity,
        stats.total_cells,
        stats.cells_at_capacity,
        stats.cells_with_space
    );

    for slot in ledger.cells() {
        let cell = slot.cell();
        if slot.display_count() != cell.current_count {
            info!(
                "Cell {} ({}) drifted: display {} vs authoritative {}",
                cell.id,
                cell.name,
                slot.display_count(),
                cell.current_count
            );
        }
        if slot.display_count() > cell.capacity {
            warn!(
                "Cell {} ({}) over capacity: {}/{}",
                cell.id,
                cell.name,
                slot.display_count(),
                cell.capacity
            );
        }
    }
}
