//! cellward-hs library - Housing Service
//!
//! The authoritative records server for cells and inmates. Hosts an
//! Occupancy Ledger mirroring the database, drives it from every roster
//! mutation, and fans ledger events out to SSE observers.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use cellward_common::{EventBus, OccupancyLedger};

pub mod api;
pub mod bridge;
pub mod db;
pub mod pagination;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (the authoritative store)
    pub db: SqlitePool,
    /// In-process occupancy ledger, driven by every roster mutation
    pub ledger: Arc<Mutex<OccupancyLedger>>,
    /// Broadcast bus feeding the SSE endpoint
    pub events: EventBus,
}

impl AppState {
    pub fn new(db: SqlitePool, ledger: OccupancyLedger, events: EventBus) -> Self {
        Self {
            db,
            ledger: Arc::new(Mutex::new(ledger)),
            events,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    Router::new()
        .route("/api/cells", get(api::list_cells).post(api::create_cell))
        .route("/api/cells/available", get(api::available_cells))
        .route("/api/cells/:id", put(api::update_cell))
        .route("/api/inmates", get(api::list_inmates).post(api::admit_inmate))
        .route(
            "/api/inmates/:id",
            put(api::update_inmate).delete(api::remove_inmate),
        )
        .route("/api/occupancy/statistics", get(api::occupancy_statistics))
        .route("/api/occupancy/validate", post(api::validate_assignment))
        .route("/api/occupancy/reconcile", post(api::reconcile_cells))
        .route("/api/occupancy/recompute", post(api::recompute_counts))
        .route("/api/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
}
