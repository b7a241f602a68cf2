//! Cell administration and availability endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use cellward_common::api::types::{CellListResponse, CreateCellRequest, UpdateCellRequest};
use cellward_common::ledger::CellSlot;
use cellward_common::{Cell, Gender};

use crate::{api::ApiError, db, AppState};

/// GET /api/cells
///
/// All cells with their authoritative occupant counts.
pub async fn list_cells(State(state): State<AppState>) -> Result<Json<CellListResponse>, ApiError> {
    let cells = db::cells::list_cells(&state.db).await?;
    Ok(Json(CellListResponse { cells }))
}

/// POST /api/cells
///
/// Create a cell and start tracking it in the ledger.
pub async fn create_cell(
    State(state): State<AppState>,
    Json(req): Json<CreateCellRequest>,
) -> Result<(StatusCode, Json<Cell>), ApiError> {
    if req.capacity == 0 {
        return Err(ApiError::Invalid("capacity must be positive".to_string()));
    }

    let cell = db::cells::insert_cell(&state.db, &req).await?;
    state.ledger.lock().await.refresh_cells(vec![cell.clone()]);

    Ok((StatusCode::CREATED, Json(cell)))
}

/// PUT /api/cells/:id
///
/// Administrative update of capacity/type/status/location/name. The
/// ledger picks up the new attributes without losing its display count.
pub async fn update_cell(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCellRequest>,
) -> Result<Json<Cell>, ApiError> {
    if req.capacity == Some(0) {
        return Err(ApiError::Invalid("capacity must be positive".to_string()));
    }

    let Some(cell) = db::cells::update_cell(&state.db, id, &req).await? else {
        return Err(ApiError::NotFound(format!("Cell {} not found", id)));
    };
    state.ledger.lock().await.refresh_cells(vec![cell.clone()]);

    Ok(Json(cell))
}

/// Query parameters for the availability listing
#[derive(Debug, Deserialize)]
pub struct AvailableQuery {
    pub gender: String,
}

/// Availability response: tracked slots with live display counts
#[derive(Debug, Serialize)]
pub struct AvailableCellsResponse {
    pub cells: Vec<CellSlot>,
}

/// GET /api/cells/available?gender=
///
/// Cells that can take another inmate of the given gender, judged by the
/// ledger's display counts (no database round trip).
pub async fn available_cells(
    State(state): State<AppState>,
    Query(query): Query<AvailableQuery>,
) -> Result<Json<AvailableCellsResponse>, ApiError> {
    let gender: Gender = query.gender.parse()?;

    let ledger = state.ledger.lock().await;
    let cells = ledger
        .available_cells_for(gender)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(AvailableCellsResponse { cells }))
}
