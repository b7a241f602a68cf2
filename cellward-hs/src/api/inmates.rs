//! Roster endpoints: admissions, transfers, status changes, removals
//!
//! Every mutation is validated against the ledger, persisted to the
//! database, and then replayed into the ledger so display counts and SSE
//! observers stay current. Blocked assignments are refused here with 409
//! so the authoritative store never holds an uncountable assignment.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use cellward_common::api::types::{AdmitInmateRequest, InmateListResponse, UpdateInmateRequest};
use cellward_common::{Inmate, InmateStatus};

use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::{api::ApiError, db, AppState};

/// Query parameters for roster listing
#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    pub status: Option<String>,
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// GET /api/inmates?status=&page=
pub async fn list_inmates(
    State(state): State<AppState>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<InmateListResponse>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<InmateStatus>)
        .transpose()?;

    let total_results = db::inmates::count_inmates(&state.db, status).await?;
    let p = calculate_pagination(total_results, query.page);
    let inmates = db::inmates::list_inmates(&state.db, status, PAGE_SIZE, p.offset).await?;

    Ok(Json(InmateListResponse {
        inmates,
        total_results,
        page: p.page,
        page_size: PAGE_SIZE,
        total_pages: p.total_pages,
    }))
}

/// POST /api/inmates
///
/// Admission. A requested cell assignment is validated first; gender
/// mismatch or a full cell refuses the admission with 409 and the
/// violation reason.
pub async fn admit_inmate(
    State(state): State<AppState>,
    Json(req): Json<AdmitInmateRequest>,
) -> Result<(StatusCode, Json<Inmate>), ApiError> {
    let mut ledger = state.ledger.lock().await;

    if let Some(cell_id) = req.cell_id {
        let candidate = Inmate {
            id: 0,
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
            gender: req.gender,
            status: req.status,
            cell_id: Some(cell_id),
        };
        if let Err(violation) = ledger.validate_assignment(&candidate, cell_id) {
            return Err(ApiError::Conflict(violation.to_string()));
        }
    }

    let inmate = db::inmates::insert_inmate(&state.db, &req).await?;
    ledger.add_inmate(inmate.clone());

    Ok((StatusCode::CREATED, Json(inmate)))
}

/// PUT /api/inmates/:id
///
/// Transfer and/or status change. Validation runs only when the update
/// would count the inmate into a cell it is not already counted in.
pub async fn update_inmate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateInmateRequest>,
) -> Result<Json<Inmate>, ApiError> {
    let Some(previous) = db::inmates::get_inmate(&state.db, id).await? else {
        return Err(ApiError::NotFound(format!("Inmate {} not found", id)));
    };

    let mut updated = previous.clone();
    if let Some(status) = req.status {
        updated.status = status;
    }
    if req.clear_cell {
        updated.cell_id = None;
    } else if let Some(cell_id) = req.cell_id {
        updated.cell_id = Some(cell_id);
    }

    let mut ledger = state.ledger.lock().await;

    let was = counted_cell(&previous);
    let now = counted_cell(&updated);
    if now != was {
        if let Some(cell_id) = now {
            if let Err(violation) = ledger.validate_assignment(&updated, cell_id) {
                return Err(ApiError::Conflict(violation.to_string()));
            }
        }
    }

    db::inmates::update_inmate(&state.db, &updated).await?;
    ledger.update_inmate(updated.clone(), Some(previous));

    Ok(Json(updated))
}

/// DELETE /api/inmates/:id
pub async fn remove_inmate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !db::inmates::delete_inmate(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Inmate {} not found", id)));
    }
    state.ledger.lock().await.remove_inmate(id);

    Ok(StatusCode::NO_CONTENT)
}

/// The cell this snapshot counts toward, if any
fn counted_cell(inmate: &Inmate) -> Option<i64> {
    if inmate.status.is_active() {
        inmate.cell_id
    } else {
        None
    }
}
