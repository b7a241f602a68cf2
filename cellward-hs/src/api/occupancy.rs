//! Occupancy queries and reconciliation endpoints

use axum::{extract::State, Json};

use cellward_common::api::types::{
    RecomputeResponse, ReconcileResponse, ValidateAssignmentRequest, ValidationResponse,
};
use cellward_common::ledger::OccupancyStatistics;
use cellward_common::Inmate;

use crate::{api::ApiError, db, AppState};

/// GET /api/occupancy/statistics
pub async fn occupancy_statistics(State(state): State<AppState>) -> Json<OccupancyStatistics> {
    let ledger = state.ledger.lock().await;
    Json(ledger.statistics())
}

/// POST /api/occupancy/validate
///
/// Dry-run assignment check. Always 200; the verdict travels in the
/// body so UI code can present the reason without error handling.
pub async fn validate_assignment(
    State(state): State<AppState>,
    Json(req): Json<ValidateAssignmentRequest>,
) -> Result<Json<ValidationResponse>, ApiError> {
    let ledger = state.ledger.lock().await;

    let candidate = match req.inmate_id {
        Some(id) => match ledger.inmate(id) {
            Some(inmate) => inmate.clone(),
            None => {
                return Ok(Json(ValidationResponse {
                    valid: false,
                    reason: Some(format!("Inmate {} not tracked", id)),
                }))
            }
        },
        None => {
            let Some(gender) = req.gender else {
                return Err(ApiError::Invalid(
                    "either inmate_id or gender is required".to_string(),
                ));
            };
            Inmate {
                id: 0,
                first_name: String::new(),
                last_name: String::new(),
                gender,
                status: req.status,
                cell_id: None,
            }
        }
    };

    let response = match ledger.validate_assignment(&candidate, req.cell_id) {
        Ok(()) => ValidationResponse {
            valid: true,
            reason: None,
        },
        Err(violation) => ValidationResponse {
            valid: false,
            reason: Some(violation.to_string()),
        },
    };
    Ok(Json(response))
}

/// POST /api/occupancy/reconcile
///
/// Re-read authoritative cell records and refresh the ledger's static
/// attributes. Display counts are left alone by design.
pub async fn reconcile_cells(
    State(state): State<AppState>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let cells = db::cells::list_cells(&state.db).await?;
    let cells_refreshed = cells.len();
    state.ledger.lock().await.refresh_cells(cells);

    Ok(Json(ReconcileResponse { cells_refreshed }))
}

/// POST /api/occupancy/recompute
///
/// Force display counts back in line with the tracked Active inmates.
pub async fn recompute_counts(State(state): State<AppState>) -> Json<RecomputeResponse> {
    let cells_changed = state.ledger.lock().await.recompute_counts();
    Json(RecomputeResponse { cells_changed })
}
