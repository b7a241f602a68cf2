//! Shared API request/response types
//!
//! Used by the cellward-hs handlers and by the roster client in
//! cellward-om, so both sides agree on the wire shapes.

use serde::{Deserialize, Serialize};

use crate::models::{Cell, Gender, Inmate, InmateStatus};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// `GET /api/cells` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellListResponse {
    pub cells: Vec<Cell>,
}

/// `GET /api/inmates` response with pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InmateListResponse {
    pub inmates: Vec<Inmate>,
    pub total_results: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// Admission request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitInmateRequest {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    #[serde(default = "default_admission_status")]
    pub status: InmateStatus,
    pub cell_id: Option<i64>,
}

fn default_admission_status() -> InmateStatus {
    InmateStatus::Active
}

/// Update request body for transfers and status changes
///
/// Absent fields are left unchanged; `clear_cell` removes the cell
/// assignment (and wins over `cell_id` if both are sent).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInmateRequest {
    pub status: Option<InmateStatus>,
    pub cell_id: Option<i64>,
    #[serde(default)]
    pub clear_cell: bool,
}

/// Cell creation request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCellRequest {
    pub name: String,
    pub capacity: u32,
    #[serde(rename = "type")]
    pub cell_type: Gender,
    #[serde(default = "default_cell_status")]
    pub status: crate::models::CellStatus,
    pub location: Option<String>,
}

fn default_cell_status() -> crate::models::CellStatus {
    crate::models::CellStatus::Active
}

/// Cell update request body; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCellRequest {
    pub name: Option<String>,
    pub capacity: Option<u32>,
    #[serde(rename = "type")]
    pub cell_type: Option<Gender>,
    pub status: Option<crate::models::CellStatus>,
    pub location: Option<String>,
}

/// Dry-run assignment validation request
///
/// Either names a tracked inmate or describes a candidate inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateAssignmentRequest {
    pub inmate_id: Option<i64>,
    pub gender: Option<Gender>,
    #[serde(default = "default_admission_status")]
    pub status: InmateStatus,
    pub cell_id: i64,
}

/// Assignment validation verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Reconciliation summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub cells_refreshed: usize,
}

/// Forced recount summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeResponse {
    pub cells_changed: usize,
}

/// Error body returned by all API error paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_defaults_to_active() {
        let req: AdmitInmateRequest = serde_json::from_str(
            r#"{"first_name":"Jane","last_name":"Roe","gender":"Female","cell_id":null}"#,
        )
        .unwrap();
        assert_eq!(req.status, InmateStatus::Active);
        assert!(req.cell_id.is_none());
    }

    #[test]
    fn test_create_cell_uses_type_field() {
        let req: CreateCellRequest = serde_json::from_str(
            r#"{"name":"B-2","capacity":4,"type":"Female","location":"Block B"}"#,
        )
        .unwrap();
        assert_eq!(req.cell_type, Gender::Female);
        assert_eq!(req.status, crate::models::CellStatus::Active);
    }

    #[test]
    fn test_update_request_defaults() {
        let req: UpdateInmateRequest = serde_json::from_str(r#"{"status":"Released"}"#).unwrap();
        assert_eq!(req.status, Some(InmateStatus::Released));
        assert!(req.cell_id.is_none());
        assert!(!req.clear_cell);
    }
}
