//! Roster client
//!
//! HTTP client for the cellward-hs roster endpoints. Used by observer
//! processes (cellward-om) to seed and reconcile their own Occupancy
//! Ledger from the authoritative records service.

use std::time::Duration;

use reqwest::Client;

use crate::api::types::{CellListResponse, InmateListResponse};
use crate::models::{Cell, Inmate, InmateStatus};
use crate::{Error, Result};

/// Default timeout for roster API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on pages walked per roster fetch; trips on a server that
/// keeps reporting more pages than it serves
const MAX_PAGES: i64 = 10_000;

/// Client for the cellward-hs roster API
#[derive(Debug, Clone)]
pub struct RosterClient {
    base_url: String,
    http: Client,
}

impl RosterClient {
    /// Create a client for the given base URL (e.g. `http://127.0.0.1:5810`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Fetch all cells with their authoritative occupant counts
    pub async fn fetch_cells(&self) -> Result<Vec<Cell>> {
        let url = format!("{}/api/cells", self.base_url);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let body: CellListResponse = response.json().await?;
        Ok(body.cells)
    }

    /// Fetch the full roster, walking every page
    ///
    /// Pages are requested sequentially, so responses cannot complete out
    /// of order; each reconciliation pass sees one coherent roster.
    pub async fn fetch_inmates(&self, status: Option<InmateStatus>) -> Result<Vec<Inmate>> {
        let mut inmates = Vec::new();
        let mut page = 1i64;

        loop {
            let mut url = format!("{}/api/inmates?page={}", self.base_url, page);
            if let Some(status) = status {
                url.push_str(&format!("&status={}", status));
            }

            let response = self.http.get(&url).send().await?.error_for_status()?;
            let body: InmateListResponse = response.json().await?;

            inmates.extend(body.inmates);
            if page >= body.total_pages {
                break;
            }
            page += 1;
            if page > MAX_PAGES {
                return Err(Error::Internal(
                    "roster pagination never terminated".to_string(),
                ));
            }
        }

        Ok(inmates)
    }
}
