//! Cell record queries

use cellward_common::api::types::{CreateCellRequest, UpdateCellRequest};
use cellward_common::{Cell, Result};
use sqlx::{Row, SqlitePool};

/// Columns plus the authoritative occupant count, computed from the
/// Active inmates assigned to each cell.
const CELL_SELECT: &str = "SELECT c.id, c.name, c.capacity, c.cell_type, c.status, c.location,
        (SELECT COUNT(*) FROM inmates i
          WHERE i.cell_id = c.id AND i.status = 'Active') AS current_count
   FROM cells c";

/// Fetch all cells in id order
pub async fn list_cells(pool: &SqlitePool) -> Result<Vec<Cell>> {
    let rows = sqlx::query(&format!("{} ORDER BY c.id", CELL_SELECT))
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_cell).collect()
}

/// Fetch one cell by id
pub async fn get_cell(pool: &SqlitePool, id: i64) -> Result<Option<Cell>> {
    let row = sqlx::query(&format!("{} WHERE c.id = ?", CELL_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_cell).transpose()
}

/// Insert a new cell and return the stored record
pub async fn insert_cell(pool: &SqlitePool, req: &CreateCellRequest) -> Result<Cell> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO cells (name, capacity, cell_type, status, location, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&req.name)
    .bind(req.capacity as i64)
    .bind(req.cell_type.to_string())
    .bind(req.status.to_string())
    .bind(&req.location)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_cell(pool, id)
        .await?
        .ok_or_else(|| cellward_common::Error::Internal("inserted cell vanished".to_string()))
}

/// Apply a partial update; returns None when the cell does not exist
pub async fn update_cell(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateCellRequest,
) -> Result<Option<Cell>> {
    let Some(existing) = get_cell(pool, id).await? else {
        return Ok(None);
    };

    let name = req.name.clone().unwrap_or(existing.name);
    let capacity = req.capacity.unwrap_or(existing.capacity);
    let cell_type = req.cell_type.unwrap_or(existing.cell_type);
    let status = req.status.unwrap_or(existing.status);
    let location = req.location.clone().or(existing.location);

    sqlx::query(
        "UPDATE cells SET name = ?, capacity = ?, cell_type = ?, status = ?, location = ?,
                updated_at = ?
          WHERE id = ?",
    )
    .bind(&name)
    .bind(capacity as i64)
    .bind(cell_type.to_string())
    .bind(status.to_string())
    .bind(&location)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    get_cell(pool, id).await
}

fn row_to_cell(row: &sqlx::sqlite::SqliteRow) -> Result<Cell> {
    Ok(Cell {
        id: row.get::<i64, _>(0),
        name: row.get::<String, _>(1),
        capacity: row.get::<i64, _>(2).max(0) as u32,
        cell_type: row.get::<String, _>(3).parse()?,
        status: row.get::<String, _>(4).parse()?,
        location: row.get::<Option<String>, _>(5),
        current_count: row.get::<i64, _>(6).max(0) as u32,
    })
}
