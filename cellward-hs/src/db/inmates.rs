//! Inmate record queries

use cellward_common::api::types::AdmitInmateRequest;
use cellward_common::{Inmate, InmateStatus, Result};
use sqlx::{Row, SqlitePool};

const INMATE_SELECT: &str =
    "SELECT id, first_name, last_name, gender, status, cell_id FROM inmates";

/// Count inmates, optionally filtered by status
pub async fn count_inmates(pool: &SqlitePool, status: Option<InmateStatus>) -> Result<i64> {
    let count = match status {
        Some(status) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM inmates WHERE status = ?")
                .bind(status.to_string())
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM inmates")
                .fetch_one(pool)
                .await?
        }
    };
    Ok(count)
}

/// Fetch one roster page in id order
pub async fn list_inmates(
    pool: &SqlitePool,
    status: Option<InmateStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Inmate>> {
    let rows = match status {
        Some(status) => {
            sqlx::query(&format!(
                "{} WHERE status = ? ORDER BY id LIMIT ? OFFSET ?",
                INMATE_SELECT
            ))
            .bind(status.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!("{} ORDER BY id LIMIT ? OFFSET ?", INMATE_SELECT))
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(row_to_inmate).collect()
}

/// Fetch every inmate (used to seed the ledger at startup)
pub async fn list_all_inmates(pool: &SqlitePool) -> Result<Vec<Inmate>> {
    let rows = sqlx::query(&format!("{} ORDER BY id", INMATE_SELECT))
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_inmate).collect()
}

/// Fetch one inmate by id
pub async fn get_inmate(pool: &SqlitePool, id: i64) -> Result<Option<Inmate>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", INMATE_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_inmate).transpose()
}

/// Insert an admission and return the stored record
pub async fn insert_inmate(pool: &SqlitePool, req: &AdmitInmateRequest) -> Result<Inmate> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO inmates (first_name, last_name, gender, status, cell_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(req.gender.to_string())
    .bind(req.status.to_string())
    .bind(req.cell_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_inmate(pool, id)
        .await?
        .ok_or_else(|| cellward_common::Error::Internal("inserted inmate vanished".to_string()))
}

/// Persist a full inmate snapshot
pub async fn update_inmate(pool: &SqlitePool, inmate: &Inmate) -> Result<()> {
    sqlx::query(
        "UPDATE inmates SET first_name = ?, last_name = ?, gender = ?, status = ?, cell_id = ?,
                updated_at = ?
          WHERE id = ?",
    )
    .bind(&inmate.first_name)
    .bind(&inmate.last_name)
    .bind(inmate.gender.to_string())
    .bind(inmate.status.to_string())
    .bind(inmate.cell_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(inmate.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete an inmate row; returns false when no row matched
pub async fn delete_inmate(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM inmates WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn row_to_inmate(row: &sqlx::sqlite::SqliteRow) -> Result<Inmate> {
    Ok(Inmate {
        id: row.get::<i64, _>(0),
        first_name: row.get::<String, _>(1),
        last_name: row.get::<String, _>(2),
        gender: row.get::<String, _>(3).parse()?,
        status: row.get::<String, _>(4).parse()?,
        cell_id: row.get::<Option<i64>, _>(5),
    })
}
