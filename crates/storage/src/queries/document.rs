use chrono::Utc;
use mobility::store::Result;
use serde_json::Value;
use sqlx::{Executor, Sqlite};

use crate::data_model::document::DocumentRow;

use super::convert_error;

pub async fn get<'c, E>(executor: E, key: &str) -> Result<Option<Value>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row: Option<DocumentRow> = sqlx::query_as(
        "SELECT key, value, updated_at FROM documents WHERE key = ?1;",
    )
    .bind(key)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?;

    match row {
        Some(row) => Ok(Some(serde_json::from_str(&row.value)?)),
        None => Ok(None),
    }
}

pub async fn put<'c, E>(executor: E, key: &str, value: &Value) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        "
        INSERT INTO documents(
            key,
            value,
            updated_at
        )
        VALUES (?1, ?2, ?3)
        ON CONFLICT (key)
        DO UPDATE SET
            value = EXCLUDED.value,
            updated_at = EXCLUDED.updated_at;
        ",
    )
    .bind(key)
    .bind(serde_json::to_string(value)?)
    .bind(Utc::now())
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

pub async fn delete<'c, E>(executor: E, key: &str) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query("DELETE FROM documents WHERE key = ?1;")
        .bind(key)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    Ok(())
}
