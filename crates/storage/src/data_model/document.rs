use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
