// src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
    // E-mail é único: é para ele que vão confirmações e lembretes de cobrança.
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}
