// src/models/lead.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Lead capturado pelo fluxo de login externo (ainda não é cliente).
// Upsert pela chave de e-mail: em conflito, sobrescreve os dados de perfil
// mas preserva id e created_at originais.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    pub external_id: Option<String>,
    pub name: Option<String>,
    pub email: String,
    pub picture_url: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}
