// src/db/lead_repo.rs

use sqlx::PgPool;

use crate::{common::error::AppError, models::lead::Lead};

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert pela chave de e-mail: em conflito, atualiza o perfil
    /// e mantém id e created_at do registro original.
    pub async fn upsert(
        &self,
        external_id: Option<&str>,
        name: Option<&str>,
        email: &str,
        picture_url: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Lead, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            "INSERT INTO leads (external_id, name, email, picture_url, phone)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (email) DO UPDATE SET
                 external_id = EXCLUDED.external_id,
                 name        = EXCLUDED.name,
                 picture_url = EXCLUDED.picture_url,
                 phone       = EXCLUDED.phone
             RETURNING *",
        )
        .bind(external_id)
        .bind(name)
        .bind(email)
        .bind(picture_url)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn list(&self) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(leads)
    }
}
