// src/db/customer_repo.rs

use sqlx::PgPool;

use crate::{common::error::AppError, models::customer::Customer};

// O repositório de clientes, responsável por todas as interações com a tabela 'customers'
#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            "INSERT INTO customers (name, email, phone) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Este e-mail já está em uso."))
    }

    pub async fn list(&self) -> Result<Vec<Customer>, AppError> {
        let customers =
            sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(customers)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }
}
