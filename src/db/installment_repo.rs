// src/db/installment_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::installment::{Installment, InstallmentStatus},
};

#[derive(Clone)]
pub struct InstallmentRepository {
    pool: PgPool,
}

impl InstallmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        sale_id: i64,
        installment_number: i32,
        total_installments: i32,
        amount: Decimal,
        due_date: NaiveDate,
    ) -> Result<Installment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let installment = sqlx::query_as::<_, Installment>(
            "INSERT INTO installments
                 (sale_id, installment_number, total_installments, amount, due_date)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(sale_id)
        .bind(installment_number)
        .bind(total_installments)
        .bind(amount)
        .bind(due_date)
        .fetch_one(executor)
        .await?;

        Ok(installment)
    }

    // Sem filtro, devolve o carnê inteiro de todas as vendas.
    pub async fn list(&self, sale_id: Option<i64>) -> Result<Vec<Installment>, AppError> {
        let installments = sqlx::query_as::<_, Installment>(
            "SELECT * FROM installments
             WHERE ($1::bigint IS NULL OR sale_id = $1)
             ORDER BY due_date ASC, installment_number ASC",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    pub async fn mark_paid(&self, id: i64) -> Result<Option<Installment>, AppError> {
        let installment = sqlx::query_as::<_, Installment>(
            "UPDATE installments SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(InstallmentStatus::Paid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(installment)
    }
}
