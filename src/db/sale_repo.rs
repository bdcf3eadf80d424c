// src/db/sale_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::{
        report::SalesSummary,
        sale::{PaymentMethod, Sale, SaleItem},
    },
};

#[derive(Clone)]
pub struct SaleRepository {
    pool: PgPool,
}

impl SaleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // A inserção recebe um executor genérico para participar da transação
    // aberta pelo service (venda + itens + estoque + parcelas são atômicos).
    pub async fn insert_sale<'e, E>(
        &self,
        executor: E,
        customer_id: Option<i64>,
        total: Decimal,
        profit: Decimal,
        due_date: Option<NaiveDate>,
        payment_method: PaymentMethod,
        purchase_date: NaiveDate,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            "INSERT INTO sales (customer_id, total, profit, due_date, payment_method, purchase_date)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(customer_id)
        .bind(total)
        .bind(profit)
        .bind(due_date)
        .bind(payment_method)
        .bind(purchase_date)
        .fetch_one(executor)
        .await?;

        Ok(sale)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        sale_id: i64,
        product_id: i64,
        quantity: i32,
        unit_price_at_sale: Decimal,
    ) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, SaleItem>(
            "INSERT INTO sale_items (sale_id, product_id, quantity, unit_price_at_sale)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(sale_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price_at_sale)
        .fetch_one(executor)
        .await?;

        Ok(item)
    }

    pub async fn list(&self) -> Result<Vec<Sale>, AppError> {
        let sales = sqlx::query_as::<_, Sale>("SELECT * FROM sales ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    pub async fn list_items(&self, sale_id: i64) -> Result<Vec<SaleItem>, AppError> {
        let items =
            sqlx::query_as::<_, SaleItem>("SELECT * FROM sale_items WHERE sale_id = $1 ORDER BY id")
                .bind(sale_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(items)
    }

    // O ON DELETE CASCADE do esquema leva junto itens e parcelas.
    pub async fn delete(&self, id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn summary(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<SalesSummary, AppError> {
        let summary = sqlx::query_as::<_, SalesSummary>(
            "SELECT COUNT(*) AS sales_count,
                    COALESCE(SUM(total), 0) AS total_revenue,
                    COALESCE(SUM(profit), 0) AS total_profit
             FROM sales
             WHERE ($1::date IS NULL OR purchase_date >= $1)
               AND ($2::date IS NULL OR purchase_date <= $2)",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }
}
