// src/db/product_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::{common::error::AppError, models::product::Product};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        unit_price: Decimal,
        stock_quantity: i32,
    ) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (name, unit_price, stock_quantity)
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(unit_price)
        .bind(stock_quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn list(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Aplica um delta (positivo ou negativo) ao estoque do produto.
    /// Sem piso em zero: estoque negativo é tolerado pela política atual.
    /// Produto inexistente resulta em rows_affected = 0, sem erro distinto.
    pub async fn adjust_stock<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        delta: i32,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result =
            sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $1 WHERE id = $2")
                .bind(delta)
                .bind(product_id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected())
    }
}
