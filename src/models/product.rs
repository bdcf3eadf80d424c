// src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub unit_price: Decimal,
    // Pode ficar negativo: a baixa de estoque não impõe piso em zero.
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}
