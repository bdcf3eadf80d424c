// src/models/report.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Resumo agregado das vendas no período consultado.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub sales_count: i64,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
}
