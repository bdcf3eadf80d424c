// src/models/sale.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// --- ENUMS ---

// Mapeia o CREATE TYPE payment_method do banco.
// Os valores na API e no banco são os mesmos ("dinheiro", "pix", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method")]
pub enum PaymentMethod {
    #[sqlx(rename = "dinheiro")]
    #[serde(rename = "dinheiro")]
    Cash,
    #[sqlx(rename = "pix")]
    #[serde(rename = "pix")]
    Pix,
    #[sqlx(rename = "cartao")]
    #[serde(rename = "cartao")]
    Card,
    // Venda no carnê: gera o cronograma de parcelas na criação.
    #[sqlx(rename = "carne")]
    #[serde(rename = "carne")]
    InstallmentPlan,
}

// --- STRUCTS ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: i64,
    pub customer_id: Option<i64>,

    pub total: Decimal,
    // Hoje lucro == total (sem custo de mercadoria). Comportamento herdado.
    pub profit: Decimal,

    pub due_date: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    pub purchase_date: NaiveDate,

    // Flags de notificação: transitam de false para true uma única vez.
    pub completion_sent: bool,
    pub pre_due_sent: bool,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    // Snapshot do preço no momento da venda; nunca recalculado.
    pub unit_price_at_sale: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_uses_wire_values() {
        let json = serde_json::to_string(&PaymentMethod::Cash).unwrap();
        assert_eq!(json, r#""dinheiro""#);

        let parsed: PaymentMethod = serde_json::from_str(r#""carne""#).unwrap();
        assert_eq!(parsed, PaymentMethod::InstallmentPlan);

        let parsed: PaymentMethod = serde_json::from_str(r#""cartao""#).unwrap();
        assert_eq!(parsed, PaymentMethod::Card);
    }
}
