// src/models/installment.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "installment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Open,
    Paid,
}

// Uma parcela do carnê. O cronograma inteiro é gerado na criação da venda
// e nunca renumerado depois.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: i64,
    pub sale_id: i64,

    // Numeração 1..total_installments.
    pub installment_number: i32,
    pub total_installments: i32,

    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,

    pub pre_due_sent: bool,
    pub due_day_sent: bool,

    pub created_at: DateTime<Utc>,
}
