// src/db/notification_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::{
    common::error::AppError,
    models::notification::{FlagTarget, ReminderCandidate},
};

// Traduz o alvo lógico para a tabela/coluna que guarda a flag.
// Identificadores estáticos: seguros para interpolar no SQL.
fn flag_location(target: &FlagTarget) -> (&'static str, &'static str, i64) {
    match *target {
        FlagTarget::SaleCompletion(id) => ("sales", "completion_sent", id),
        FlagTarget::SalePreDue(id) => ("sales", "pre_due_sent", id),
        FlagTarget::InstallmentPreDue(id) => ("installments", "pre_due_sent", id),
        FlagTarget::InstallmentDueDay(id) => ("installments", "due_day_sent", id),
    }
}

#[derive(FromRow)]
struct SaleDueRow {
    id: i64,
    total: Decimal,
    due_date: NaiveDate,
    email: String,
    name: String,
}

#[derive(FromRow)]
struct InstallmentDueRow {
    id: i64,
    amount: Decimal,
    due_date: NaiveDate,
    installment_number: i32,
    total_installments: i32,
    email: String,
    name: String,
}

// Repositório das flags de idempotência e das consultas da varredura diária.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `Some(false)` = ainda não enviado; `Some(true)` = já enviado;
    /// `None` = o registro não existe mais.
    pub async fn flag_state(&self, target: &FlagTarget) -> Result<Option<bool>, AppError> {
        let (table, column, id) = flag_location(target);

        let state = sqlx::query_scalar::<_, bool>(&format!(
            "SELECT {column} FROM {table} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    /// Vira a flag de false para true de forma condicional. Retorna `false`
    /// quando outro caminho já a tinha marcado (ou o registro sumiu).
    pub async fn mark_sent(&self, target: &FlagTarget) -> Result<bool, AppError> {
        let (table, column, id) = flag_location(target);

        let result = sqlx::query(&format!(
            "UPDATE {table} SET {column} = TRUE WHERE id = $1 AND {column} = FALSE"
        ))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  Consultas da varredura (uma por scan; o INNER JOIN com customers já
    //  descarta vendas sem cliente, que não têm destinatário resolvível)
    // =========================================================================

    /// Vendas à vista (dinheiro/pix/cartão) que vencem na data informada
    /// e ainda não receberam o lembrete de pré-vencimento.
    pub async fn sales_pre_due(&self, due: NaiveDate) -> Result<Vec<ReminderCandidate>, AppError> {
        let rows = sqlx::query_as::<_, SaleDueRow>(
            "SELECT s.id, s.total, s.due_date, c.email, c.name
             FROM sales s
             JOIN customers c ON c.id = s.customer_id
             WHERE s.due_date = $1
               AND s.payment_method IN ('dinheiro', 'pix', 'cartao')
               AND s.pre_due_sent = FALSE",
        )
        .bind(due)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ReminderCandidate {
                target: FlagTarget::SalePreDue(r.id),
                recipient: r.email,
                customer_name: r.name,
                amount: r.total,
                due_date: r.due_date,
                installment_label: None,
            })
            .collect())
    }

    pub async fn installments_pre_due(
        &self,
        due: NaiveDate,
    ) -> Result<Vec<ReminderCandidate>, AppError> {
        let rows = self.installments_due(due, "pre_due_sent").await?;

        Ok(rows
            .into_iter()
            .map(|r| ReminderCandidate {
                target: FlagTarget::InstallmentPreDue(r.id),
                recipient: r.email,
                customer_name: r.name,
                amount: r.amount,
                due_date: r.due_date,
                installment_label: Some((r.installment_number, r.total_installments)),
            })
            .collect())
    }

    pub async fn installments_due_today(
        &self,
        due: NaiveDate,
    ) -> Result<Vec<ReminderCandidate>, AppError> {
        let rows = self.installments_due(due, "due_day_sent").await?;

        Ok(rows
            .into_iter()
            .map(|r| ReminderCandidate {
                target: FlagTarget::InstallmentDueDay(r.id),
                recipient: r.email,
                customer_name: r.name,
                amount: r.amount,
                due_date: r.due_date,
                installment_label: Some((r.installment_number, r.total_installments)),
            })
            .collect())
    }

    async fn installments_due(
        &self,
        due: NaiveDate,
        unsent_column: &'static str,
    ) -> Result<Vec<InstallmentDueRow>, AppError> {
        let rows = sqlx::query_as::<_, InstallmentDueRow>(&format!(
            "SELECT i.id, i.amount, i.due_date,
                    i.installment_number, i.total_installments,
                    c.email, c.name
             FROM installments i
             JOIN sales s ON s.id = i.sale_id
             JOIN customers c ON c.id = s.customer_id
             WHERE i.due_date = $1
               AND i.status = 'open'
               AND i.{unsent_column} = FALSE"
        ))
        .bind(due)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
