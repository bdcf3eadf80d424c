// src/models/notification.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;

// Identifica o par (registro, flag) que controla a idempotência de um e-mail.
// A flag é a única fonte de verdade de "esse e-mail já foi enviado".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagTarget {
    /// sales.completion_sent
    SaleCompletion(i64),
    /// sales.pre_due_sent
    SalePreDue(i64),
    /// installments.pre_due_sent
    InstallmentPreDue(i64),
    /// installments.due_day_sent
    InstallmentDueDay(i64),
}

// Um pedido de envio de e-mail. `target = None` significa envio sem controle
// de idempotência (ex.: boas-vindas de lead, que não tem flag).
#[derive(Debug, Clone)]
pub struct NotificationJob {
    pub target: Option<FlagTarget>,
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

// Um registro elegível a lembrete, já com o destinatário resolvido
// pelo join com a tabela de clientes.
#[derive(Debug, Clone)]
pub struct ReminderCandidate {
    pub target: FlagTarget,
    pub recipient: String,
    pub customer_name: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    // (número, total) quando o lembrete é de uma parcela do carnê.
    pub installment_label: Option<(i32, i32)>,
}
