// src/services/sweep_service.rs

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::{
    common::error::AppError,
    db::NotificationRepository,
    models::notification::{NotificationJob, ReminderCandidate},
    services::notification_service::{NotificationService, Notifier},
};

// As três consultas da varredura diária. O repositório real implementa;
// os testes usam um conjunto em memória.
#[async_trait]
pub trait SweepStore: Send + Sync {
    async fn sales_pre_due(&self, due: NaiveDate) -> Result<Vec<ReminderCandidate>, AppError>;
    async fn installments_pre_due(&self, due: NaiveDate)
        -> Result<Vec<ReminderCandidate>, AppError>;
    async fn installments_due_today(
        &self,
        due: NaiveDate,
    ) -> Result<Vec<ReminderCandidate>, AppError>;
}

#[async_trait]
impl SweepStore for NotificationRepository {
    async fn sales_pre_due(&self, due: NaiveDate) -> Result<Vec<ReminderCandidate>, AppError> {
        NotificationRepository::sales_pre_due(self, due).await
    }

    async fn installments_pre_due(
        &self,
        due: NaiveDate,
    ) -> Result<Vec<ReminderCandidate>, AppError> {
        NotificationRepository::installments_pre_due(self, due).await
    }

    async fn installments_due_today(
        &self,
        due: NaiveDate,
    ) -> Result<Vec<ReminderCandidate>, AppError> {
        NotificationRepository::installments_due_today(self, due).await
    }
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    // Preenchido quando a própria consulta do scan falhou.
    pub scan_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub as_of: NaiveDate,
    pub sales_pre_due: ScanOutcome,
    pub installments_pre_due: ScanOutcome,
    pub installments_due_today: ScanOutcome,
}

/// Roda os três scans de lembrete relativos à data `as_of`.
///
/// Cada scan é independente: erro de consulta em um não impede os demais, e
/// erro em um candidato não aborta o restante do scan. A idempotência fica a
/// cargo do `notify_once` (flag por registro).
pub async fn run_sweep<S, N>(as_of: NaiveDate, store: &S, notifier: &N) -> SweepReport
where
    S: SweepStore,
    N: Notifier,
{
    let tomorrow = as_of + Duration::days(1);

    let sales_pre_due = process_scan(
        "vendas a vencer",
        notifier,
        store.sales_pre_due(tomorrow).await,
        sale_pre_due_job,
    )
    .await;

    let installments_pre_due = process_scan(
        "parcelas a vencer",
        notifier,
        store.installments_pre_due(tomorrow).await,
        installment_pre_due_job,
    )
    .await;

    let installments_due_today = process_scan(
        "parcelas do dia",
        notifier,
        store.installments_due_today(as_of).await,
        installment_due_day_job,
    )
    .await;

    tracing::info!(
        "Varredura de {as_of}: vendas {}/{}; parcelas a vencer {}/{}; parcelas do dia {}/{}",
        sales_pre_due.sent,
        sales_pre_due.sent + sales_pre_due.skipped + sales_pre_due.failed,
        installments_pre_due.sent,
        installments_pre_due.sent + installments_pre_due.skipped + installments_pre_due.failed,
        installments_due_today.sent,
        installments_due_today.sent
            + installments_due_today.skipped
            + installments_due_today.failed,
    );

    SweepReport {
        as_of,
        sales_pre_due,
        installments_pre_due,
        installments_due_today,
    }
}

async fn process_scan<N: Notifier>(
    scan_name: &str,
    notifier: &N,
    candidates: Result<Vec<ReminderCandidate>, AppError>,
    build_job: fn(&ReminderCandidate) -> NotificationJob,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    let candidates = match candidates {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::error!("Varredura ({scan_name}): consulta falhou: {e}");
            outcome.scan_error = Some(e.to_string());
            return outcome;
        }
    };

    for candidate in candidates {
        match notifier.notify_once(&build_job(&candidate)).await {
            Ok(true) => outcome.sent += 1,
            Ok(false) => outcome.skipped += 1,
            Err(e) => {
                tracing::warn!(
                    "Varredura ({scan_name}): candidato {:?} falhou: {e}",
                    candidate.target
                );
                outcome.failed += 1;
            }
        }
    }

    outcome
}

// --- Montagem dos e-mails de lembrete ---

fn sale_pre_due_job(candidate: &ReminderCandidate) -> NotificationJob {
    NotificationJob {
        target: Some(candidate.target),
        recipient: candidate.recipient.clone(),
        subject: "Lembrete: pagamento vence amanhã".to_string(),
        html_body: format!(
            "<p>Olá, {}!</p>\
             <p>Sua compra de <strong>R$ {}</strong> vence amanhã ({}).</p>",
            candidate.customer_name,
            candidate.amount.round_dp(2),
            candidate.due_date.format("%d/%m/%Y"),
        ),
    }
}

fn installment_pre_due_job(candidate: &ReminderCandidate) -> NotificationJob {
    NotificationJob {
        target: Some(candidate.target),
        recipient: candidate.recipient.clone(),
        subject: "Lembrete: parcela do carnê vence amanhã".to_string(),
        html_body: format!(
            "<p>Olá, {}!</p>\
             <p>A parcela {} do seu carnê, de <strong>R$ {}</strong>, vence amanhã ({}).</p>",
            candidate.customer_name,
            installment_label(candidate),
            candidate.amount.round_dp(2),
            candidate.due_date.format("%d/%m/%Y"),
        ),
    }
}

fn installment_due_day_job(candidate: &ReminderCandidate) -> NotificationJob {
    NotificationJob {
        target: Some(candidate.target),
        recipient: candidate.recipient.clone(),
        subject: "Sua parcela vence hoje".to_string(),
        html_body: format!(
            "<p>Olá, {}!</p>\
             <p>A parcela {} do seu carnê, de <strong>R$ {}</strong>, vence hoje ({}).</p>",
            candidate.customer_name,
            installment_label(candidate),
            candidate.amount.round_dp(2),
            candidate.due_date.format("%d/%m/%Y"),
        ),
    }
}

fn installment_label(candidate: &ReminderCandidate) -> String {
    match candidate.installment_label {
        Some((number, total)) => format!("{number}/{total}"),
        None => String::new(),
    }
}

// Liga o relógio de verdade (data local) à varredura pura acima.
// É este wrapper que o agendador diário invoca.
#[derive(Clone)]
pub struct SweepService {
    store: NotificationRepository,
    notifier: NotificationService<NotificationRepository>,
}

impl SweepService {
    pub fn new(
        store: NotificationRepository,
        notifier: NotificationService<NotificationRepository>,
    ) -> Self {
        Self { store, notifier }
    }

    pub async fn run(&self) -> SweepReport {
        let today = Local::now().date_naive();
        run_sweep(today, &self.store, &self.notifier).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, HashSet},
        sync::Mutex,
    };

    use rust_decimal::Decimal;

    use super::*;
    use crate::models::notification::FlagTarget;

    #[derive(Default)]
    struct MemStore {
        // Candidatos indexados pela data que cada consulta recebe.
        sales: HashMap<NaiveDate, Vec<ReminderCandidate>>,
        installments_pre: HashMap<NaiveDate, Vec<ReminderCandidate>>,
        installments_today: HashMap<NaiveDate, Vec<ReminderCandidate>>,
        fail_sales_scan: bool,
    }

    #[async_trait]
    impl SweepStore for MemStore {
        async fn sales_pre_due(
            &self,
            due: NaiveDate,
        ) -> Result<Vec<ReminderCandidate>, AppError> {
            if self.fail_sales_scan {
                return Err(AppError::Internal(anyhow::anyhow!("banco fora do ar")));
            }
            Ok(self.sales.get(&due).cloned().unwrap_or_default())
        }

        async fn installments_pre_due(
            &self,
            due: NaiveDate,
        ) -> Result<Vec<ReminderCandidate>, AppError> {
            Ok(self.installments_pre.get(&due).cloned().unwrap_or_default())
        }

        async fn installments_due_today(
            &self,
            due: NaiveDate,
        ) -> Result<Vec<ReminderCandidate>, AppError> {
            Ok(self
                .installments_today
                .get(&due)
                .cloned()
                .unwrap_or_default())
        }
    }

    // Dublê que marca flags em memória: segunda notificação do mesmo alvo
    // é pulada, como no serviço real.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<NotificationJob>>,
        flags: Mutex<HashSet<FlagTarget>>,
        fail_target: Option<FlagTarget>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_once(&self, job: &NotificationJob) -> Result<bool, AppError> {
            let target = job.target.expect("varredura sempre tem flag");
            if self.fail_target == Some(target) {
                return Err(AppError::Internal(anyhow::anyhow!("envio quebrou")));
            }
            if !self.flags.lock().unwrap().insert(target) {
                return Ok(false);
            }
            self.sent.lock().unwrap().push(job.clone());
            Ok(true)
        }
    }

    fn candidate(target: FlagTarget, due_date: NaiveDate) -> ReminderCandidate {
        ReminderCandidate {
            target,
            recipient: "cliente@exemplo.com".to_string(),
            customer_name: "Maria".to_string(),
            amount: Decimal::new(15000, 2),
            due_date,
            installment_label: Some((2, 10)),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[tokio::test]
    async fn installment_due_tomorrow_gets_one_email_and_only_once() {
        let tomorrow = day() + Duration::days(1);
        let store = MemStore {
            installments_pre: HashMap::from([(
                tomorrow,
                vec![candidate(FlagTarget::InstallmentPreDue(1), tomorrow)],
            )]),
            ..Default::default()
        };
        let notifier = RecordingNotifier::default();

        let report = run_sweep(day(), &store, &notifier).await;
        assert_eq!(report.installments_pre_due.sent, 1);

        // Segunda varredura no mesmo dia: a flag já está marcada.
        let report = run_sweep(day(), &store, &notifier).await;
        assert_eq!(report.installments_pre_due.sent, 0);
        assert_eq!(report.installments_pre_due.skipped, 1);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scans_use_the_right_dates() {
        let today = day();
        let tomorrow = today + Duration::days(1);
        let store = MemStore {
            sales: HashMap::from([(
                tomorrow,
                vec![candidate(FlagTarget::SalePreDue(5), tomorrow)],
            )]),
            installments_today: HashMap::from([(
                today,
                vec![candidate(FlagTarget::InstallmentDueDay(9), today)],
            )]),
            ..Default::default()
        };
        let notifier = RecordingNotifier::default();

        let report = run_sweep(today, &store, &notifier).await;

        assert_eq!(report.sales_pre_due.sent, 1);
        assert_eq!(report.installments_pre_due.sent, 0);
        assert_eq!(report.installments_due_today.sent, 1);
    }

    #[tokio::test]
    async fn failing_candidate_does_not_abort_the_scan() {
        let today = day();
        let store = MemStore {
            installments_today: HashMap::from([(
                today,
                vec![
                    candidate(FlagTarget::InstallmentDueDay(1), today),
                    candidate(FlagTarget::InstallmentDueDay(2), today),
                ],
            )]),
            ..Default::default()
        };
        let notifier = RecordingNotifier {
            fail_target: Some(FlagTarget::InstallmentDueDay(1)),
            ..Default::default()
        };

        let report = run_sweep(today, &store, &notifier).await;

        assert_eq!(report.installments_due_today.failed, 1);
        assert_eq!(report.installments_due_today.sent, 1);
    }

    #[tokio::test]
    async fn failing_scan_does_not_block_siblings() {
        let today = day();
        let store = MemStore {
            fail_sales_scan: true,
            installments_today: HashMap::from([(
                today,
                vec![candidate(FlagTarget::InstallmentDueDay(3), today)],
            )]),
            ..Default::default()
        };
        let notifier = RecordingNotifier::default();

        let report = run_sweep(today, &store, &notifier).await;

        assert!(report.sales_pre_due.scan_error.is_some());
        assert_eq!(report.sales_pre_due.sent, 0);
        assert_eq!(report.installments_due_today.sent, 1);
    }
}
