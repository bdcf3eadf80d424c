// src/services/sale_service.rs

use async_trait::async_trait;
use chrono::{Local, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::mpsc;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::{CustomerRepository, InstallmentRepository, ProductRepository, SaleRepository},
    models::{
        customer::Customer,
        notification::{FlagTarget, NotificationJob},
        sale::{PaymentMethod, Sale},
    },
    services::notification_service,
};

// Entrada já validada pelo handler.
#[derive(Debug, Clone)]
pub struct NewSaleItem {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewInstallmentPlan {
    pub count: i32,
    pub installment_amount: Decimal,
    pub first_due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSale {
    pub sale_id: i64,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub purchase_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: i64,
    pub delta: i32,
}

#[derive(Debug, Clone)]
pub struct NewInstallment {
    pub number: i32,
    pub count: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

/// Todas as escritas de uma venda, já resolvidas. O serviço monta o rascunho;
/// o store aplica tudo numa transação só.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub customer_id: Option<i64>,
    pub total: Decimal,
    pub profit: Decimal,
    pub due_date: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    pub purchase_date: NaiveDate,
    pub items: Vec<NewSaleItem>,
    pub stock_adjustments: Vec<StockAdjustment>,
    pub installments: Vec<NewInstallment>,
}

// Persistência da venda. Implementada sobre o Postgres em produção e por um
// store em memória nos testes.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Aplica o rascunho inteiro atomicamente e devolve a venda criada.
    async fn persist(&self, draft: &SaleDraft) -> Result<Sale, AppError>;

    async fn find_customer(&self, customer_id: i64) -> Result<Option<Customer>, AppError>;
}

#[derive(Clone)]
pub struct PgSaleStore {
    pool: PgPool,
    sale_repo: SaleRepository,
    product_repo: ProductRepository,
    installment_repo: InstallmentRepository,
    customer_repo: CustomerRepository,
}

impl PgSaleStore {
    pub fn new(
        pool: PgPool,
        sale_repo: SaleRepository,
        product_repo: ProductRepository,
        installment_repo: InstallmentRepository,
        customer_repo: CustomerRepository,
    ) -> Self {
        Self {
            pool,
            sale_repo,
            product_repo,
            installment_repo,
            customer_repo,
        }
    }
}

#[async_trait]
impl SaleStore for PgSaleStore {
    async fn persist(&self, draft: &SaleDraft) -> Result<Sale, AppError> {
        let mut tx = self.pool.begin().await?;

        let sale = self
            .sale_repo
            .insert_sale(
                &mut *tx,
                draft.customer_id,
                draft.total,
                draft.profit,
                draft.due_date,
                draft.payment_method,
                draft.purchase_date,
            )
            .await?;

        for item in &draft.items {
            self.sale_repo
                .insert_item(
                    &mut *tx,
                    sale.id,
                    item.product_id,
                    item.quantity,
                    item.unit_price,
                )
                .await?;
        }

        // Produto inexistente passa em branco (rows_affected = 0), como no
        // sistema antigo.
        for adjustment in &draft.stock_adjustments {
            self.product_repo
                .adjust_stock(&mut *tx, adjustment.product_id, adjustment.delta)
                .await?;
        }

        for parcel in &draft.installments {
            self.installment_repo
                .insert(
                    &mut *tx,
                    sale.id,
                    parcel.number,
                    parcel.count,
                    parcel.amount,
                    parcel.due_date,
                )
                .await?;
        }

        tx.commit().await?;

        Ok(sale)
    }

    async fn find_customer(&self, customer_id: i64) -> Result<Option<Customer>, AppError> {
        self.customer_repo.find_by_id(customer_id).await
    }
}

/// Soma dos subtotais (preço × quantidade), arredondada a duas casas.
pub fn sale_total(items: &[NewSaleItem]) -> Decimal {
    items
        .iter()
        .map(|item| item.unit_price * Decimal::from(item.quantity))
        .sum::<Decimal>()
        .round_dp(2)
}

/// Vencimentos do carnê: `count` datas espaçadas em meses de calendário a
/// partir da primeira (fim de mês é grampeado, ex.: 31/01 -> 29/02).
pub fn installment_schedule(
    first_due_date: NaiveDate,
    count: i32,
) -> Result<Vec<NaiveDate>, AppError> {
    (0..count.max(0) as u32)
        .map(|i| {
            first_due_date
                .checked_add_months(Months::new(i))
                .ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!("Vencimento fora do intervalo suportado"))
                })
        })
        .collect()
}

#[derive(Clone)]
pub struct SaleService<S: SaleStore> {
    store: S,
    notifications: mpsc::Sender<NotificationJob>,
}

impl<S: SaleStore> SaleService<S> {
    pub fn new(store: S, notifications: mpsc::Sender<NotificationJob>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Cria a venda como unidade atômica: venda + itens + baixa de estoque +
    /// (se carnê) cronograma de parcelas. O e-mail de confirmação é apenas
    /// enfileirado depois do commit; falha nele nunca desfaz a venda.
    pub async fn create_sale(
        &self,
        customer_id: Option<i64>,
        items: &[NewSaleItem],
        due_date: Option<NaiveDate>,
        payment_method: PaymentMethod,
        purchase_date: Option<NaiveDate>,
        plan: Option<&NewInstallmentPlan>,
    ) -> Result<CreatedSale, AppError> {
        if items.is_empty() {
            let mut errors = ValidationErrors::new();
            let mut error = ValidationError::new("length");
            error.message = Some("A venda precisa de ao menos um item.".into());
            errors.add("items", error);
            return Err(AppError::Validation(errors));
        }

        let total = sale_total(items);
        // Lucro hoje é idêntico ao total: não há custo de mercadoria
        // cadastrado para subtrair. Comportamento herdado do sistema antigo.
        let profit = total;
        let purchase_date = purchase_date.unwrap_or_else(|| Local::now().date_naive());

        // Uma baixa por item, no valor exato da quantidade vendida.
        let stock_adjustments = items
            .iter()
            .map(|item| StockAdjustment {
                product_id: item.product_id,
                delta: -item.quantity,
            })
            .collect();

        let installments = match (payment_method, plan) {
            (PaymentMethod::InstallmentPlan, Some(plan)) => {
                installment_schedule(plan.first_due_date, plan.count)?
                    .into_iter()
                    .zip(1..)
                    .map(|(due_date, number)| NewInstallment {
                        number,
                        count: plan.count,
                        amount: plan.installment_amount,
                        due_date,
                    })
                    .collect()
            }
            _ => Vec::new(),
        };

        let draft = SaleDraft {
            customer_id,
            total,
            profit,
            due_date,
            payment_method,
            purchase_date,
            items: items.to_vec(),
            stock_adjustments,
            installments,
        };

        let sale = self.store.persist(&draft).await?;

        // Pós-commit: qualquer falha daqui em diante é só logada.
        if let Some(customer_id) = customer_id {
            match self.store.find_customer(customer_id).await {
                Ok(Some(customer)) => {
                    let job = purchase_confirmation_job(&customer, &sale);
                    notification_service::enqueue(&self.notifications, job);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Venda {} criada, mas cliente não pôde ser lido: {e}", sale.id)
                }
            }
        }

        Ok(CreatedSale {
            sale_id: sale.id,
            total: sale.total,
            payment_method: sale.payment_method,
            purchase_date: sale.purchase_date,
        })
    }
}

fn purchase_confirmation_job(customer: &Customer, sale: &Sale) -> NotificationJob {
    let html_body = format!(
        "<h2>Obrigado pela sua compra, {}!</h2>\
         <p>Recebemos sua compra de <strong>R$ {}</strong> em {}.</p>\
         <p>Qualquer dúvida, é só responder este e-mail.</p>",
        customer.name,
        sale.total.round_dp(2),
        sale.purchase_date.format("%d/%m/%Y"),
    );

    NotificationJob {
        target: Some(FlagTarget::SaleCompletion(sale.id)),
        recipient: customer.email.clone(),
        subject: "Confirmação de compra".to_string(),
        html_body,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_decimal::prelude::FromPrimitive;

    use super::*;

    fn item(product_id: i64, quantity: i32, unit_price: &str) -> NewSaleItem {
        NewSaleItem {
            product_id,
            quantity,
            unit_price: unit_price.parse().unwrap(),
        }
    }

    #[test]
    fn total_is_sum_of_subtotals() {
        let items = [item(1, 2, "10.00"), item(2, 3, "5.50")];
        assert_eq!(sale_total(&items), Decimal::from_f64(36.50).unwrap());
    }

    #[test]
    fn total_rounds_to_two_decimals() {
        let items = [item(1, 1, "0.333"), item(2, 1, "0.333")];
        assert_eq!(sale_total(&items).to_string(), "0.67");
    }

    #[test]
    fn single_item_scenario_totals_twenty() {
        // items=[{productId:1, quantity:2, unitPrice:10.00}] => total 20.00
        let items = [item(1, 2, "10.00")];
        assert_eq!(sale_total(&items).to_string(), "20.00");
    }

    #[test]
    fn schedule_spaces_due_dates_one_month_apart() {
        let first = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let schedule = installment_schedule(first, 3).unwrap();

        assert_eq!(
            schedule,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            ]
        );
    }

    #[test]
    fn schedule_clamps_month_end() {
        let first = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let schedule = installment_schedule(first, 2).unwrap();

        assert_eq!(schedule[1], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[derive(Default)]
    struct MemSaleStore {
        drafts: Mutex<Vec<SaleDraft>>,
        customer: Option<Customer>,
    }

    impl MemSaleStore {
        fn with_customer(customer: Customer) -> Self {
            Self {
                customer: Some(customer),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl SaleStore for MemSaleStore {
        async fn persist(&self, draft: &SaleDraft) -> Result<Sale, AppError> {
            self.drafts.lock().unwrap().push(draft.clone());
            Ok(Sale {
                id: 42,
                customer_id: draft.customer_id,
                total: draft.total,
                profit: draft.profit,
                due_date: draft.due_date,
                payment_method: draft.payment_method,
                purchase_date: draft.purchase_date,
                completion_sent: false,
                pre_due_sent: false,
                created_at: Utc::now(),
            })
        }

        async fn find_customer(&self, _customer_id: i64) -> Result<Option<Customer>, AppError> {
            Ok(self.customer.clone())
        }
    }

    fn customer() -> Customer {
        Customer {
            id: 4,
            name: "Maria".to_string(),
            email: "maria@exemplo.com".to_string(),
            phone: None,
            created_at: Utc::now(),
        }
    }

    fn service(store: MemSaleStore) -> (SaleService<MemSaleStore>, mpsc::Receiver<NotificationJob>)
    {
        let (tx, rx) = mpsc::channel(4);
        (SaleService::new(store, tx), rx)
    }

    #[tokio::test]
    async fn sale_persists_one_item_row_and_one_stock_debit_per_item() {
        let (service, mut rx) = service(MemSaleStore::with_customer(customer()));

        let items = [item(1, 2, "10.00"), item(2, 3, "5.50")];
        let created = service
            .create_sale(Some(4), &items, None, PaymentMethod::Pix, None, None)
            .await
            .unwrap();

        assert_eq!(created.sale_id, 42);
        assert_eq!(created.total.to_string(), "36.50");

        let drafts = service.store.drafts.lock().unwrap();
        assert_eq!(drafts.len(), 1);
        let draft = &drafts[0];

        // N itens => N linhas de item e N baixas de estoque, cada uma com
        // delta igual a -quantidade.
        assert_eq!(draft.items.len(), 2);
        assert_eq!(
            draft.stock_adjustments,
            vec![
                StockAdjustment {
                    product_id: 1,
                    delta: -2
                },
                StockAdjustment {
                    product_id: 2,
                    delta: -3
                },
            ]
        );
        assert!(draft.installments.is_empty());

        // Confirmação de compra foi enfileirada para o cliente da venda.
        let job = rx.try_recv().unwrap();
        assert_eq!(job.target, Some(FlagTarget::SaleCompletion(42)));
        assert_eq!(job.recipient, "maria@exemplo.com");
    }

    #[tokio::test]
    async fn installment_sale_persists_full_schedule() {
        let (service, _rx) = service(MemSaleStore::default());

        let plan = NewInstallmentPlan {
            count: 3,
            installment_amount: "50.00".parse().unwrap(),
            first_due_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        };
        service
            .create_sale(
                None,
                &[item(1, 1, "150.00")],
                None,
                PaymentMethod::InstallmentPlan,
                None,
                Some(&plan),
            )
            .await
            .unwrap();

        let drafts = service.store.drafts.lock().unwrap();
        let parcels = &drafts[0].installments;
        assert_eq!(parcels.len(), 3);
        assert_eq!(
            parcels.iter().map(|p| p.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            parcels[2].due_date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert!(parcels.iter().all(|p| p.amount.to_string() == "50.00"));
    }

    #[tokio::test]
    async fn empty_items_rejected_before_touching_storage() {
        let (service, mut rx) = service(MemSaleStore::default());

        let result = service
            .create_sale(None, &[], None, PaymentMethod::Cash, None, None)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(service.store.drafts.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }
}
