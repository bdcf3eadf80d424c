// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::mpsc;

use crate::{
    db::{
        CustomerRepository, InstallmentRepository, LeadRepository, NotificationRepository,
        ProductRepository, SaleRepository,
    },
    models::notification::NotificationJob,
    services::{
        mailer::{DisabledMailer, Mailer, SmtpMailer},
        notification_service::{spawn_notification_worker, NotificationService},
        sale_service::{PgSaleStore, SaleService},
        sweep_service::SweepService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,

    pub customer_repo: CustomerRepository,
    pub product_repo: ProductRepository,
    pub sale_repo: SaleRepository,
    pub installment_repo: InstallmentRepository,
    pub lead_repo: LeadRepository,

    pub sale_service: SaleService<PgSaleStore>,
    pub sweep_service: SweepService,

    // Fila de e-mails: os handlers só enfileiram, o worker envia.
    pub notifications: mpsc::Sender<NotificationJob>,
}

impl AppState {
    // A assinatura retorna um Result: se a configuração falhar, a aplicação
    // não deve iniciar.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let mailer = build_mailer()?;

        // --- Monta o gráfico de dependências ---
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let sale_repo = SaleRepository::new(db_pool.clone());
        let installment_repo = InstallmentRepository::new(db_pool.clone());
        let lead_repo = LeadRepository::new(db_pool.clone());
        let notification_repo = NotificationRepository::new(db_pool.clone());

        let notification_service = NotificationService::new(notification_repo.clone(), mailer);
        let notifications = spawn_notification_worker(notification_service.clone());

        let sale_store = PgSaleStore::new(
            db_pool.clone(),
            sale_repo.clone(),
            product_repo.clone(),
            installment_repo.clone(),
            customer_repo.clone(),
        );
        let sale_service = SaleService::new(sale_store, notifications.clone());
        let sweep_service = SweepService::new(notification_repo, notification_service);

        Ok(Self {
            db_pool,
            customer_repo,
            product_repo,
            sale_repo,
            installment_repo,
            lead_repo,
            sale_service,
            sweep_service,
            notifications,
        })
    }
}

// Mesma precedência do sistema antigo: credenciais do Gmail primeiro,
// SMTP genérico depois; sem nada configurado, os envios são pulados.
fn build_mailer() -> anyhow::Result<Arc<dyn Mailer>> {
    let from_name =
        env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Beta Investimentos".to_string());

    if let (Ok(user), Ok(pass)) = (env::var("GMAIL_USER"), env::var("GMAIL_PASS")) {
        if !user.is_empty() && !pass.is_empty() {
            let mailer = SmtpMailer::new("smtp.gmail.com", None, &user, &pass, &from_name)?;
            tracing::info!("📧 E-mail configurado via Gmail ({user})");
            return Ok(Arc::new(mailer));
        }
    }

    if let Ok(host) = env::var("SMTP_HOST") {
        let port = env::var("SMTP_PORT").ok().and_then(|p| p.parse().ok());
        let user = env::var("SMTP_USER").unwrap_or_default();
        let pass = env::var("SMTP_PASS").unwrap_or_default();
        let mailer = SmtpMailer::new(&host, port, &user, &pass, &from_name)?;
        tracing::info!("📧 E-mail configurado via SMTP ({host})");
        return Ok(Arc::new(mailer));
    }

    tracing::warn!("E-mail não configurado: notificações serão puladas");
    Ok(Arc::new(DisabledMailer))
}
