//src/main.rs

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod handlers;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    // Inicializa o logger.
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // O agendador precisa ficar vivo durante todo o processo.
    let _scheduler = start_reminder_scheduler(&app_state)
        .await
        .expect("Falha ao iniciar o agendador de lembretes.");

    // Combina tudo no router principal
    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/customers",
            post(handlers::customers::create_customer).get(handlers::customers::list_customers),
        )
        .route(
            "/products",
            post(handlers::products::create_product).get(handlers::products::list_products),
        )
        .route("/products/{id}/stock", post(handlers::products::adjust_stock))
        .route(
            "/sales",
            post(handlers::sales::create_sale).get(handlers::sales::list_sales),
        )
        .route("/sales/{id}", delete(handlers::sales::delete_sale))
        .route("/sales/{id}/items", get(handlers::sales::list_sale_items))
        .route(
            "/installments",
            get(handlers::installments::list_installments),
        )
        .route(
            "/installments/{id}/pay",
            post(handlers::installments::pay_installment),
        )
        .route(
            "/leads",
            post(handlers::leads::upsert_lead).get(handlers::leads::list_leads),
        )
        .route("/reports/summary", get(handlers::reports::sales_summary))
        .with_state(app_state);

    // Inicia o servidor
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}

// Agenda a varredura diária de lembretes. Por padrão roda às 08:00 locais;
// REMINDER_CRON aceita uma expressão cron (com campo de segundos).
async fn start_reminder_scheduler(app_state: &AppState) -> anyhow::Result<JobScheduler> {
    let cron = std::env::var("REMINDER_CRON").unwrap_or_else(|_| "0 0 8 * * *".to_string());

    let mut scheduler = JobScheduler::new().await?;

    let sweep = app_state.sweep_service.clone();
    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let sweep = sweep.clone();
        Box::pin(async move {
            let report = sweep.run().await;
            tracing::info!(
                "Varredura diária concluída: {}",
                serde_json::to_string(&report).unwrap_or_default()
            );
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!("⏰ Varredura de lembretes agendada ({cron})");
    Ok(scheduler)
}
