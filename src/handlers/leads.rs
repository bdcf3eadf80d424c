// src/handlers/leads.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{lead::Lead, notification::NotificationJob},
    services::notification_service,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLeadPayload {
    pub external_id: Option<String>,

    pub name: Option<String>,

    #[validate(email(message = "E-mail inválido."))]
    pub email: String,

    pub picture_url: Option<String>,

    pub phone: Option<String>,
}

/// Upsert pela chave de e-mail; sempre devolve o lead resultante. O e-mail de
/// boas-vindas é enfileirado sem flag: se o envio não estiver configurado, o
/// worker apenas o descarta.
pub async fn upsert_lead(
    State(app_state): State<AppState>,
    Json(payload): Json<UpsertLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lead = app_state
        .lead_repo
        .upsert(
            payload.external_id.as_deref(),
            payload.name.as_deref(),
            &payload.email,
            payload.picture_url.as_deref(),
            payload.phone.as_deref(),
        )
        .await?;

    notification_service::enqueue(&app_state.notifications, welcome_job(&lead));

    Ok((StatusCode::OK, Json(lead)))
}

pub async fn list_leads(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let leads = app_state.lead_repo.list().await?;

    Ok((StatusCode::OK, Json(leads)))
}

fn welcome_job(lead: &Lead) -> NotificationJob {
    let greeting = lead.name.as_deref().unwrap_or("visitante");

    NotificationJob {
        target: None,
        recipient: lead.email.clone(),
        subject: "Bem-vindo(a)!".to_string(),
        html_body: format!(
            "<h2>Olá, {greeting}!</h2>\
             <p>Obrigado pelo seu interesse. Em breve entraremos em contato.</p>",
        ),
    }
}
