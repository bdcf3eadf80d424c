// src/handlers/customers.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{common::error::AppError, config::AppState};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(email(message = "E-mail inválido."))]
    pub email: String,

    pub phone: Option<String>,
}

pub async fn create_customer(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let customer = app_state
        .customer_repo
        .create(&payload.name, &payload.email, payload.phone.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn list_customers(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let customers = app_state.customer_repo.list().await?;

    Ok((StatusCode::OK, Json(customers)))
}
