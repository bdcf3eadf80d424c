// src/handlers/installments.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{common::error::AppError, config::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstallmentsQuery {
    pub sale_id: Option<i64>,
}

/// Sem `saleId`, devolve o carnê de todas as vendas, ordenado por vencimento.
pub async fn list_installments(
    State(app_state): State<AppState>,
    Query(query): Query<ListInstallmentsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let installments = app_state.installment_repo.list(query.sale_id).await?;

    Ok((StatusCode::OK, Json(installments)))
}

pub async fn pay_installment(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let installment = app_state
        .installment_repo
        .mark_paid(id)
        .await?
        .ok_or(AppError::NotFound("Parcela"))?;

    Ok((StatusCode::OK, Json(installment)))
}
