// src/handlers/products.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{common::error::AppError, config::AppState, handlers::validate_not_negative};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(custom(function = validate_not_negative))]
    pub unit_price: Decimal,

    #[serde(default)]
    pub stock_quantity: i32,
}

pub async fn create_product(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let product = app_state
        .product_repo
        .create(&payload.name, payload.unit_price, payload.stock_quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state.product_repo.list().await?;

    Ok((StatusCode::OK, Json(products)))
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockPayload {
    // Positivo repõe, negativo baixa. Sem piso em zero.
    pub delta: i32,
}

pub async fn adjust_stock(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<impl IntoResponse, AppError> {
    let rows_affected = app_state
        .product_repo
        .adjust_stock(&app_state.db_pool, id, payload.delta)
        .await?;

    // Produto inexistente não é erro distinto: rowsAffected = 0.
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "rowsAffected": rows_affected })),
    ))
}
