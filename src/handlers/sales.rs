// src/handlers/sales.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::validate_not_negative,
    models::sale::PaymentMethod,
    services::sale_service::{NewInstallmentPlan, NewSaleItem},
};

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemPayload {
    #[validate(required(message = "O campo 'productId' é obrigatório."))]
    pub product_id: Option<i64>,

    #[validate(
        required(message = "O campo 'quantity' é obrigatório."),
        range(min = 1, message = "A quantidade deve ser maior que zero.")
    )]
    pub quantity: Option<i32>,

    #[validate(
        required(message = "O campo 'unitPrice' é obrigatório."),
        custom(function = validate_not_negative)
    )]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentPlanPayload {
    #[validate(range(min = 1, message = "O carnê precisa de ao menos uma parcela."))]
    pub count: i32,

    #[validate(custom(function = validate_not_negative))]
    pub installment_amount: Decimal,

    pub first_due_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalePayload {
    pub customer_id: Option<i64>,

    // `default` deixa o corpo sem 'items' cair na validação (400) em vez de
    // morrer na desserialização.
    #[serde(default)]
    #[validate(
        length(min = 1, message = "A venda precisa de ao menos um item."),
        nested
    )]
    pub items: Vec<SaleItemPayload>,

    pub due_date: Option<NaiveDate>,

    // Ausente = dinheiro, como no sistema antigo.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,

    pub purchase_date: Option<NaiveDate>,

    #[validate(nested)]
    pub installment_plan: Option<InstallmentPlanPayload>,
}

pub async fn create_sale(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateSalePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // Os unwrap são seguros: `required` acabou de validar os três campos.
    let items: Vec<NewSaleItem> = payload
        .items
        .iter()
        .map(|item| NewSaleItem {
            product_id: item.product_id.unwrap(),
            quantity: item.quantity.unwrap(),
            unit_price: item.unit_price.unwrap(),
        })
        .collect();

    let plan = payload.installment_plan.as_ref().map(|p| NewInstallmentPlan {
        count: p.count,
        installment_amount: p.installment_amount,
        first_due_date: p.first_due_date,
    });

    let created = app_state
        .sale_service
        .create_sale(
            payload.customer_id,
            &items,
            payload.due_date,
            payload.payment_method.unwrap_or(PaymentMethod::Cash),
            payload.purchase_date,
            plan.as_ref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_sales(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let sales = app_state.sale_repo.list().await?;

    Ok((StatusCode::OK, Json(sales)))
}

pub async fn list_sale_items(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let items = app_state.sale_repo.list_items(id).await?;

    Ok((StatusCode::OK, Json(items)))
}

pub async fn delete_sale(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = app_state.sale_repo.delete(id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Venda"));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_items_fail_validation() {
        let payload: CreateSalePayload = serde_json::from_str(r#"{ "items": [] }"#).unwrap();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn missing_items_field_fails_validation_not_deserialization() {
        let payload: CreateSalePayload =
            serde_json::from_str(r#"{ "paymentMethod": "pix" }"#).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn well_formed_sale_passes() {
        let payload: CreateSalePayload = serde_json::from_str(
            r#"{
                "customerId": 4,
                "items": [{ "productId": 1, "quantity": 2, "unitPrice": 10.0 }],
                "paymentMethod": "dinheiro"
            }"#,
        )
        .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.payment_method, Some(PaymentMethod::Cash));
    }

    #[test]
    fn negative_unit_price_is_rejected() {
        let payload: CreateSalePayload = serde_json::from_str(
            r#"{ "items": [{ "productId": 1, "quantity": 1, "unitPrice": -5.0 }] }"#,
        )
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let payload: CreateSalePayload = serde_json::from_str(
            r#"{ "items": [{ "productId": 1, "quantity": 0, "unitPrice": 5.0 }] }"#,
        )
        .unwrap();
        assert!(payload.validate().is_err());
    }
}
