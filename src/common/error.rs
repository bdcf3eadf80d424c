// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0} não encontrado(a)")]
    NotFound(&'static str),

    #[error("Registro duplicado: {0}")]
    Conflict(String),

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    Database(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    Internal(#[from] anyhow::Error),
}

// Falha no envio de e-mail. Nunca atravessa um handler: é logada e a flag
// de idempotência fica como estava (elegível para reenvio futuro).
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Destinatário inválido: {0}")]
    InvalidRecipient(String),

    #[error("Falha ao montar a mensagem: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Falha no transporte SMTP: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::Validation(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::NotFound(entity) => {
                let body = Json(json!({ "error": format!("{} não encontrado(a).", entity) }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }
            AppError::Conflict(msg) => {
                let body = Json(json!({ "error": msg }));
                return (StatusCode::CONFLICT, body).into_response();
            }

            // Todos os outros erros (Database, Internal) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro interno do servidor: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl AppError {
    // Converte violação de chave única em um erro 409 mais amigável.
    pub fn from_unique_violation(e: sqlx::Error, message: &str) -> AppError {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::Conflict(message.to_string());
            }
        }
        AppError::Database(e)
    }
}
