// src/error.rs
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro na base de dados: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Erro de migração da base de dados: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Erro ao processar password")]
    PasswordHashingError,

    // Entrada malformada ou em falta
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("Data/hora inválida: {0}")]
    InvalidTimestamp(String),

    #[error("fim deve ser após inicio")]
    InvalidRange,

    // Mensagem genérica: não distingue utilizador inexistente de senha errada
    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Não autenticado: {0}")]
    Unauthorized(String),

    #[error("Sem permissão")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Token inválido ou expirado")]
    InvalidResetToken,

    #[error("Erro de configuração: {0}")]
    Configuration(String),

    #[error("Nenhuma combinação de identificador/coluna funcionou")]
    SchemaMismatch,

    #[error("Erro interno inesperado")]
    InternalServerError,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::InvalidTimestamp(_)
            | AppError::InvalidRange
            | AppError::InvalidResetToken => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::SchemaMismatch => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::SqlxError(_)
            | AppError::SqlxMigrateError(_)
            | AppError::PasswordHashingError
            | AppError::Configuration(_)
            | AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation {
            message: "Invalid body".to_string(),
            details: Some(json!({ "formErrors": [rejection.body_text()] })),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation {
            message: "Invalid params".to_string(),
            details: Some(json!({ "formErrors": [rejection.body_text()] })),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation {
            message: "Invalid query".to_string(),
            details: Some(json!({ "formErrors": [rejection.body_text()] })),
        }
    }
}

// Como converter AppError numa resposta HTTP (JSON)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Erros do servidor: contexto completo no log, mensagem genérica para o cliente
        let (message, details) = match self {
            AppError::SqlxError(_) | AppError::SqlxMigrateError(_) => {
                tracing::error!("Erro processado: {:?}", self);
                ("Erro ao aceder aos dados.".to_string(), None)
            }
            AppError::Configuration(_) => {
                tracing::error!("Erro processado: {:?}", self);
                ("Erro de configuração do servidor.".to_string(), None)
            }
            AppError::PasswordHashingError => {
                tracing::error!("Erro processado: {:?}", self);
                ("Erro ao processar credenciais.".to_string(), None)
            }
            AppError::InternalServerError => {
                tracing::error!("Erro processado: {:?}", self);
                ("Ocorreu um erro inesperado.".to_string(), None)
            }
            AppError::SchemaMismatch => {
                tracing::warn!("Erro processado: {:?}", self);
                ("Usuário não encontrado".to_string(), None)
            }
            AppError::Validation { message, details } => {
                tracing::debug!("Pedido inválido: {}", message);
                (message, details)
            }
            other => {
                tracing::debug!("Pedido rejeitado ({}): {}", status, other);
                (other.to_string(), None)
            }
        };

        let body = match details {
            Some(details) => json!({ "error": message, "details": details }),
            None => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

// Tipo Result padrão para a aplicação
pub type AppResult<T = ()> = Result<T, AppError>;
