// src/services/token_service.rs
use crate::{
    config::Config,
    error::AppError,
    models::user::{Tipo, UserProfile},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SESSION_TTL_SECONDS: i64 = 8 * 60 * 60;
pub const RESET_TTL_SECONDS: i64 = 30 * 60;

/// Finalidade do token (claim `typ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Auth,
    Reset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Auth => "auth",
            TokenPurpose::Reset => "reset",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("segredo de assinatura não configurado: {0}")]
    MissingSecret(&'static str),

    #[error("token inválido: {0}")]
    InvalidToken(String),

    #[error("finalidade do token não corresponde")]
    WrongPurpose,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret(name) => {
                AppError::Configuration(format!("{} não configurado", name))
            }
            TokenError::InvalidToken(_) => AppError::Unauthorized("Invalid token".to_string()),
            TokenError::WrongPurpose => AppError::Unauthorized("Invalid token type".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Id do utilizador
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo: Option<Tipo>,
    #[serde(default)]
    pub typ: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Id numérico e positivo do sujeito, se existir.
    pub fn subject_id(&self) -> Option<i64> {
        self.sub.trim().parse::<i64>().ok().filter(|id| *id > 0)
    }

    /// Identidade desnormalizada de um token de sessão.
    pub fn into_profile(self) -> Result<UserProfile, TokenError> {
        let id = self.subject_id();
        match (id, self.email, self.nome, self.tipo) {
            (Some(id), Some(email), Some(nome), Some(tipo)) => Ok(UserProfile { id, email, nome, tipo }),
            _ => Err(TokenError::InvalidToken("payload incompleto".to_string())),
        }
    }
}

/// Emite e verifica tokens assinados (HS256). Sessão e reset usam segredos
/// distintos quando RESET_SECRET está definido.
#[derive(Clone)]
pub struct TokenService {
    auth_secret: Option<String>,
    reset_secret: Option<String>,
}

impl TokenService {
    pub fn new(auth_secret: Option<String>, reset_secret: Option<String>) -> Self {
        Self {
            auth_secret,
            reset_secret,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.auth_secret.clone(), config.reset_secret.clone())
    }

    fn secret_for(&self, purpose: TokenPurpose) -> Result<&str, TokenError> {
        match purpose {
            TokenPurpose::Auth => self
                .auth_secret
                .as_deref()
                .ok_or(TokenError::MissingSecret("AUTH_SECRET")),
            TokenPurpose::Reset => self
                .reset_secret
                .as_deref()
                .or(self.auth_secret.as_deref())
                .ok_or(TokenError::MissingSecret("RESET_SECRET")),
        }
    }

    pub fn issue_session_token(&self, user: &UserProfile) -> Result<String, TokenError> {
        let claims = claims_for(
            user.id,
            TokenPurpose::Auth,
            SESSION_TTL_SECONDS,
            Some(user),
        );
        self.sign(&claims, TokenPurpose::Auth)
    }

    pub fn issue_reset_token(&self, user_id: i64) -> Result<String, TokenError> {
        let claims = claims_for(user_id, TokenPurpose::Reset, RESET_TTL_SECONDS, None);
        self.sign(&claims, TokenPurpose::Reset)
    }

    fn sign(&self, claims: &Claims, purpose: TokenPurpose) -> Result<String, TokenError> {
        let secret = self.secret_for(purpose)?;
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| TokenError::InvalidToken(e.to_string()))
    }

    /// Valida assinatura e expiração, e exige a finalidade esperada.
    /// Um token de reset nunca abre rotas de sessão, e vice-versa.
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<Claims, TokenError> {
        let secret = self.secret_for(expected)?;

        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| TokenError::InvalidToken(e.to_string()))?;

        if data.claims.typ.as_deref() != Some(expected.as_str()) {
            tracing::warn!(
                "Token com finalidade {:?} usado onde se esperava '{}'",
                data.claims.typ,
                expected.as_str()
            );
            return Err(TokenError::WrongPurpose);
        }

        Ok(data.claims)
    }
}

fn claims_for(
    user_id: i64,
    purpose: TokenPurpose,
    ttl_seconds: i64,
    identity: Option<&UserProfile>,
) -> Claims {
    let now = Utc::now();
    Claims {
        sub: user_id.to_string(),
        email: identity.map(|u| u.email.clone()),
        nome: identity.map(|u| u.nome.clone()),
        tipo: identity.map(|u| u.tipo),
        typ: Some(purpose.as_str().to_string()),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
    }
}
