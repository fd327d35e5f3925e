// src/web/mw_auth.rs
use crate::{
    error::AppError,
    models::user::UserProfile,
    services::token_service::TokenPurpose,
    state::AppState,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Identidade do chamador, posta nas extensões por `require_auth`.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub UserProfile);

/// Extrai o token de `Authorization: Bearer <token>` (esquema sem distinção de maiúsculas).
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

// Middleware que verifica o token de sessão
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(request.headers()) else {
        tracing::debug!("Autenticação MW: pedido sem bearer token.");
        return Err(AppError::Unauthorized("Token ausente".to_string()));
    };

    let claims = state.tokens.verify(token, TokenPurpose::Auth).map_err(|e| {
        tracing::debug!("Autenticação MW: token recusado: {:?}", e);
        AppError::from(e)
    })?;
    let profile = claims.into_profile()?;

    tracing::debug!("Autenticação MW: utilizador {} autenticado.", profile.id);
    request.extensions_mut().insert(CurrentUser(profile));
    Ok(next.run(request).await)
}
