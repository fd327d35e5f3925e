// src/web/mw_admin.rs
use crate::{
    error::AppError,
    models::user::{Tipo, ROOM_MANAGER_ROLES},
    web::mw_auth::CurrentUser,
};
use axum::{extract::Request, middleware::Next, response::Response, Extension};

fn check_roles(user: &CurrentUser, allowed: &[Tipo]) -> Result<(), AppError> {
    if allowed.contains(&user.0.tipo) {
        Ok(())
    } else {
        tracing::warn!(
            "Acesso negado para {} (papel {}, exige {:?}).",
            user.0.id,
            user.0.tipo,
            allowed
        );
        Err(AppError::Forbidden)
    }
}

/// Exige papel admin. Deve correr *depois* de `require_auth`.
pub async fn require_admin(
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_roles(&user, &[Tipo::Admin])?;
    Ok(next.run(request).await)
}

/// Gestão de salas: admin ou coordenador.
pub async fn require_room_manager(
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_roles(&user, ROOM_MANAGER_ROLES)?;
    Ok(next.run(request).await)
}
