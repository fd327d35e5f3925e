// src/web/admin_handlers.rs
use crate::{
    error::AppResult,
    models::user::{CreateUserRequest, UpdateUserRequest, UserProfile},
    services::user_service,
    state::AppState,
};
use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    http::StatusCode,
    Json,
};

// GET /users
pub async fn handle_list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserProfile>>> {
    Ok(Json(user_service::list_users(&state.db_pool).await?))
}

// POST /users
pub async fn handle_create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let Json(req) = body?;
    let user = user_service::create_user(&state.db_pool, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// PUT /users/{id}
pub async fn handle_update_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Json<UserProfile>> {
    let Path(id) = path?;
    let Json(req) = body?;
    Ok(Json(user_service::update_user(&state.db_pool, id, req).await?))
}

// DELETE /users/{id}
pub async fn handle_delete_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = path?;
    user_service::delete_user(&state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
