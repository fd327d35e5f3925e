// src/web/auth_handlers.rs
use crate::{
    error::AppResult,
    models::{
        auth::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
            OkResponse, RegisterRequest, RequestOrigin, ResetPasswordRequest,
        },
        user::UserProfile,
    },
    services::auth_service,
    state::AppState,
    web::mw_auth::CurrentUser,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};

fn header_value(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    RequestOrigin {
        origin: header_value(headers, header::ORIGIN),
        forwarded_proto: header_value(headers, "x-forwarded-proto"),
        forwarded_host: header_value(headers, "x-forwarded-host"),
        host: header_value(headers, header::HOST),
    }
}

// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let Json(req) = body?;
    let profile = auth_service::register(&state, req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(req) = body?;
    Ok(Json(auth_service::login(&state, req).await?))
}

// GET /auth/me
pub async fn handle_me(Extension(CurrentUser(me)): Extension<CurrentUser>) -> Json<UserProfile> {
    Json(me)
}

// POST /auth/change-password
pub async fn handle_change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AppResult<Json<OkResponse>> {
    let Json(req) = body?;
    auth_service::change_password(&state, &me, req).await?;
    Ok(Json(OkResponse::ok()))
}

// POST /auth/forgot
pub async fn handle_forgot(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> AppResult<Json<OkResponse>> {
    let Json(req) = body?;
    auth_service::forgot_password(&state, req, &request_origin(&headers)).await?;
    Ok(Json(OkResponse::ok()))
}

// POST /auth/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    body: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> AppResult<Json<OkResponse>> {
    let Json(req) = body?;
    auth_service::reset_password(&state, req).await?;
    Ok(Json(OkResponse::ok()))
}
