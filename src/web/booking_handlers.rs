// src/web/booking_handlers.rs
use crate::{
    error::AppResult,
    models::booking::{Booking, BookingDetail, CreateBookingPayload, ListBookingsParams},
    services::booking_service,
    state::AppState,
    web::mw_auth::CurrentUser,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};

// GET /bookings?mine=true
pub async fn handle_list_bookings(
    State(state): State<AppState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    query: Result<Query<ListBookingsParams>, QueryRejection>,
) -> AppResult<Json<Vec<BookingDetail>>> {
    let Query(params) = query?;
    let mine_only = params
        .mine
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");
    Ok(Json(
        booking_service::list_bookings(&state.db_pool, &me, mine_only).await?,
    ))
}

// POST /bookings
pub async fn handle_create_booking(
    State(state): State<AppState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    body: Result<Json<CreateBookingPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let Json(payload) = body?;
    let request = booking_service::payload_to_new_booking(payload)?;
    let booking = booking_service::create_booking(&state.db_pool, &me, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// DELETE /bookings/{id}
pub async fn handle_delete_booking(
    State(state): State<AppState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = path?;
    booking_service::delete_booking(&state.db_pool, &state.config.cancel_any_roles, &me, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
