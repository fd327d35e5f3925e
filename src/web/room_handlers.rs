// src/web/room_handlers.rs
use crate::{
    error::AppResult,
    models::room::{Room, RoomPayload},
    services::room_service,
    state::AppState,
};
use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    http::StatusCode,
    Json,
};

// GET /rooms
pub async fn handle_list_rooms(State(state): State<AppState>) -> AppResult<Json<Vec<Room>>> {
    Ok(Json(room_service::list_rooms(&state.db_pool).await?))
}

// POST /rooms
pub async fn handle_create_room(
    State(state): State<AppState>,
    body: Result<Json<RoomPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let Json(payload) = body?;
    let room = room_service::create_room(&state.db_pool, &payload.nome_sala, payload.capacidade).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

// PUT /rooms/{id}
pub async fn handle_update_room(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<RoomPayload>, JsonRejection>,
) -> AppResult<Json<Room>> {
    let Path(id) = path?;
    let Json(payload) = body?;
    let room =
        room_service::update_room(&state.db_pool, id, &payload.nome_sala, payload.capacidade).await?;
    Ok(Json(room))
}

// DELETE /rooms/{id}
pub async fn handle_delete_room(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = path?;
    room_service::delete_room(&state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
