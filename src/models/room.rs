// src/models/room.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Room {
    pub id_sala: i64,
    pub nome_sala: String,
    pub capacidade: i64,
}

// Corpo de POST /rooms e PUT /rooms/{id}
#[derive(Debug, Default, Deserialize)]
pub struct RoomPayload {
    #[serde(default)]
    pub nome_sala: String,
    #[serde(default)]
    pub capacidade: i64,
}
