// src/services/room_service.rs
use crate::{
    error::{AppError, AppResult},
    models::room::Room,
    validation::Validator,
};
use sqlx::SqlitePool;

fn validate(nome_sala: &str, capacidade: i64) -> AppResult<()> {
    let mut v = Validator::new();
    v.min_len("nome_sala", nome_sala, 1)
        .min_value("capacidade", capacidade, 1);
    v.finish()
}

fn not_found() -> AppError {
    AppError::NotFound("Sala não encontrada".to_string())
}

pub async fn list_rooms(db_pool: &SqlitePool) -> AppResult<Vec<Room>> {
    let rooms = sqlx::query_as::<_, Room>(
        "SELECT id_sala, nome_sala, capacidade FROM sala ORDER BY id_sala ASC",
    )
    .fetch_all(db_pool)
    .await?;
    tracing::debug!("Encontradas {} salas.", rooms.len());
    Ok(rooms)
}

pub async fn create_room(db_pool: &SqlitePool, nome_sala: &str, capacidade: i64) -> AppResult<Room> {
    let nome_sala = nome_sala.trim();
    validate(nome_sala, capacidade)?;

    let room = sqlx::query_as::<_, Room>(
        r#"
        INSERT INTO sala (nome_sala, capacidade) VALUES (?1, ?2)
        RETURNING id_sala, nome_sala, capacidade
        "#,
    )
    .bind(nome_sala)
    .bind(capacidade)
    .fetch_one(db_pool)
    .await?;

    tracing::info!("✅ Sala '{}' criada com id {}.", room.nome_sala, room.id_sala);
    Ok(room)
}

pub async fn update_room(
    db_pool: &SqlitePool,
    id_sala: i64,
    nome_sala: &str,
    capacidade: i64,
) -> AppResult<Room> {
    let nome_sala = nome_sala.trim();
    validate(nome_sala, capacidade)?;

    let room = sqlx::query_as::<_, Room>(
        r#"
        UPDATE sala SET nome_sala = ?1, capacidade = ?2
        WHERE id_sala = ?3
        RETURNING id_sala, nome_sala, capacidade
        "#,
    )
    .bind(nome_sala)
    .bind(capacidade)
    .bind(id_sala)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| {
        tracing::warn!("Falha ao atualizar: sala {} não encontrada.", id_sala);
        not_found()
    })?;

    tracing::info!("✅ Sala {} atualizada.", id_sala);
    Ok(room)
}

/// Remove a sala; as reservas associadas caem em cascata.
pub async fn delete_room(db_pool: &SqlitePool, id_sala: i64) -> AppResult<()> {
    let rows_affected = sqlx::query("DELETE FROM sala WHERE id_sala = ?1")
        .bind(id_sala)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Falha ao remover: sala {} não encontrada.", id_sala);
        return Err(not_found());
    }
    tracing::info!("Sala {} removida.", id_sala);
    Ok(())
}
