// src/services/credential_store.rs
//! Acesso aos registos de utilizador tolerante a desvios de esquema.
//!
//! Bases antigas expõem o identificador como `id_usuario` ou `id`, e a senha
//! em `senha_hash`, `senha` ou `password`. Este módulo é uma camada de
//! compatibilidade: as migrações criam o esquema canónico
//! (`id_usuario` + `senha_hash`) e, quando todas as bases estiverem
//! normalizadas, a matriz de tentativas pode desaparecer.

use crate::{
    error::{AppError, AppResult},
    models::user::{Tipo, User},
};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

/// Ordem de prioridade dos campos identificadores.
pub const ID_FIELDS: [&str; 2] = ["id_usuario", "id"];
/// Ordem de prioridade das colunas de senha.
pub const PASSWORD_COLUMNS: [&str; 3] = ["senha_hash", "senha", "password"];

/// Combinação identificador/coluna que aceitou a atualização.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordUpdate {
    pub matched_field: &'static str,
    pub matched_column: &'static str,
}

// Só "no such column"/"no such table" (SQLITE_ERROR) indicam que a combinação
// não existe neste esquema; restrições, triggers, ocupado e disco propagam.
fn is_schema_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            db_err.code().as_deref() == Some("1")
                && (message.starts_with("no such column") || message.starts_with("no such table"))
        }
        _ => false,
    }
}

fn user_from_row(row: &SqliteRow) -> AppResult<User> {
    let id = ID_FIELDS
        .iter()
        .find_map(|field| row.try_get::<i64, _>(*field).ok())
        .ok_or_else(|| AppError::Configuration("tabela usuario sem identificador".to_string()))?;

    let senha = PASSWORD_COLUMNS
        .iter()
        .find_map(|col| row.try_get::<Option<String>, _>(*col).ok().flatten());

    let tipo_raw: String = row.try_get("tipo")?;
    let tipo = tipo_raw.parse::<Tipo>().map_err(|e| {
        tracing::error!("Utilizador {} com tipo inválido na base: {}", id, e);
        AppError::Configuration(e)
    })?;

    Ok(User {
        id,
        nome: row.try_get("nome")?,
        email: row.try_get("email")?,
        tipo,
        senha,
    })
}

pub async fn find_user_by_email(conn: &mut SqliteConnection, email: &str) -> AppResult<Option<User>> {
    tracing::debug!("Buscando utilizador por email: {}", email);
    let row = sqlx::query("SELECT * FROM usuario WHERE email = ?1")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Tenta cada campo identificador pela ordem de prioridade.
pub async fn find_user_by_id(conn: &mut SqliteConnection, user_id: i64) -> AppResult<Option<User>> {
    for field in ID_FIELDS {
        let sql = format!("SELECT * FROM usuario WHERE {} = ?1", field);
        match sqlx::query(&sql).bind(user_id).fetch_optional(&mut *conn).await {
            Ok(Some(row)) => {
                tracing::debug!("Utilizador {} encontrado via '{}'.", user_id, field);
                return user_from_row(&row).map(Some);
            }
            Ok(None) => continue,
            Err(e) if is_schema_error(&e) => {
                tracing::debug!("Campo '{}' indisponível: {}", field, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
    tracing::debug!("Utilizador {} não encontrado.", user_id);
    Ok(None)
}

/// Grava o hash tentando identificador × coluna pela ordem fixa; a primeira
/// que atualizar exatamente uma linha vence.
pub async fn update_password(
    conn: &mut SqliteConnection,
    user_id: i64,
    hash: &str,
) -> AppResult<PasswordUpdate> {
    for field in ID_FIELDS {
        for column in PASSWORD_COLUMNS {
            let sql = format!("UPDATE usuario SET {} = ?1 WHERE {} = ?2", column, field);
            match sqlx::query(&sql).bind(hash).bind(user_id).execute(&mut *conn).await {
                Ok(result) if result.rows_affected() == 1 => {
                    return Ok(PasswordUpdate {
                        matched_field: field,
                        matched_column: column,
                    });
                }
                Ok(_) => continue,
                Err(e) if is_schema_error(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
    tracing::warn!("Nenhuma combinação identificador/coluna atualizou o utilizador {}", user_id);
    Err(AppError::SchemaMismatch)
}

/// Atualiza nome (se dado) e papel pelo primeiro identificador que casar
/// exatamente uma linha.
pub async fn update_profile(
    conn: &mut SqliteConnection,
    user_id: i64,
    nome: Option<&str>,
    tipo: Tipo,
) -> AppResult<&'static str> {
    for field in ID_FIELDS {
        let sql = format!(
            "UPDATE usuario SET nome = COALESCE(?1, nome), tipo = ?2 WHERE {} = ?3",
            field
        );
        let result = sqlx::query(&sql)
            .bind(nome)
            .bind(tipo.as_str())
            .bind(user_id)
            .execute(&mut *conn)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => return Ok(field),
            Ok(_) => continue,
            Err(e) if is_schema_error(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    tracing::warn!("Nenhum identificador atualizou o perfil do utilizador {}", user_id);
    Err(AppError::SchemaMismatch)
}

/// Insere um utilizador na primeira coluna de senha que existir. Devolve o id.
pub async fn create_user(
    conn: &mut SqliteConnection,
    nome: &str,
    email: &str,
    hash: &str,
    tipo: Tipo,
) -> AppResult<i64> {
    for column in PASSWORD_COLUMNS {
        let sql = format!(
            "INSERT INTO usuario (nome, email, {}, tipo) VALUES (?1, ?2, ?3, ?4)",
            column
        );
        let result = sqlx::query(&sql)
            .bind(nome)
            .bind(email)
            .bind(hash)
            .bind(tipo.as_str())
            .execute(&mut *conn)
            .await;

        match result {
            Ok(done) => return Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::warn!("Falha ao criar utilizador: e-mail '{}' já existe.", email);
                return Err(AppError::Conflict("E-mail já cadastrado.".to_string()));
            }
            Err(e) if is_schema_error(&e) => {
                tracing::debug!("Coluna de senha '{}' indisponível: {}", column, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Configuration(
        "tabela usuario sem coluna de senha conhecida".to_string(),
    ))
}
