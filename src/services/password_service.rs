// src/services/password_service.rs
use crate::error::{AppError, AppResult};
use sha2::{Digest, Sha256};

/// Custo bcrypt usado em todos os hashes novos (mínimo aceitável: 10).
pub const BCRYPT_COST: u32 = 10;

/// Prefixos de hash bcrypt reconhecidos.
const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Só valores com prefixo bcrypt podem ser usados para autenticar.
pub fn is_recognized_hash(stored: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p))
}

/// Gera um hash bcrypt para uma senha (fora da thread do pedido).
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Gerando hash bcrypt...");
        bcrypt::hash(&password, BCRYPT_COST)
    })
    .await
    .map_err(|e| {
        tracing::error!("Erro na task spawn_blocking (hash_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("Erro bcrypt ao gerar hash: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Verifica se a senha fornecida corresponde ao valor guardado.
///
/// Valores sem prefixo bcrypt são legado (texto simples ou digest SHA-256):
/// só o digest é aceite, e o caminho fica sempre registado como violação
/// de higiene dos dados.
pub async fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    if !is_recognized_hash(stored) {
        tracing::warn!(
            violation = "LEGACY_PASSWORD_FORMAT",
            "Senha guardada sem hash bcrypt; a comparar com digest legado. Normalize os dados."
        );
        return Ok(legacy_digest(password) == stored.to_ascii_lowercase());
    }

    let password = password.to_string();
    let stored = stored.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Verificando hash bcrypt...");
        bcrypt::verify(&password, &stored)
    })
    .await
    .map_err(|e| {
        tracing::error!("Erro na task spawn_blocking (verify_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("Erro bcrypt ao verificar senha: {:?}", e);
        AppError::PasswordHashingError
    })
}

fn legacy_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
