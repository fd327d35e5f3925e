// src/state.rs
use crate::{
    config::Config,
    services::{mailer::Mailer, token_service::TokenService},
};
use sqlx::SqlitePool;
use std::sync::Arc;

// Estado partilhado por todos os pedidos: o pool é o único recurso com vida
// própria (criado no arranque, fechado no encerramento).
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db_pool,
            tokens: TokenService::from_config(&config),
            mailer,
            config: Arc::new(config),
        }
    }
}

// Permite extrair o pool da DB diretamente
impl axum::extract::FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> SqlitePool {
        state.db_pool.clone()
    }
}
