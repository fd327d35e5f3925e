// src/config.rs
use crate::{
    error::{AppError, AppResult},
    models::user::Tipo,
};
use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://reservas.db";
pub const DEFAULT_APP_URL: &str = "http://localhost:5173";

/// Configuração SMTP para o envio do e-mail de reset.
#[derive(Clone, Default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        self.host.is_some() && self.sender().is_some()
    }

    /// Remetente: SMTP_FROM ou, na falta dele, o utilizador SMTP.
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.username.as_deref())
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub auth_secret: Option<String>,
    pub reset_secret: Option<String>,
    /// Base do link de reset quando o pedido não indica a origem.
    pub app_url: Option<String>,
    /// Papéis que podem cancelar reservas de outros utilizadores.
    pub cancel_any_roles: Vec<Tipo>,
    pub smtp: SmtpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: "0.0.0.0".to_string(),
            port: 4000,
            auth_secret: None,
            reset_secret: None,
            app_url: None,
            cancel_any_roles: vec![Tipo::Admin],
            smtp: SmtpConfig {
                port: 465,
                ..SmtpConfig::default()
            },
        }
    }
}

impl Config {
    /// Lê a configuração das variáveis de ambiente (o `.env` já deve estar carregado).
    pub fn from_env() -> AppResult<Self> {
        let defaults = Config::default();

        let port = match non_empty_var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::Configuration(format!("PORT inválida: '{}'", raw)))?,
            None => defaults.port,
        };

        let smtp_port = match non_empty_var("SMTP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::Configuration(format!("SMTP_PORT inválida: '{}'", raw)))?,
            None => defaults.smtp.port,
        };

        let cancel_any_roles = match non_empty_var("BOOKING_CANCEL_ANY_ROLES") {
            Some(raw) => parse_roles(&raw)?,
            None => defaults.cancel_any_roles,
        };

        Ok(Config {
            database_url: non_empty_var("DATABASE_URL").unwrap_or(defaults.database_url),
            host: non_empty_var("HOST").unwrap_or(defaults.host),
            port,
            auth_secret: non_empty_var("AUTH_SECRET").or_else(|| non_empty_var("JWT_SECRET")),
            reset_secret: non_empty_var("RESET_SECRET")
                .or_else(|| non_empty_var("JWT_RESET_SECRET")),
            app_url: non_empty_var("APP_URL"),
            cancel_any_roles,
            smtp: SmtpConfig {
                host: non_empty_var("SMTP_HOST"),
                port: smtp_port,
                username: non_empty_var("SMTP_USER"),
                password: non_empty_var("SMTP_PASS"),
                from: non_empty_var("SMTP_FROM"),
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// "admin,coordenador" -> [Admin, Coordenador]
pub fn parse_roles(raw: &str) -> AppResult<Vec<Tipo>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Tipo>()
                .map_err(|e| AppError::Configuration(format!("BOOKING_CANCEL_ANY_ROLES: {}", e)))
        })
        .collect()
}
