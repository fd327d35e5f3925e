// src/main.rs

// --- Declaração dos Módulos ---
mod config;
mod db;
mod error;
mod models;
mod services;
mod state;
mod validation;
mod web;

// --- Imports ---
use crate::{config::Config, services::user_service, state::AppState};
use axum::serve;
use std::env;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuração do Logging (Tracing) ---
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "reserva_salas=debug,tower_http=info,sqlx=warn".into()
        }))
        .with(fmt::layer())
        .init();

    let config = Config::from_env()?;

    // --- Configuração da Base de Dados ---
    let db_pool = match db::create_db_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Falha crítica ao inicializar a base de dados: {}", e);
            return Err(anyhow::anyhow!("Falha ao conectar/migrar DB: {}", e));
        }
    };

    // Comando de operador: reset-admin <email> <nova-senha>
    let args: Vec<String> = env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("reset-admin") {
        let result = run_reset_admin(&db_pool, &args[1..]).await;
        db_pool.close().await;
        return result;
    }

    tracing::info!("🚀 Iniciando servidor de reservas de salas...");
    if config.auth_secret.is_none() {
        tracing::warn!("⚠️ AUTH_SECRET não definida: login e rotas protegidas vão falhar.");
    }

    // --- Criação do Estado da Aplicação ---
    let mailer = services::mailer::from_config(&config.smtp);
    let addr = format!("{}:{}", config.host, config.port);
    let app_state = AppState::new(db_pool.clone(), config, mailer);

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("❌ Falha ao iniciar listener em {}: {}", addr, e);
            return Err(e.into());
        }
    };

    // --- Criação do Router e Aplicação das Camadas (Middlewares) ---
    let app = web::routes::create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    // --- Início do Servidor ---
    tracing::info!("📡 Servidor escutando em http://{}", addr);
    if let Err(e) = serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("❌ Erro fatal no servidor: {}", e);
        db_pool.close().await;
        return Err(e.into());
    }

    db_pool.close().await;
    tracing::info!("Servidor parado; pool da base de dados fechado.");
    Ok(())
}

async fn run_reset_admin(db_pool: &sqlx::SqlitePool, args: &[String]) -> anyhow::Result<()> {
    let [email, password] = args else {
        anyhow::bail!("uso: reset-admin <email> <nova-senha>");
    };
    let user = user_service::reset_password_by_email(db_pool, email, password).await?;
    tracing::info!("Senha redefinida para {} ({}).", user.email, user.tipo);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Falha ao instalar handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Falha ao instalar handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Sinal de encerramento recebido");
}
