// src/services/auth_service.rs
//! Fluxos de autenticação: registo, login, troca de senha e recuperação.

use crate::{
    config::DEFAULT_APP_URL,
    error::{AppError, AppResult},
    models::{
        auth::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
            RegisterRequest, RequestOrigin, ResetPasswordRequest,
        },
        user::{Tipo, User, UserProfile, SELF_SERVICE_ROLES},
    },
    services::{
        credential_store, password_service,
        token_service::{TokenError, TokenPurpose},
    },
    state::AppState,
    validation::Validator,
};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Devolve o hash guardado se estiver num formato confiável.
/// Campo em falta ou valor sem hash é problema de dados do servidor, não de login.
fn trusted_hash<'a>(user: &'a User, flow: &str) -> AppResult<&'a str> {
    let stored = match user.senha.as_deref() {
        Some(s) if !s.is_empty() => s,
        _ => {
            tracing::warn!(flow, user_id = user.id, "NO_PASSWORD_FIELD");
            return Err(AppError::Configuration(format!(
                "utilizador {} sem campo de senha",
                user.id
            )));
        }
    };
    if !password_service::is_recognized_hash(stored) {
        tracing::warn!(flow, user_id = user.id, "PLAINTEXT_PASSWORD_IN_DB");
        return Err(AppError::Configuration(format!(
            "senha do utilizador {} não está com hash",
            user.id
        )));
    }
    Ok(stored)
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<UserProfile> {
    let nome = req.nome.trim();
    let email = req.email.trim();

    let tipo = req
        .tipo
        .parse::<Tipo>()
        .ok()
        .filter(|t| SELF_SERVICE_ROLES.contains(t));

    let mut v = Validator::new();
    v.min_len("nome", nome, 1)
        .email("email", email)
        .min_len("password", &req.password, MIN_PASSWORD_LEN);
    if tipo.is_none() {
        v.error("tipo", "Deve ser 'aluno' ou 'professor'");
    }
    v.finish()?;
    let tipo = tipo.ok_or_else(|| AppError::validation("tipo inválido"))?;

    tracing::info!("Registo de novo utilizador: {}", email);
    let mut conn = state.db_pool.acquire().await?;
    if credential_store::find_user_by_email(&mut conn, email).await?.is_some() {
        tracing::warn!("Registo recusado: e-mail '{}' já existe.", email);
        return Err(AppError::Conflict("E-mail já cadastrado.".to_string()));
    }

    let hash = password_service::hash_password(&req.password).await?;
    let id = credential_store::create_user(&mut conn, nome, email, &hash, tipo).await?;

    tracing::info!("✅ Utilizador {} registado como {}.", id, tipo);
    Ok(UserProfile {
        id,
        email: email.to_string(),
        nome: nome.to_string(),
        tipo,
    })
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<LoginResponse> {
    let email = req.email.trim();
    let mut v = Validator::new();
    v.email("email", email).min_len("password", &req.password, 1);
    v.finish()?;

    tracing::info!("Tentativa de login para: {}", email);
    let user = {
        let mut conn = state.db_pool.acquire().await?;
        credential_store::find_user_by_email(&mut conn, email).await?
    };
    let Some(user) = user else {
        tracing::warn!("Utilizador não encontrado: {}", email);
        return Err(AppError::InvalidCredentials);
    };

    let stored = trusted_hash(&user, "login")?;
    if !password_service::verify_password(&req.password, stored).await? {
        tracing::warn!("Senha incorreta para: {}", email);
        return Err(AppError::InvalidCredentials);
    }

    let profile = user.profile();
    let token = state.tokens.issue_session_token(&profile)?;
    tracing::info!("✅ Login bem-sucedido para: {}", profile.id);
    Ok(LoginResponse { token, user: profile })
}

pub async fn change_password(
    state: &AppState,
    me: &UserProfile,
    req: ChangePasswordRequest,
) -> AppResult<()> {
    let mut v = Validator::new();
    v.min_len("current", &req.current, 1)
        .min_len("next", &req.next, MIN_PASSWORD_LEN);
    v.finish()?;

    let mut conn = state.db_pool.acquire().await?;
    let user = credential_store::find_user_by_id(&mut conn, me.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))?;

    let stored = trusted_hash(&user, "change_password")?;
    if !password_service::verify_password(&req.current, stored).await? {
        tracing::warn!("Troca de senha recusada: senha atual inválida para {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    let hash = password_service::hash_password(&req.next).await?;
    let info = credential_store::update_password(&mut conn, user.id, &hash).await?;
    tracing::info!(
        user_id = user.id,
        field = info.matched_field,
        column = info.matched_column,
        "CHANGE_PASSWORD_OK"
    );
    Ok(())
}

fn first_value(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Melhor origem disponível para o link de reset: Origin, depois
/// X-Forwarded-Proto + X-Forwarded-Host, depois Host.
pub fn infer_app_url(origin: &RequestOrigin) -> Option<String> {
    if let Some(o) = first_value(origin.origin.as_deref()).filter(|o| *o != "null") {
        return Some(o.trim_end_matches('/').to_string());
    }

    let proto = first_value(origin.forwarded_proto.as_deref());
    if let (Some(proto), Some(host)) = (proto, first_value(origin.forwarded_host.as_deref())) {
        return Some(format!("{}://{}", proto, host));
    }

    first_value(origin.host.as_deref())
        .map(|host| format!("{}://{}", proto.unwrap_or("http"), host))
}

pub fn reset_link(base: &str, token: &str) -> String {
    format!(
        "{}/reset-password?token={}",
        base.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn reset_email_html(nome: &str, link: &str) -> String {
    let link = escape_html(link);
    format!(
        r#"<p>Olá {nome},</p>
<p>Para redefinir sua senha, clique no link abaixo (válido por 30 minutos):</p>
<p><a href="{link}" target="_blank">{link}</a></p>
<p>Se não pediu a redefinição, ignore este e-mail.</p>"#,
        nome = escape_html(nome),
        link = link,
    )
}

/// Responde sempre com sucesso para não revelar que e-mails existem.
pub async fn forgot_password(
    state: &AppState,
    req: ForgotPasswordRequest,
    origin: &RequestOrigin,
) -> AppResult<()> {
    let email = req.email.trim();
    let mut v = Validator::new();
    v.email("email", email);
    v.finish()?;

    let user = {
        let mut conn = state.db_pool.acquire().await?;
        credential_store::find_user_by_email(&mut conn, email).await?
    };
    let Some(user) = user else {
        tracing::debug!("Pedido de reset para e-mail desconhecido.");
        return Ok(());
    };

    let token = match state.tokens.issue_reset_token(user.id) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Não foi possível emitir token de reset: {}", e);
            return Ok(());
        }
    };

    let base = infer_app_url(origin)
        .or_else(|| state.config.app_url.clone())
        .unwrap_or_else(|| DEFAULT_APP_URL.to_string());
    let link = reset_link(&base, &token);

    if let Err(e) = state
        .mailer
        .send_mail(&user.email, "Redefinição de senha", &reset_email_html(&user.nome, &link))
        .await
    {
        tracing::error!("Erro ao enviar e-mail de reset para {}: {:?}", user.id, e);
    } else {
        tracing::info!("E-mail de reset enviado para o utilizador {}", user.id);
    }
    Ok(())
}

pub async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> AppResult<()> {
    let mut v = Validator::new();
    v.min_len("token", req.token.trim(), 1)
        .min_len("password", &req.password, MIN_PASSWORD_LEN);
    v.finish()?;

    let claims = state
        .tokens
        .verify(req.token.trim(), TokenPurpose::Reset)
        .map_err(|e| {
            tracing::warn!("RESET_VERIFY_FAILED: {}", e);
            match e {
                TokenError::MissingSecret(_) => AppError::from(e),
                _ => AppError::InvalidResetToken,
            }
        })?;
    let uid = claims.subject_id().ok_or(AppError::InvalidResetToken)?;

    let hash = password_service::hash_password(&req.password).await?;
    let mut conn = state.db_pool.acquire().await?;
    let info = credential_store::update_password(&mut conn, uid, &hash)
        .await
        .inspect_err(|e| tracing::warn!("RESET_UPDATE_FAILED para {}: {}", uid, e))?;
    tracing::info!(
        user_id = uid,
        field = info.matched_field,
        column = info.matched_column,
        "RESET_OK"
    );

    // Pós-verificação: o valor gravado tem de ser um hash reconhecido
    let stored = credential_store::find_user_by_id(&mut conn, uid)
        .await?
        .and_then(|u| u.senha);
    if !stored.as_deref().is_some_and(password_service::is_recognized_hash) {
        tracing::warn!(user_id = uid, "RESET_POSTCHECK_FAILED");
    }
    Ok(())
}
