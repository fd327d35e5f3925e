// src/web/routes.rs
use crate::{
    models::auth::OkResponse,
    state::AppState,
    web::{admin_handlers, auth_handlers, booking_handlers, mw_admin, mw_auth, room_handlers},
};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/health", get(|| async { Json(OkResponse::ok()) }))
        .route("/auth/register", post(auth_handlers::handle_register))
        .route("/auth/login", post(auth_handlers::handle_login))
        .route("/auth/forgot", post(auth_handlers::handle_forgot))
        .route("/auth/reset", post(auth_handlers::handle_reset));

    // --- Gestão de salas (admin ou coordenador) ---
    let room_manager_routes = Router::new()
        .route("/rooms", post(room_handlers::handle_create_room))
        .route("/rooms/{id}", put(room_handlers::handle_update_room))
        .route_layer(middleware::from_fn(mw_admin::require_room_manager));

    // --- Rotas de Admin ---
    let admin_routes = Router::new()
        .route("/rooms/{id}", delete(room_handlers::handle_delete_room))
        .route(
            "/users",
            get(admin_handlers::handle_list_users).post(admin_handlers::handle_create_user),
        )
        .route(
            "/users/{id}",
            put(admin_handlers::handle_update_user).delete(admin_handlers::handle_delete_user),
        )
        .route_layer(middleware::from_fn(mw_admin::require_admin));

    // --- Rotas Autenticadas ---
    // require_auth corre antes dos middlewares de papel dos routers juntados aqui
    let authenticated_routes = Router::new()
        .route("/auth/me", get(auth_handlers::handle_me))
        .route("/auth/change-password", post(auth_handlers::handle_change_password))
        .route("/rooms", get(room_handlers::handle_list_rooms))
        .route(
            "/bookings",
            get(booking_handlers::handle_list_bookings).post(booking_handlers::handle_create_booking),
        )
        .route("/bookings/{id}", delete(booking_handlers::handle_delete_booking))
        .merge(room_manager_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        models::user::{Tipo, UserProfile},
        services::mailer::testing::RecordingMailer,
        state::testing::{seed_user, test_config, test_state, test_state_with},
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn user_token(state: &AppState, nome: &str, email: &str, tipo: Tipo) -> (UserProfile, String) {
        let user = seed_user(state, nome, email, "segredo1", tipo).await.unwrap();
        let token = state.tokens.issue_session_token(&user).unwrap();
        (user, token)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (state, _) = test_state().await;
        let (status, body) = send(&state, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn register_login_and_me() {
        let (state, _) = test_state().await;

        let (status, created) = send(
            &state,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "nome": "Ana", "email": "ana@x.com", "password": "segredo1", "tipo": "aluno" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["tipo"], "aluno");
        assert!(created.get("senha_hash").is_none());

        let (status, login) = send(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ana@x.com", "password": "segredo1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = login["token"].as_str().unwrap().to_string();
        assert_eq!(login["user"]["email"], "ana@x.com");

        let (status, me) = send(&state, "GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], created["id"]);

        let (status, _) = send(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ana@x.com", "password": "errada" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_purpose_tokens() {
        let (state, _) = test_state().await;
        let (user, _) = user_token(&state, "Ana", "ana@x.com", Tipo::Aluno).await;

        let (status, body) = send(&state, "GET", "/rooms", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let reset = state.tokens.issue_reset_token(user.id).unwrap();
        let (status, _) = send(&state, "GET", "/auth/me", Some(&reset), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&state, "GET", "/auth/me", Some("lixo"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_json_is_a_400_with_error_shape() {
        let (state, _) = test_state().await;
        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ nope"))
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Invalid body");
        assert!(body["details"]["formErrors"].is_array());
    }

    #[tokio::test]
    async fn bad_path_and_query_params_answer_in_json() {
        let (state, _) = test_state().await;
        let (_, admin) = user_token(&state, "Root", "root@x.com", Tipo::Admin).await;

        for (method, uri, body) in [
            ("DELETE", "/bookings/abc", None),
            ("PUT", "/rooms/abc", Some(json!({ "nome_sala": "Lab", "capacidade": 10 }))),
            ("DELETE", "/rooms/1.5", None),
            ("DELETE", "/users/abc", None),
        ] {
            let (status, body) = send(&state, method, uri, Some(&admin), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
            assert_eq!(body["error"], "Invalid params", "{} {}", method, uri);
            assert!(body["details"]["formErrors"].is_array(), "{} {}", method, uri);
        }

        let (status, body) = send(&state, "GET", "/bookings?mine=1&mine=0", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid query");
        assert!(body["details"]["formErrors"][0].is_string());
    }

    #[tokio::test]
    async fn room_management_is_role_gated() {
        let (state, _) = test_state().await;
        let (_, aluno) = user_token(&state, "Ana", "ana@x.com", Tipo::Aluno).await;
        let (_, coord) = user_token(&state, "Caio", "caio@x.com", Tipo::Coordenador).await;
        let (_, admin) = user_token(&state, "Root", "root@x.com", Tipo::Admin).await;
        let sala = json!({ "nome_sala": "Lab 1", "capacidade": 20 });

        let (status, _) = send(&state, "POST", "/rooms", Some(&aluno), Some(sala.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, room) = send(&state, "POST", "/rooms", Some(&coord), Some(sala)).await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/rooms/{}", room["id_sala"]);

        let (status, updated) = send(
            &state,
            "PUT",
            &uri,
            Some(&coord),
            Some(json!({ "nome_sala": "Lab 1A", "capacidade": 25 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["capacidade"], 25);

        let (status, _) = send(&state, "DELETE", &uri, Some(&coord), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&state, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, rooms) = send(&state, "GET", "/rooms", Some(&aluno), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rooms, json!([]));
    }

    #[tokio::test]
    async fn booking_conflicts_over_http() {
        let (state, _) = test_state().await;
        let (ana, token) = user_token(&state, "Ana", "ana@x.com", Tipo::Professor).await;
        let (_, admin) = user_token(&state, "Root", "root@x.com", Tipo::Admin).await;
        let (_, room) = send(
            &state,
            "POST",
            "/rooms",
            Some(&admin),
            Some(json!({ "nome_sala": "Lab", "capacidade": 10 })),
        )
        .await;
        let sala = room["id_sala"].clone();

        let (status, booking) = send(
            &state,
            "POST",
            "/bookings",
            Some(&token),
            Some(json!({ "roomId": sala, "start": "2025-08-28T10:00", "end": "2025-08-28T11:00" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(booking["id_usuario"], ana.id);
        assert_eq!(booking["inicio"], "2025-08-28T10:00:00");

        let (status, body) = send(
            &state,
            "POST",
            "/bookings",
            Some(&token),
            Some(json!({ "id_sala": sala, "inicio": "28/08/2025 10:30", "fim": "28/08/2025 11:30" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflito de horário para esta sala");

        let (status, _) = send(
            &state,
            "POST",
            "/bookings",
            Some(&token),
            Some(json!({ "id_sala": sala, "inicio": "2025-08-28T12:00", "fim": "2025-08-28T11:00" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &state,
            "POST",
            "/bookings",
            Some(&admin),
            Some(json!({ "id_sala": sala, "inicio": "2025-08-28T11:00", "fim": "2025-08-28T12:00" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, mine) = send(&state, "GET", "/bookings?mine=true", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine.as_array().unwrap().len(), 1);
        assert_eq!(mine[0]["usuario"]["nome"], "Ana");
        assert_eq!(mine[0]["sala"]["nome_sala"], "Lab");

        let (_, all) = send(&state, "GET", "/bookings", Some(&token), None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let uri = format!("/bookings/{}", booking["id_registro"]);
        let (status, _) = send(&state, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn admin_user_crud() {
        let (state, _) = test_state().await;
        let (_, admin) = user_token(&state, "Root", "root@x.com", Tipo::Admin).await;
        let (_, aluno) = user_token(&state, "Ana", "ana@x.com", Tipo::Aluno).await;

        let (status, _) = send(&state, "GET", "/users", Some(&aluno), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) = send(
            &state,
            "POST",
            "/users",
            Some(&admin),
            Some(json!({ "nome": "Caio", "email": "caio@x.com", "password": "segredo1", "tipo": "coordenador" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &state,
            "POST",
            "/users",
            Some(&admin),
            Some(json!({ "nome": "Caio", "email": "caio@x.com", "password": "segredo1", "tipo": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let uri = format!("/users/{}", created["id"]);
        let (status, updated) = send(
            &state,
            "PUT",
            &uri,
            Some(&admin),
            Some(json!({ "tipo": "professor", "disciplina": "Química" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["tipo"], "professor");

        let (_, users) = send(&state, "GET", "/users", Some(&admin), None).await;
        assert_eq!(users.as_array().unwrap().len(), 3);

        let (status, _) = send(&state, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn forgot_never_reveals_accounts() {
        let (state, mailer) = test_state().await;
        let (status, body) = send(
            &state,
            "POST",
            "/auth/forgot",
            None,
            Some(json!({ "email": "ninguem@x.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn login_without_secret_is_a_server_error() {
        let config = Config {
            auth_secret: None,
            ..test_config()
        };
        let state = test_state_with(config, Arc::new(RecordingMailer::default())).await;
        seed_user(&state, "Ana", "ana@x.com", "segredo1", Tipo::Aluno).await.unwrap();

        let (status, body) = send(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ana@x.com", "password": "segredo1" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Erro de configuração do servidor.");
    }
}
