// src/services/user_service.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUserRequest, Tipo, UpdateUserRequest, UserProfile},
    services::{auth_service::MIN_PASSWORD_LEN, credential_store, password_service},
    validation::Validator,
};
use sqlx::{SqliteConnection, SqlitePool};

const MIN_NOME_LEN: usize = 2;

fn not_found() -> AppError {
    AppError::NotFound("Usuário não encontrado".to_string())
}

fn parse_tipo(v: &mut Validator, raw: &str) -> Option<Tipo> {
    match raw.parse::<Tipo>() {
        Ok(tipo) => Some(tipo),
        Err(e) => {
            v.error("tipo", e);
            None
        }
    }
}

/// Lista todos os utilizadores (sem hash) por ordem de id.
pub async fn list_users(db_pool: &SqlitePool) -> AppResult<Vec<UserProfile>> {
    tracing::debug!("Buscando todos os utilizadores...");
    let rows: Vec<(i64, String, String, String)> =
        sqlx::query_as("SELECT id_usuario, nome, email, tipo FROM usuario ORDER BY id_usuario ASC")
            .fetch_all(db_pool)
            .await?;

    let users = rows
        .into_iter()
        .map(|(id, nome, email, tipo)| -> AppResult<UserProfile> {
            let tipo = tipo.parse::<Tipo>().map_err(AppError::Configuration)?;
            Ok(UserProfile { id, email, nome, tipo })
        })
        .collect::<AppResult<Vec<_>>>()?;
    tracing::debug!("Encontrados {} utilizadores.", users.len());
    Ok(users)
}

// Sub-perfil do papel efetivo. Valores omitidos preservam o que já existe.
async fn upsert_subprofile(
    conn: &mut SqliteConnection,
    user_id: i64,
    tipo: Tipo,
    matricula: Option<&str>,
    disciplina: Option<&str>,
) -> AppResult<()> {
    match tipo {
        Tipo::Aluno => {
            sqlx::query(
                r#"
                INSERT INTO aluno (id_aluno, matricula) VALUES (?1, COALESCE(?2, ''))
                ON CONFLICT(id_aluno) DO UPDATE SET matricula = COALESCE(?2, aluno.matricula)
                "#,
            )
            .bind(user_id)
            .bind(matricula)
            .execute(&mut *conn)
            .await?;
        }
        Tipo::Professor => {
            sqlx::query(
                r#"
                INSERT INTO professor (id_professor, disciplina) VALUES (?1, COALESCE(?2, ''))
                ON CONFLICT(id_professor) DO UPDATE SET disciplina = COALESCE(?2, professor.disciplina)
                "#,
            )
            .bind(user_id)
            .bind(disciplina)
            .execute(&mut *conn)
            .await?;
        }
        Tipo::Coordenador | Tipo::Admin => {}
    }
    Ok(())
}

pub async fn create_user(db_pool: &SqlitePool, req: CreateUserRequest) -> AppResult<UserProfile> {
    let nome = req.nome.trim();
    let email = req.email.trim().to_string();

    let mut v = Validator::new();
    v.min_len("nome", nome, MIN_NOME_LEN)
        .email("email", &email)
        .min_len("password", &req.password, MIN_PASSWORD_LEN);
    let tipo = parse_tipo(&mut v, &req.tipo);
    v.finish()?;
    let tipo = tipo.ok_or_else(|| AppError::validation("Invalid body"))?;

    tracing::info!("Tentando criar utilizador: {}", email);
    let hash = password_service::hash_password(&req.password).await?;

    let mut tx = db_pool.begin().await?;
    let id = credential_store::create_user(&mut tx, nome, &email, &hash, tipo).await?;
    // Na criação só se cria o sub-perfil quando o dado foi enviado
    let matricula = req.matricula.as_deref().filter(|s| !s.is_empty());
    let disciplina = req.disciplina.as_deref().filter(|s| !s.is_empty());
    if (tipo == Tipo::Aluno && matricula.is_some()) || (tipo == Tipo::Professor && disciplina.is_some()) {
        upsert_subprofile(&mut tx, id, tipo, matricula, disciplina).await?;
    }
    tx.commit().await?;

    tracing::info!("✅ Utilizador '{}' criado com id {}.", email, id);
    Ok(UserProfile {
        id,
        email,
        nome: nome.to_string(),
        tipo,
    })
}

pub async fn update_user(
    db_pool: &SqlitePool,
    user_id: i64,
    req: UpdateUserRequest,
) -> AppResult<UserProfile> {
    let nome = req.nome.as_deref().map(str::trim);

    let mut v = Validator::new();
    if let Some(nome) = nome {
        v.min_len("nome", nome, MIN_NOME_LEN);
    }
    if let Some(password) = req.password.as_deref() {
        v.min_len("password", password, MIN_PASSWORD_LEN);
    }
    let tipo = req.tipo.as_deref().and_then(|raw| parse_tipo(&mut v, raw));
    v.finish()?;

    // Hash fora da transação: não segurar a conexão durante o bcrypt
    let hash = match req.password.as_deref() {
        Some(password) => Some(password_service::hash_password(password).await?),
        None => None,
    };

    tracing::info!("Atualizando dados para user: {}", user_id);
    let mut tx = db_pool.begin().await?;

    let current = credential_store::find_user_by_id(&mut tx, user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Falha ao atualizar: utilizador {} não encontrado.", user_id);
            not_found()
        })?;
    let effective = tipo.unwrap_or(current.tipo);

    if effective != current.tipo {
        tracing::debug!("Papel de {} muda de {} para {}", user_id, current.tipo, effective);
        sqlx::query("DELETE FROM aluno WHERE id_aluno = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM professor WHERE id_professor = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    credential_store::update_profile(&mut tx, user_id, nome, effective).await?;

    if let Some(hash) = hash {
        credential_store::update_password(&mut tx, user_id, &hash).await?;
    }

    upsert_subprofile(
        &mut tx,
        user_id,
        effective,
        req.matricula.as_deref(),
        req.disciplina.as_deref(),
    )
    .await?;

    tx.commit().await?;
    tracing::info!("✅ Dados atualizados com sucesso para user: {}", user_id);

    Ok(UserProfile {
        id: current.id,
        email: current.email,
        nome: nome.map(str::to_string).unwrap_or(current.nome),
        tipo: effective,
    })
}

/// Remove o utilizador; sub-perfis e reservas caem em cascata.
pub async fn delete_user(db_pool: &SqlitePool, user_id: i64) -> AppResult<()> {
    let rows_affected = sqlx::query("DELETE FROM usuario WHERE id_usuario = ?1")
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Falha ao remover: utilizador {} não encontrado.", user_id);
        return Err(not_found());
    }
    tracing::info!("Utilizador {} removido.", user_id);
    Ok(())
}

/// Redefinição direta pelo operador (comando `reset-admin`).
pub async fn reset_password_by_email(
    db_pool: &SqlitePool,
    email: &str,
    new_password: &str,
) -> AppResult<UserProfile> {
    let email = email.trim();
    let mut v = Validator::new();
    v.email("email", email)
        .min_len("password", new_password, MIN_PASSWORD_LEN);
    v.finish()?;

    let hash = password_service::hash_password(new_password).await?;
    let mut conn = db_pool.acquire().await?;
    let user = credential_store::find_user_by_email(&mut conn, email)
        .await?
        .ok_or_else(not_found)?;

    let update = credential_store::update_password(&mut conn, user.id, &hash).await?;
    tracing::info!(
        "✅ Senha redefinida para '{}' ({} / {}).",
        email,
        update.matched_field,
        update.matched_column
    );
    Ok(user.profile())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn new_user(nome: &str, email: &str, tipo: &str) -> CreateUserRequest {
        CreateUserRequest {
            nome: nome.into(),
            email: email.into(),
            password: "segredo1".into(),
            tipo: tipo.into(),
            ..Default::default()
        }
    }

    async fn subprofile(pool: &SqlitePool, table: &str, user_id: i64) -> Option<String> {
        let sql = match table {
            "aluno" => "SELECT matricula FROM aluno WHERE id_aluno = ?1",
            _ => "SELECT disciplina FROM professor WHERE id_professor = ?1",
        };
        sqlx::query_scalar(sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn creates_and_lists_users() {
        let pool = db::test_pool().await;
        let mut aluno = new_user("Ana", " ana@x.com ", "aluno");
        aluno.matricula = Some("2025001".into());
        let ana = create_user(&pool, aluno).await.unwrap();
        assert_eq!(ana.email, "ana@x.com");
        create_user(&pool, new_user("Root", "root@x.com", "admin")).await.unwrap();

        let users = list_users(&pool).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, ana.id);
        assert_eq!(users[1].tipo, Tipo::Admin);
        assert_eq!(subprofile(&pool, "aluno", ana.id).await.as_deref(), Some("2025001"));

        let dup = create_user(&pool, new_user("Outra", "ana@x.com", "professor")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let pool = db::test_pool().await;
        let mut bad = new_user("A", "nope", "superuser");
        bad.password = "123".into();
        match create_user(&pool, bad).await {
            Err(AppError::Validation { details: Some(details), .. }) => {
                let fields = &details["fieldErrors"];
                for field in ["nome", "email", "password", "tipo"] {
                    assert!(fields[field].is_array(), "{}", field);
                }
            }
            other => panic!("esperava erro de validação, obtive {:?}", other),
        }
    }

    #[tokio::test]
    async fn role_change_swaps_subprofiles() {
        let pool = db::test_pool().await;
        let mut aluno = new_user("Ana", "ana@x.com", "aluno");
        aluno.matricula = Some("2025001".into());
        let ana = create_user(&pool, aluno).await.unwrap();

        let updated = update_user(
            &pool,
            ana.id,
            UpdateUserRequest {
                tipo: Some("professor".into()),
                disciplina: Some("Física".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.tipo, Tipo::Professor);
        assert_eq!(updated.nome, "Ana");
        assert!(subprofile(&pool, "aluno", ana.id).await.is_none());
        assert_eq!(subprofile(&pool, "professor", ana.id).await.as_deref(), Some("Física"));

        // Sem disciplina no pedido, mantém a existente
        update_user(
            &pool,
            ana.id,
            UpdateUserRequest {
                nome: Some("Ana Paula".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(subprofile(&pool, "professor", ana.id).await.as_deref(), Some("Física"));
    }

    #[tokio::test]
    async fn update_changes_password() {
        let pool = db::test_pool().await;
        let ana = create_user(&pool, new_user("Ana", "ana@x.com", "aluno")).await.unwrap();

        update_user(
            &pool,
            ana.id,
            UpdateUserRequest {
                password: Some("nova-senha".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let stored = credential_store::find_user_by_id(&mut conn, ana.id)
            .await
            .unwrap()
            .unwrap()
            .senha
            .unwrap();
        drop(conn);
        assert!(password_service::verify_password("nova-senha", &stored).await.unwrap());
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let pool = db::test_pool().await;
        assert!(matches!(
            update_user(&pool, 404, UpdateUserRequest::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(delete_user(&pool, 404).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            reset_password_by_email(&pool, "ghost@x.com", "segredo1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_cascades_to_subprofiles() {
        let pool = db::test_pool().await;
        let mut aluno = new_user("Ana", "ana@x.com", "aluno");
        aluno.matricula = Some("1".into());
        let ana = create_user(&pool, aluno).await.unwrap();

        delete_user(&pool, ana.id).await.unwrap();
        assert!(subprofile(&pool, "aluno", ana.id).await.is_none());
        assert!(list_users(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn operator_reset_rehashes_password() {
        let pool = db::test_pool().await;
        create_user(&pool, new_user("Root", "root@x.com", "admin")).await.unwrap();

        let root = reset_password_by_email(&pool, " root@x.com ", "outra-senha").await.unwrap();
        assert_eq!(root.tipo, Tipo::Admin);

        let mut conn = pool.acquire().await.unwrap();
        let stored = credential_store::find_user_by_email(&mut conn, "root@x.com")
            .await
            .unwrap()
            .unwrap()
            .senha
            .unwrap();
        drop(conn);
        assert!(password_service::verify_password("outra-senha", &stored).await.unwrap());
    }
}
