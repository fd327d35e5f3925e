// src/services/booking_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{
            Booking, BookingDetail, BookingOwner, CreateBookingPayload, NewBooking, TimestampInput,
        },
        room::Room,
        user::{Tipo, UserProfile},
    },
    validation::Validator,
};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};

/// Mensagem levantada pelo trigger de sobreposição (ver migrações).
const OVERLAP_TRIGGER_MARKER: &str = "conflito_de_horario";
const CONFLICT_MESSAGE: &str = "Conflito de horário para esta sala";
const BUSY_MESSAGE: &str = "Sala ocupada por outra operação; tente novamente";

// Formatos aceites, por ordem: <input type="datetime-local"> e o formato brasileiro.
const LOCAL_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M",
    "%d/%m/%YT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Normaliza um instante para hora local de parede, ao segundo.
pub fn parse_timestamp(input: &TimestampInput) -> AppResult<NaiveDateTime> {
    let parsed = match input {
        TimestampInput::At(at) => Some(*at),
        TimestampInput::EpochMillis(ms) => Local
            .timestamp_millis_opt(*ms)
            .single()
            .map(|dt| dt.naive_local()),
        TimestampInput::Text(raw) => parse_text(raw.trim()),
    };

    parsed
        .and_then(|at| at.with_nanosecond(0))
        .ok_or_else(|| AppError::InvalidTimestamp(describe(input)))
}

fn parse_text(raw: &str) -> Option<NaiveDateTime> {
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        // Último recurso: instante com fuso (ex.: Date.toISOString())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Local).naive_local())
        })
}

fn describe(input: &TimestampInput) -> String {
    match input {
        TimestampInput::At(at) => at.to_string(),
        TimestampInput::EpochMillis(ms) => ms.to_string(),
        TimestampInput::Text(raw) => format!("'{}'", raw),
    }
}

// Ids chegam como número ou texto numérico ("3").
fn coerce_id(value: Option<&Value>) -> Option<i64> {
    let id = match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

fn coerce_timestamp(value: Option<&Value>) -> Option<TimestampInput> {
    match value? {
        Value::String(s) => Some(TimestampInput::Text(s.clone())),
        Value::Number(n) => n.as_i64().map(TimestampInput::EpochMillis),
        _ => None,
    }
}

/// Desembrulha o corpo de POST /bookings, acumulando os erros por campo.
pub fn payload_to_new_booking(payload: CreateBookingPayload) -> AppResult<NewBooking> {
    let id_sala = coerce_id(payload.id_sala.as_ref());
    let inicio = coerce_timestamp(payload.inicio.as_ref());
    let fim = coerce_timestamp(payload.fim.as_ref());

    let mut v = Validator::new();
    if id_sala.is_none() {
        v.error("id_sala", "Deve ser um inteiro positivo");
    }
    if inicio.is_none() {
        v.error("inicio", "Campo obrigatório");
    }
    if fim.is_none() {
        v.error("fim", "Campo obrigatório");
    }
    let id_usuario = match payload.id_usuario.as_ref() {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let id = coerce_id(Some(raw));
            if id.is_none() {
                v.error("id_usuario", "Deve ser um inteiro positivo");
            }
            id
        }
    };
    v.finish()?;

    match (id_sala, inicio, fim) {
        (Some(id_sala), Some(inicio), Some(fim)) => Ok(NewBooking {
            id_sala,
            inicio,
            fim,
            id_usuario,
        }),
        _ => Err(AppError::validation("Invalid body")),
    }
}

/// Dono efetivo da reserva. Só admin delega; para os restantes o pedido de
/// delegação é ignorado e a reserva fica em nome de quem pede.
pub fn resolve_owner(requester: &UserProfile, delegate: Option<i64>) -> i64 {
    match delegate {
        Some(target) if requester.tipo.is_admin() => target,
        Some(target) if target != requester.id => {
            tracing::warn!(
                "Delegação ignorada: {} ({}) tentou reservar em nome de {}",
                requester.id,
                requester.tipo,
                target
            );
            requester.id
        }
        _ => requester.id,
    }
}

// Trigger de sobreposição → conflito de horário; base ocupada/bloqueada
// (SQLITE_BUSY, SQLITE_LOCKED, BUSY_SNAPSHOT) → conflito sem culpar o horário.
fn refusal_message(code: Option<&str>, message: &str) -> Option<&'static str> {
    if message.contains(OVERLAP_TRIGGER_MARKER) {
        return Some(CONFLICT_MESSAGE);
    }
    match code {
        Some("5") | Some("6") | Some("517") => Some(BUSY_MESSAGE),
        _ => None,
    }
}

fn conflict_or_db(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(message) = refusal_message(db_err.code().as_deref(), db_err.message()) {
            tracing::warn!("Reserva recusada pela base: {}", db_err.message());
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::SqlxError(err)
}

pub async fn create_booking(
    db_pool: &SqlitePool,
    requester: &UserProfile,
    req: NewBooking,
) -> AppResult<Booking> {
    let inicio = parse_timestamp(&req.inicio)?;
    let fim = parse_timestamp(&req.fim)?;
    if fim <= inicio {
        return Err(AppError::InvalidRange);
    }

    let owner = resolve_owner(requester, req.id_usuario);
    tracing::info!(
        "Reserva pedida por {}: sala {} de {} a {} (dono {})",
        requester.id,
        req.id_sala,
        inicio,
        fim,
        owner
    );

    // Verificação + inserção na mesma transação; o trigger garante a
    // invariante mesmo com pedidos concorrentes.
    let mut tx = db_pool.begin().await?;

    // A escrita na sala toma o lock de escrita logo no início da transação
    // (o BEGIN do sqlx é DEFERRED); serve também de verificação de existência.
    let room_rows = sqlx::query("UPDATE sala SET capacidade = capacidade WHERE id_sala = ?1")
        .bind(req.id_sala)
        .execute(&mut *tx)
        .await
        .map_err(conflict_or_db)?
        .rows_affected();
    if room_rows == 0 {
        return Err(AppError::validation(format!("Sala {} não existe", req.id_sala)));
    }

    let owner_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM usuario WHERE id_usuario = ?1)")
            .bind(owner)
            .fetch_one(&mut *tx)
            .await?;
    if !owner_exists {
        return Err(AppError::validation(format!("Usuário {} não existe", owner)));
    }

    let conflict: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id_registro FROM registro
        WHERE id_sala = ?1 AND inicio < ?3 AND fim > ?2
        LIMIT 1
        "#,
    )
    .bind(req.id_sala)
    .bind(inicio)
    .bind(fim)
    .fetch_optional(&mut *tx)
    .await?;
    if let Some(existing) = conflict {
        tracing::warn!("Conflito com a reserva {} na sala {}", existing, req.id_sala);
        return Err(AppError::Conflict(CONFLICT_MESSAGE.to_string()));
    }

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO registro (id_usuario, id_sala, inicio, fim)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id_registro, id_usuario, id_sala, inicio, fim
        "#,
    )
    .bind(owner)
    .bind(req.id_sala)
    .bind(inicio)
    .bind(fim)
    .fetch_one(&mut *tx)
    .await
    .map_err(conflict_or_db)?;

    tx.commit().await.map_err(conflict_or_db)?;
    tracing::info!("✅ Reserva {} criada.", booking.id_registro);
    Ok(booking)
}

pub async fn find_booking(db_pool: &SqlitePool, id: i64) -> AppResult<Option<Booking>> {
    let booking = sqlx::query_as::<_, Booking>(
        "SELECT id_registro, id_usuario, id_sala, inicio, fim FROM registro WHERE id_registro = ?1",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?;
    Ok(booking)
}

/// O dono cancela sempre; os papéis em `cancel_any_roles` cancelam qualquer reserva.
pub async fn delete_booking(
    db_pool: &SqlitePool,
    cancel_any_roles: &[Tipo],
    requester: &UserProfile,
    id: i64,
) -> AppResult<()> {
    let booking = find_booking(db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agendamento não encontrado".to_string()))?;

    if booking.id_usuario != requester.id && !cancel_any_roles.contains(&requester.tipo) {
        tracing::warn!(
            "Cancelamento negado: {} não é dono da reserva {}",
            requester.id,
            id
        );
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM registro WHERE id_registro = ?1")
        .bind(id)
        .execute(db_pool)
        .await?;
    tracing::info!("Reserva {} cancelada por {}", id, requester.id);
    Ok(())
}

#[derive(FromRow)]
struct BookingRow {
    id_registro: i64,
    id_usuario: i64,
    id_sala: i64,
    inicio: NaiveDateTime,
    fim: NaiveDateTime,
    usuario_nome: String,
    usuario_tipo: String,
    nome_sala: String,
    capacidade: i64,
}

impl TryFrom<BookingRow> for BookingDetail {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let tipo = row
            .usuario_tipo
            .parse::<Tipo>()
            .map_err(AppError::Configuration)?;
        Ok(BookingDetail {
            id_registro: row.id_registro,
            id_usuario: row.id_usuario,
            id_sala: row.id_sala,
            inicio: row.inicio,
            fim: row.fim,
            usuario: BookingOwner {
                id_usuario: row.id_usuario,
                nome: row.usuario_nome,
                tipo,
            },
            sala: Room {
                id_sala: row.id_sala,
                nome_sala: row.nome_sala,
                capacidade: row.capacidade,
            },
        })
    }
}

pub async fn list_bookings(
    db_pool: &SqlitePool,
    requester: &UserProfile,
    mine_only: bool,
) -> AppResult<Vec<BookingDetail>> {
    tracing::debug!("Listando reservas (mine={}) para {}", mine_only, requester.id);
    let rows = sqlx::query_as::<_, BookingRow>(
        r#"
        SELECT
            r.id_registro, r.id_usuario, r.id_sala, r.inicio, r.fim,
            u.nome AS usuario_nome, u.tipo AS usuario_tipo,
            s.nome_sala, s.capacidade
        FROM registro r
        JOIN usuario u ON u.id_usuario = r.id_usuario
        JOIN sala s ON s.id_sala = r.id_sala
        WHERE (?1 = 0 OR r.id_usuario = ?2)
        ORDER BY r.inicio ASC, r.id_registro ASC
        "#,
    )
    .bind(mine_only)
    .bind(requester.id)
    .fetch_all(db_pool)
    .await?;

    rows.into_iter().map(BookingDetail::try_from).collect()
}
