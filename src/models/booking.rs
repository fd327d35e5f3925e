// src/models/booking.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{room::Room, user::Tipo};

/// Reserva (tabela 'registro'). Instantes em hora local de parede.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id_registro: i64,
    pub id_usuario: i64,
    pub id_sala: i64,
    pub inicio: NaiveDateTime,
    pub fim: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingOwner {
    pub id_usuario: i64,
    pub nome: String,
    pub tipo: Tipo,
}

/// Reserva com os campos de sala e dono desnormalizados para apresentação.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetail {
    pub id_registro: i64,
    pub id_usuario: i64,
    pub id_sala: i64,
    pub inicio: NaiveDateTime,
    pub fim: NaiveDateTime,
    pub usuario: BookingOwner,
    pub sala: Room,
}

/// Instante ainda por normalizar: valor já tipado, texto ou epoch em ms.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampInput {
    At(NaiveDateTime),
    EpochMillis(i64),
    Text(String),
}

impl From<NaiveDateTime> for TimestampInput {
    fn from(value: NaiveDateTime) -> Self {
        TimestampInput::At(value)
    }
}

impl From<&str> for TimestampInput {
    fn from(value: &str) -> Self {
        TimestampInput::Text(value.to_string())
    }
}

/// Pedido de reserva já desembrulhado do JSON.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id_sala: i64,
    pub inicio: TimestampInput,
    pub fim: TimestampInput,
    /// Dono pretendido (delegação); só tem efeito para admin.
    pub id_usuario: Option<i64>,
}

// Corpo de POST /bookings. Aceita os aliases usados pelos clientes antigos;
// os valores ficam crus para permitir números em texto e datas em vários formatos.
#[derive(Debug, Default, Deserialize)]
pub struct CreateBookingPayload {
    #[serde(default, alias = "idSala", alias = "roomId")]
    pub id_sala: Option<Value>,
    #[serde(default, alias = "start", alias = "dataInicio")]
    pub inicio: Option<Value>,
    #[serde(default, alias = "end", alias = "dataFim")]
    pub fim: Option<Value>,
    #[serde(default, alias = "idUsuario", alias = "userId")]
    pub id_usuario: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBookingsParams {
    pub mine: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_accepts_aliases() {
        let payload: CreateBookingPayload = serde_json::from_str(
            r#"{"roomId": "3", "start": "2025-08-28T10:00", "dataFim": "28/08/2025 11:00"}"#,
        )
        .unwrap();
        assert_eq!(payload.id_sala, Some(Value::String("3".into())));
        assert!(payload.inicio.is_some());
        assert!(payload.fim.is_some());
        assert!(payload.id_usuario.is_none());
    }
}
