// File: src/proxy/response.rs
// Purpose: JSON envelopes returned to the browser and the error taxonomy behind them

use crate::booking::BookingError;
use crate::resos::{Booking, UpstreamError};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use reservas_validation::rules::{PARTY_SIZE_OUT_OF_RANGE, PHONE_INVALID, TIME_INVALID};
use reservas_validation::Field;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub const CREATED_MESSAGE: &str = "Reserva creada exitosamente.";
pub const ALLOWED_METHOD: &str = "POST";

/// Body of a 201 reply
#[derive(Debug, Clone, Serialize)]
pub struct BookingEnvelope {
    pub success: bool,
    pub message: String,
    pub data: ConfirmedBooking,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedBooking {
    pub booking_id: String,
    pub status: Option<String>,
    pub date_time: Option<String>,
    pub people: Option<u32>,
    pub guest: ConfirmedGuest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmedGuest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl From<Booking> for ConfirmedBooking {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            status: booking.status,
            date_time: booking.date_time,
            people: booking.people,
            guest: ConfirmedGuest {
                name: booking.guest.name,
                phone: booking.guest.phone,
                email: booking.guest.email,
            },
        }
    }
}

impl BookingEnvelope {
    pub fn created(booking: Booking) -> Self {
        Self {
            success: true,
            message: CREATED_MESSAGE.to_string(),
            data: booking.into(),
        }
    }
}

impl IntoResponse for BookingEnvelope {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}

/// Body of every failed reply
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<&'static str>,
    /// Diagnostic detail, development mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            ..Self::default()
        }
    }

    fn with_errors<I, V>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = (Field, V)>,
        V: Into<String>,
    {
        let map = errors
            .into_iter()
            .map(|(field, message)| (field.as_str().to_string(), message.into()))
            .collect();
        self.errors = Some(map);
        self
    }
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("missing required fields: {0:?}")]
    MissingFields(Vec<Field>),

    #[error("malformed phone number")]
    InvalidPhone,

    #[error("invalid fields: {0:?}")]
    InvalidFields(BTreeMap<Field, &'static str>),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

fn missing_message(field: Field) -> &'static str {
    match field {
        Field::Nombre => "El nombre es obligatorio",
        Field::Telefono => "El teléfono es obligatorio",
        Field::Fecha => "La fecha es obligatoria",
        Field::Hora => "La hora es obligatoria",
        Field::Personas => "El número de personas es obligatorio",
        Field::Email => "El email es obligatorio",
    }
}

const GENERIC_FAILURE: &str =
    "Ocurrió un error al procesar la reserva. Por favor, inténtelo nuevamente.";

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::MalformedBody(_)
            | ProxyError::MissingFields(_)
            | ProxyError::InvalidPhone
            | ProxyError::InvalidFields(_)
            | ProxyError::Booking(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(err) => match err {
                UpstreamError::Rejected(_) => StatusCode::BAD_REQUEST,
                UpstreamError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Client-facing body. `expose_detail` adds the underlying error text to
    /// generic failures and must stay off in production.
    pub fn body(&self, expose_detail: bool) -> ErrorBody {
        match self {
            ProxyError::MethodNotAllowed(method) => ErrorBody {
                method: Some(method.to_string()),
                allowed: Some(ALLOWED_METHOD),
                ..ErrorBody::new("Método no permitido. Use POST.")
            },
            ProxyError::MalformedBody(_) => ErrorBody::new("Cuerpo de la petición inválido."),
            ProxyError::MissingFields(fields) => ErrorBody::new("Todos los campos son obligatorios.")
                .with_errors(fields.iter().map(|f| (*f, missing_message(*f)))),
            ProxyError::InvalidPhone => ErrorBody::new("El formato del teléfono es inválido.")
                .with_errors([(Field::Telefono, PHONE_INVALID)]),
            ProxyError::InvalidFields(errors) => {
                ErrorBody::new("Los datos proporcionados no son válidos.")
                    .with_errors(errors.iter().map(|(f, m)| (*f, *m)))
            }
            ProxyError::Booking(err) => {
                let field = match err {
                    BookingError::InvalidPartySize(_) => (Field::Personas, PARTY_SIZE_OUT_OF_RANGE),
                    BookingError::InvalidDateTime(_, _) | BookingError::NonexistentLocalTime(_) => {
                        (Field::Hora, TIME_INVALID)
                    }
                };
                ErrorBody::new("Los datos proporcionados no son válidos.").with_errors([field])
            }
            ProxyError::Upstream(err) => match err {
                UpstreamError::Unauthorized => {
                    ErrorBody::new("Error de autenticación con el servicio de reservas.")
                }
                UpstreamError::Rejected(_) => {
                    ErrorBody::new("Los datos proporcionados no cumplen con los requisitos.")
                }
                UpstreamError::Connection(_) => ErrorBody::new(
                    "Error de conexión con el servicio de reservas. Por favor, inténtelo nuevamente.",
                ),
                other => ErrorBody {
                    error: expose_detail.then(|| other.to_string()),
                    ..ErrorBody::new(GENERIC_FAILURE)
                },
            },
        }
    }

    pub fn into_reply(self, expose_detail: bool) -> Response {
        (self.status(), Json(self.body(expose_detail))).into_response()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        self.into_reply(false)
    }
}
