// File: src/proxy/handler.rs
// Purpose: HTTP endpoints that accept the reservation form and forward it to resOS

use super::response::{BookingEnvelope, ProxyError};
use crate::booking::BookingNormalizer;
use crate::config::{Config, Environment};
use crate::resos::{ResosClient, UpstreamError};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use chrono::{NaiveDate, Utc};
use reservas_validation::{is_valid_phone, validate_form_on, ReservationForm};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub const RESERVATIONS_PATH: &str = "/api/reservas";
pub const SIMULATED_PATH: &str = "/api/reservas/simple";

/// Shared, read-only state of the proxy
#[derive(Clone)]
pub struct ProxyState {
    client: Arc<ResosClient>,
    normalizer: Arc<BookingNormalizer>,
    environment: Environment,
}

impl ProxyState {
    pub fn new(client: ResosClient, normalizer: BookingNormalizer, environment: Environment) -> Self {
        Self {
            client: Arc::new(client),
            normalizer: Arc::new(normalizer),
            environment,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, UpstreamError> {
        Ok(Self::new(
            ResosClient::from_config(&config.resos)?,
            BookingNormalizer::from_config(&config.booking),
            config.app.environment,
        ))
    }

    fn expose_detail(&self) -> bool {
        self.environment.is_development()
    }
}

/// Build the proxy router with CORS headers on every response
pub fn router(state: ProxyState) -> Router {
    let cors = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ));

    Router::new()
        .route(RESERVATIONS_PATH, any(reservations_handler))
        .route(SIMULATED_PATH, any(simulated_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /api/reservas
async fn reservations_handler(
    State(state): State<ProxyState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let span = info_span!("reservation", request_id = %Uuid::new_v4());
    async move {
        info!(%method, "reservation request received");

        if method != Method::POST {
            warn!(%method, "method not allowed");
            return ProxyError::MethodNotAllowed(method).into_reply(state.expose_detail());
        }

        match create_reservation(&state, &headers, &body).await {
            Ok(envelope) => envelope.into_response(),
            Err(err) => err.into_reply(state.expose_detail()),
        }
    }
    .instrument(span)
    .await
}

async fn create_reservation(
    state: &ProxyState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<BookingEnvelope, ProxyError> {
    let form = parse_form(headers, body)?;
    check_form(&form, state.normalizer.zone().today())?;

    let booking = state.normalizer.normalize(&form, Utc::now())?;

    match state.client.create_booking(&booking).await {
        Ok(created) => {
            info!(booking_id = %created.id, people = booking.people, "booking created upstream");
            Ok(BookingEnvelope::created(created))
        }
        Err(err) => {
            warn!(kind = err.kind(), error = %err, "upstream booking failed");
            Err(err.into())
        }
    }
}

/// Server-side checks, in order: required fields, phone shape, full rule set.
/// `today` is the restaurant's date, so it must come from the booking zone.
fn check_form(form: &ReservationForm, today: NaiveDate) -> Result<(), ProxyError> {
    let missing = form.missing_required();
    if !missing.is_empty() {
        warn!(fields = ?missing, "required fields missing");
        return Err(ProxyError::MissingFields(missing));
    }

    if !is_valid_phone(&form.telefono) {
        warn!("malformed phone number");
        return Err(ProxyError::InvalidPhone);
    }

    let validation = validate_form_on(form, today);
    if !validation.is_valid {
        let fields: Vec<_> = validation.errors.keys().collect();
        warn!(?fields, "reservation failed validation");
        return Err(ProxyError::InvalidFields(validation.errors));
    }

    Ok(())
}

/// Decode the body as JSON or as an urlencoded HTML form
pub fn parse_form(headers: &HeaderMap, body: &[u8]) -> Result<ReservationForm, ProxyError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.contains("application/x-www-form-urlencoded") {
        return parse_urlencoded(body);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReservationForm::default());
    }

    serde_json::from_slice(body).map_err(|e| ProxyError::MalformedBody(e.to_string()))
}

fn parse_urlencoded(body: &[u8]) -> Result<ReservationForm, ProxyError> {
    let text = std::str::from_utf8(body).map_err(|e| ProxyError::MalformedBody(e.to_string()))?;
    let decode = |raw: &str| -> Result<String, ProxyError> {
        urlencoding::decode(&raw.replace('+', " "))
            .map(|s| s.into_owned())
            .map_err(|e| ProxyError::MalformedBody(e.to_string()))
    };

    let mut pairs = Vec::new();
    for pair in text.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        pairs.push((decode(key)?, decode(value)?));
    }
    Ok(ReservationForm::from_pairs(pairs))
}

/// POST /api/reservas/simple: checks required fields and answers with a
/// simulated booking without contacting resOS
async fn simulated_handler(method: Method, headers: HeaderMap, body: Bytes) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    if method != Method::POST {
        return ProxyError::MethodNotAllowed(method).into_response();
    }

    let form = match parse_form(&headers, &body) {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    if !form.missing_required().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Campos obligatorios faltantes",
                "received": {
                    "nombre": form.nombre,
                    "telefono": form.telefono,
                    "fecha": form.fecha,
                    "hora": form.hora,
                    "personas": form.personas,
                },
            })),
        )
            .into_response();
    }

    let now = Utc::now();
    info!("simulated reservation processed");

    Json(json!({
        "success": true,
        "message": "Reserva procesada (simulada)",
        "data": {
            "bookingId": format!("sim-{}", now.timestamp_millis()),
            "status": "confirmed",
            "dateTime": format!("{}T{}:00.000Z", form.fecha.trim(), form.hora.trim()),
            "people": form.personas.trim().parse::<i64>().ok(),
            "guest": {
                "name": form.nombre,
                "phone": form.telefono,
            },
        },
        "simulation": true,
        "timestamp": now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_parse_json_form() {
        let form = parse_form(
            &headers("application/json"),
            br#"{"nombre":"Ana","telefono":"+56911112222","personas":"2"}"#,
        )
        .unwrap();
        assert_eq!(form.nombre, "Ana");
        assert_eq!(form.personas, "2");
    }

    #[test]
    fn test_parse_urlencoded_form() {
        let form = parse_form(
            &headers("application/x-www-form-urlencoded"),
            b"nombre=Juan+P%C3%A9rez&telefono=%2B56987654321&personas=4",
        )
        .unwrap();
        assert_eq!(form.nombre, "Juan Pérez");
        assert_eq!(form.telefono, "+56987654321");
        assert_eq!(form.personas, "4");
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse_form(&headers("application/json"), b"{nombre").unwrap_err();
        assert!(matches!(err, ProxyError::MalformedBody(_)));
    }

    #[test]
    fn test_empty_body_is_empty_form() {
        let form = parse_form(&HeaderMap::new(), b"").unwrap();
        assert_eq!(form, ReservationForm::default());
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    #[test]
    fn test_check_form_uses_given_today() {
        let form = ReservationForm::from_pairs([
            ("nombre", "Ana"),
            ("telefono", "+56911112222"),
            ("fecha", "2026-10-13"),
            ("hora", "20:00"),
            ("personas", "2"),
        ]);
        assert!(check_form(&form, NaiveDate::from_ymd_opt(2026, 10, 13).unwrap()).is_ok());
        assert!(matches!(check_form(&form, today()), Err(ProxyError::InvalidFields(_))));
    }

    #[test]
    fn test_check_form_order() {
        let mut form = ReservationForm::from_pairs([
            ("nombre", "Ana"),
            ("telefono", "12"),
            ("fecha", "2099-01-01"),
            ("hora", "20:00"),
        ]);
        assert!(matches!(check_form(&form, today()), Err(ProxyError::MissingFields(f)) if f.len() == 1));

        form.personas = "2".into();
        assert!(matches!(check_form(&form, today()), Err(ProxyError::InvalidPhone)));

        form.telefono = "+56911112222".into();
        form.personas = "40".into();
        assert!(matches!(check_form(&form, today()), Err(ProxyError::InvalidFields(_))));

        form.personas = "4".into();
        assert!(check_form(&form, today()).is_ok());
    }
}
