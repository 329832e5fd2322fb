// File: src/form.rs
// Purpose: Reservation form state (values, errors, submission status) and its
// transport to the booking proxy

use reqwest::header::CONTENT_TYPE;
use reservas_validation::{validate_field, validate_form, Field, ReservationForm};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub const FIX_ERRORS_MESSAGE: &str = "Por favor, corrige los errores en el formulario.";
pub const SUCCESS_MESSAGE: &str =
    "¡Reserva creada exitosamente! Te contactaremos pronto para confirmar.";
pub const FALLBACK_FAILURE_MESSAGE: &str = "Ocurrió un error al crear la reserva.";
pub const METHOD_NOT_ALLOWED_MESSAGE: &str =
    "Error: método no permitido. El formulario debe enviar POST.";
pub const UNEXPECTED_CONTENT_MESSAGE: &str =
    "Error del servidor. Verifica que estés usando el formulario correctamente.";
pub const CONNECTION_MESSAGE: &str = "Error de conexión. Verifica tu conexión a internet.";
pub const INVALID_JSON_MESSAGE: &str = "Error al procesar la respuesta del servidor.";

/// Outcome of the last submit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitStatus {
    #[default]
    None,
    Success,
    Error,
}

/// JSON body the proxy answers with
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProxyReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// A field → message map; older endpoints sent a plain list, which is ignored
    #[serde(default)]
    pub errors: Option<Value>,
}

impl ProxyReply {
    fn field_errors(&self) -> BTreeMap<Field, String> {
        self.errors
            .as_ref()
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(key, value)| {
                        let field = key.parse::<Field>().ok()?;
                        let message = value.as_str().filter(|m| !m.is_empty())?;
                        Some((field, message.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    pub status: u16,
    pub body: ProxyReply,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("could not reach the reservation endpoint: {0}")]
    Connection(String),

    #[error("unexpected response content type: {0}")]
    UnexpectedContentType(String),

    #[error("reservation endpoint returned invalid JSON: {0}")]
    InvalidJson(String),
}

/// Carries a submitted form to the booking proxy
pub trait BookingGateway {
    fn send(
        &self,
        form: &ReservationForm,
    ) -> impl Future<Output = Result<GatewayReply, GatewayError>> + Send;
}

/// Posts the form as JSON to the proxy endpoint
#[derive(Debug, Clone)]
pub struct HttpGateway {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }
}

impl BookingGateway for HttpGateway {
    async fn send(&self, form: &ReservationForm) -> Result<GatewayReply, GatewayError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(form)
            .send()
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/json") {
            return Err(GatewayError::UnexpectedContentType(content_type));
        }

        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        let body = serde_json::from_str(&text).map_err(|e| GatewayError::InvalidJson(e.to_string()))?;

        Ok(GatewayReply { status, body })
    }
}

/// Whether a submit is in flight. Clones share the same flag, so a view can
/// keep one and read it while `submit` is awaiting the gateway.
#[derive(Debug, Clone, Default)]
pub struct SubmitFlag(Arc<AtomicBool>);

impl SubmitFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn raise(&self) -> SubmitGuard {
        self.0.store(true, Ordering::Release);
        SubmitGuard(self.clone())
    }
}

/// Lowers the flag when dropped: on completion, on panic, or when the submit
/// future is cancelled
struct SubmitGuard(SubmitFlag);

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        (self.0).0.store(false, Ordering::Release);
    }
}

/// State behind the reservation form.
///
/// The submitting flag is advisory: the view is expected to disable its submit
/// control while it is set. Nothing here prevents a second submit.
#[derive(Debug, Default)]
pub struct FormController {
    form: ReservationForm,
    errors: BTreeMap<Field, String>,
    submitting: SubmitFlag,
    status: SubmitStatus,
    message: String,
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &ReservationForm {
        &self.form
    }

    pub fn errors(&self) -> &BTreeMap<Field, String> {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    /// A handle that stays readable while `submit` holds `&mut self`
    pub fn submitting_flag(&self) -> SubmitFlag {
        self.submitting.clone()
    }

    pub fn status(&self) -> SubmitStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Overwrite a field and clear its error until the next validation
    pub fn update_field(&mut self, field: Field, value: impl Into<String>) {
        self.form.set(field, value);
        self.errors.remove(&field);
    }

    /// Live feedback for one field; records or clears its error
    pub fn validate_field(&mut self, field: Field, value: &str) -> bool {
        match validate_field(field, value) {
            Ok(()) => {
                self.errors.remove(&field);
                true
            }
            Err(message) => {
                self.errors.insert(field, message.to_string());
                false
            }
        }
    }

    /// Validate every field, replacing the stored errors
    pub fn validate_form(&mut self) -> bool {
        let result = validate_form(&self.form);
        self.errors = result
            .errors
            .into_iter()
            .map(|(field, message)| (field, message.to_string()))
            .collect();
        result.is_valid
    }

    /// Validate, then send through `gateway`. An invalid form never reaches it.
    pub async fn submit<G: BookingGateway>(&mut self, gateway: &G) -> SubmitStatus {
        if !self.validate_form() {
            self.status = SubmitStatus::Error;
            self.message = FIX_ERRORS_MESSAGE.to_string();
            return self.status;
        }

        let guard = self.submitting.raise();
        self.status = SubmitStatus::None;
        self.message.clear();

        let outcome = gateway.send(&self.form).await;
        self.apply(outcome);

        drop(guard);
        self.status
    }

    fn apply(&mut self, outcome: Result<GatewayReply, GatewayError>) {
        match outcome {
            Ok(reply) if (200..300).contains(&reply.status) && reply.body.success => {
                self.status = SubmitStatus::Success;
                self.message = SUCCESS_MESSAGE.to_string();
                self.form = ReservationForm::default();
            }
            Ok(reply) => {
                self.status = SubmitStatus::Error;
                self.message = if reply.status == 405 {
                    METHOD_NOT_ALLOWED_MESSAGE.to_string()
                } else {
                    reply
                        .body
                        .message
                        .clone()
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| FALLBACK_FAILURE_MESSAGE.to_string())
                };
                self.errors.extend(reply.body.field_errors());
            }
            Err(err) => {
                self.status = SubmitStatus::Error;
                self.message = match err {
                    GatewayError::Connection(_) => CONNECTION_MESSAGE,
                    GatewayError::UnexpectedContentType(_) => UNEXPECTED_CONTENT_MESSAGE,
                    GatewayError::InvalidJson(_) => INVALID_JSON_MESSAGE,
                }
                .to_string();
            }
        }
    }

    /// Back to the freshly mounted state. Handles from `submitting_flag` stay valid.
    pub fn reset(&mut self) {
        *self = Self {
            submitting: self.submitting.clone(),
            ..Self::default()
        };
    }

    pub fn has_errors(&self) -> bool {
        self.errors.values().any(|e| !e.is_empty())
    }

    pub fn is_form_complete(&self) -> bool {
        self.form.is_complete()
    }
}
