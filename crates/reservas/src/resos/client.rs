// File: src/resos/client.rs
// Purpose: Async client for the resOS bookings API

use super::error::UpstreamError;
use crate::booking::NormalizedBooking;
use crate::config::ResosConfig;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const BOOKINGS: &str = "/bookings";

// Ids are escaped so a '/' or '?' cannot leave the booking resource
fn booking_path(id: &str) -> String {
    format!("{}/{}", BOOKINGS, urlencoding::encode(id))
}

// Longest upstream error text echoed into an error message
const ERROR_TEXT_LIMIT: usize = 200;

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// A booking as resOS reports it back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub people: Option<u32>,
    #[serde(default)]
    pub guest: BookingGuest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingGuest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Filters for listing bookings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub date: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
}

impl BookingFilter {
    /// Query parameters in the form resOS expects: conditions are folded
    /// into one comma-separated `customQuery`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let conditions: Vec<String> = [
            self.date.as_ref().map(|d| format!("dateTime:\"{}\"", d)),
            self.status.as_ref().map(|s| format!("status:\"{}\"", s)),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut pairs = Vec::new();
        if !conditions.is_empty() {
            pairs.push(("customQuery", conditions.join(",")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("skip", skip.to_string()));
        }
        pairs
    }
}

/// What a diagnostic request to resOS came back with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ProbeBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeBody {
    Json,
    Html,
    Other,
}

impl ProbeReport {
    pub fn is_healthy(&self) -> bool {
        (200..300).contains(&self.status) && self.body == ProbeBody::Json
    }
}

#[derive(Clone)]
pub struct ResosClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for ResosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResosClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ResosClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ResosConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(UpstreamError::Client)?;

        Ok(Self {
            http,
            ..Self::new(&config.base_url, &config.api_key)
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /bookings`
    pub async fn create_booking(&self, booking: &NormalizedBooking) -> Result<Booking> {
        let request = self.request(Method::POST, BOOKINGS).json(booking);
        self.send(request).await
    }

    /// `GET /bookings/{id}`
    pub async fn get_booking(&self, id: &str) -> Result<Booking> {
        let request = self.request(Method::GET, &booking_path(id));
        self.send(request).await
    }

    /// `GET /bookings` with optional filters
    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let request = self
            .request(Method::GET, BOOKINGS)
            .query(&filter.query_pairs());
        self.send(request).await
    }

    /// `PUT /bookings/{id}` with a partial update body
    pub async fn update_booking(&self, id: &str, update: &Value) -> Result<Booking> {
        let request = self
            .request(Method::PUT, &booking_path(id))
            .json(update);
        self.send(request).await
    }

    /// Hit `GET /bookings` and report how the API answered instead of failing
    /// on a bad status. Only transport errors are returned as `Err`.
    pub async fn probe(&self) -> Result<ProbeReport> {
        let response = self
            .request(Method::GET, BOOKINGS)
            .query(&[("limit", "1")])
            .send()
            .await
            .map_err(UpstreamError::Connection)?;

        let status = response.status().as_u16();
        let content_type = content_type(&response);
        let text = response.text().await.map_err(UpstreamError::Connection)?;

        let body = if serde_json::from_str::<Value>(&text).is_ok() {
            ProbeBody::Json
        } else if text.contains("<!DOCTYPE") || text.contains("<html") {
            ProbeBody::Html
        } else {
            ProbeBody::Other
        };

        Ok(ProbeReport {
            status,
            content_type,
            body,
        })
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, endpoint))
            .basic_auth(&self.api_key, Some(""))
            .header(ACCEPT, "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(UpstreamError::Connection)?;
        let status = response.status();
        let content_type = content_type(&response);
        let is_json = content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"));

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(status.as_u16(), is_json, &text);
            return Err(UpstreamError::from_status(status.as_u16(), message));
        }

        if !is_json {
            return Err(UpstreamError::NonJson {
                content_type: content_type.unwrap_or_else(|| "unknown".to_string()),
            });
        }

        let text = response.text().await.map_err(UpstreamError::Connection)?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Pull a readable message out of an error body: the JSON `message` or
/// `error` field, else a short prefix of the text body.
fn error_message(status: u16, is_json: bool, body: &str) -> String {
    let fallback = format!("HTTP {}", status);

    if is_json {
        return serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "error"]
                    .iter()
                    .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or(fallback);
    }

    let body = body.trim();
    if body.is_empty() || body.len() >= 500 {
        return fallback;
    }
    let snippet: String = body.chars().take(ERROR_TEXT_LIMIT).collect();
    format!("{}: {}", fallback, snippet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::GuestContact;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const AUTH: &str = "Basic dGVzdC1rZXk6";

    fn client(server: &Server) -> ResosClient {
        ResosClient::new(server.url(), "test-key")
    }

    fn booking() -> NormalizedBooking {
        NormalizedBooking {
            guest: GuestContact {
                name: "Juan Pérez".into(),
                phone: "+56987654321".into(),
                email: "juan@example.com".into(),
                notification_email: true,
                notification_sms: true,
            },
            date_time: "2099-01-01T22:30:00.000Z".into(),
            people: 4,
            source: "website".into(),
        }
    }

    #[tokio::test]
    async fn test_create_booking_sends_basic_auth_and_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bookings")
            .match_header("authorization", AUTH)
            .match_header("accept", "application/json")
            .match_body(Matcher::Json(serde_json::to_value(booking()).unwrap()))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "_id": "bk_1",
                    "status": "request",
                    "dateTime": "2099-01-01T22:30:00.000Z",
                    "people": 4,
                    "guest": {"name": "Juan Pérez", "phone": "+56987654321", "email": "juan@example.com"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let created = client(&server).create_booking(&booking()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(created.id, "bk_1");
        assert_eq!(created.people, Some(4));
        assert_eq!(created.guest.email.as_deref(), Some("juan@example.com"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_classified() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/bookings")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Invalid API key"}"#)
            .create_async()
            .await;

        let err = client(&server).create_booking(&booking()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unauthorized));
    }

    #[tokio::test]
    async fn test_rejection_carries_upstream_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/bookings")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"No tables available"}"#)
            .create_async()
            .await;

        let err = client(&server).create_booking(&booking()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Rejected(m) if m == "No tables available"));
    }

    #[tokio::test]
    async fn test_html_success_is_non_json() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/bookings")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<!DOCTYPE html><html><body>Login</body></html>")
            .create_async()
            .await;

        let err = client(&server).create_booking(&booking()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::NonJson { content_type } if content_type == "text/html"));
    }

    #[tokio::test]
    async fn test_html_error_body_is_truncated() {
        let mut server = Server::new_async().await;
        let body = format!("<html>{}</html>", "x".repeat(300));
        server
            .mock("GET", "/bookings/abc")
            .with_status(502)
            .with_header("content-type", "text/html")
            .with_body(body)
            .create_async()
            .await;

        let err = client(&server).get_booking("abc").await.unwrap_err();
        match err {
            UpstreamError::Status { status, message } => {
                assert_eq!(status, 502);
                assert!(message.starts_with("HTTP 502: <html>"));
                assert!(message.len() < 250);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_error() {
        let client = ResosClient::new("http://127.0.0.1:1", "test-key");
        let err = client.create_booking(&booking()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Connection(_)));
    }

    #[tokio::test]
    async fn test_list_bookings_builds_custom_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/bookings")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "customQuery".into(),
                    r#"dateTime:"2099-01-01",status:"approved""#.into(),
                ),
                Matcher::UrlEncoded("limit".into(), "10".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"_id":"a"},{"_id":"b","people":2}]"#)
            .create_async()
            .await;

        let filter = BookingFilter {
            date: Some("2099-01-01".into()),
            status: Some("approved".into()),
            limit: Some(10),
            skip: None,
        };
        let bookings = client(&server).list_bookings(&filter).await.unwrap();
        mock.assert_async().await;
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[1].people, Some(2));
    }

    #[tokio::test]
    async fn test_update_booking() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/bookings/bk_1")
            .match_body(Matcher::Json(json!({"people": 6})))
            .with_status(200)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_body(r#"{"_id":"bk_1","people":6}"#)
            .create_async()
            .await;

        let updated = client(&server)
            .update_booking("bk_1", &json!({"people": 6}))
            .await
            .unwrap();
        assert_eq!(updated.people, Some(6));
    }

    #[tokio::test]
    async fn test_booking_id_is_escaped() {
        let mut server = Server::new_async().await;
        let get = server
            .mock("GET", "/bookings/bk%2F1%3Fx%3D1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"_id":"bk/1?x=1","people":2}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/bookings/bk%2F1%3Fx%3D1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"_id":"bk/1?x=1","people":3}"#)
            .create_async()
            .await;

        let client = client(&server);
        let booking = client.get_booking("bk/1?x=1").await.unwrap();
        let updated = client
            .update_booking("bk/1?x=1", &json!({"people": 3}))
            .await
            .unwrap();

        get.assert_async().await;
        put.assert_async().await;
        assert_eq!(booking.people, Some(2));
        assert_eq!(updated.people, Some(3));
    }

    #[tokio::test]
    async fn test_probe_detects_html() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/bookings")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("content-type", "text/html")
            .with_body("<!DOCTYPE html><html></html>")
            .create_async()
            .await;

        let report = client(&server).probe().await.unwrap();
        assert_eq!(report.status, 403);
        assert_eq!(report.body, ProbeBody::Html);
        assert!(!report.is_healthy());
    }

    #[test]
    fn test_filter_without_conditions() {
        let filter = BookingFilter {
            skip: Some(20),
            ..BookingFilter::default()
        };
        assert_eq!(filter.query_pairs(), vec![("skip", "20".to_string())]);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ResosClient::new("https://api.resos.com/v1/", "k");
        assert_eq!(client.base_url(), "https://api.resos.com/v1");
    }
}
