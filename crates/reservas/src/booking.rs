// File: src/booking.rs
// Purpose: Reshape a validated reservation form into the body resOS expects

use crate::config::BookingConfig;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use reservas_validation::{parse_date, parse_party_size, parse_time, ReservationForm};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PLACEHOLDER_DOMAIN: &str = "placeholder.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("party size is not a whole number between 1 and 12: {0:?}")]
    InvalidPartySize(String),

    #[error("invalid reservation date or time: {0:?} {1:?}")]
    InvalidDateTime(String, String),

    #[error("local time {0} does not exist in the configured zone")]
    NonexistentLocalTime(NaiveDateTime),
}

/// Guest contact block of a resOS booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestContact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub notification_email: bool,
    pub notification_sms: bool,
}

/// Body of `POST /bookings`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBooking {
    pub guest: GuestContact,
    /// RFC 3339 UTC instant
    pub date_time: String,
    pub people: u32,
    pub source: String,
}

/// Zone in which guests' wall-clock times are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalZone {
    System,
    Fixed(FixedOffset),
}

impl LocalZone {
    /// The current calendar date in this zone
    pub fn today(&self) -> NaiveDate {
        self.today_at(Utc::now())
    }

    pub fn today_at(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            LocalZone::System => now.with_timezone(&Local).date_naive(),
            LocalZone::Fixed(offset) => now.with_timezone(offset).date_naive(),
        }
    }

    fn to_utc(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            LocalZone::System => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            LocalZone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingNormalizer {
    country_code: String,
    source: String,
    zone: LocalZone,
}

impl BookingNormalizer {
    pub fn new(country_code: impl Into<String>, source: impl Into<String>, zone: LocalZone) -> Self {
        Self {
            country_code: country_code.into(),
            source: source.into(),
            zone,
        }
    }

    pub fn from_config(config: &BookingConfig) -> Self {
        let zone = config
            .utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
            .map(LocalZone::Fixed)
            .unwrap_or(LocalZone::System);
        Self::new(&config.country_code, &config.source, zone)
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    /// Build the upstream body. `now` seeds the placeholder email when none was given.
    pub fn normalize(
        &self,
        form: &ReservationForm,
        now: DateTime<Utc>,
    ) -> Result<NormalizedBooking, BookingError> {
        let people = parse_party_size(&form.personas)
            .ok_or_else(|| BookingError::InvalidPartySize(form.personas.clone()))?;

        let date_time = self.start_instant(&form.fecha, &form.hora)?;

        let email = match form.email.trim() {
            "" => placeholder_email(&form.nombre, now),
            given => given.to_string(),
        };

        Ok(NormalizedBooking {
            guest: GuestContact {
                name: form.nombre.trim().to_string(),
                phone: self.format_phone(&form.telefono),
                email,
                notification_email: true,
                notification_sms: true,
            },
            date_time: date_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            people,
            source: self.source.clone(),
        })
    }

    /// Prefix the default country code unless the number already carries one
    pub fn format_phone(&self, phone: &str) -> String {
        let phone = phone.trim();
        if phone.starts_with('+') {
            phone.to_string()
        } else {
            format!("{}{}", self.country_code, phone)
        }
    }

    pub fn start_instant(&self, fecha: &str, hora: &str) -> Result<DateTime<Utc>, BookingError> {
        let invalid = || BookingError::InvalidDateTime(fecha.to_string(), hora.to_string());
        let date = parse_date(fecha).ok_or_else(invalid)?;
        let time = parse_time(hora).ok_or_else(invalid)?;
        let naive = date.and_time(time);
        self.zone
            .to_utc(naive)
            .ok_or(BookingError::NonexistentLocalTime(naive))
    }
}

impl Default for BookingNormalizer {
    fn default() -> Self {
        Self::from_config(&BookingConfig::default())
    }
}

/// Stand-in address for guests who left email blank: up to ten ASCII
/// alphanumerics of the name followed by the last four digits of `now` in
/// Unix milliseconds.
pub fn placeholder_email(name: &str, now: DateTime<Utc>) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(10)
        .collect();
    let millis = now.timestamp_millis().to_string();
    let suffix = &millis[millis.len().saturating_sub(4)..];
    format!("{}{}@{}", slug, suffix, PLACEHOLDER_DOMAIN)
}
