// File: src/rules.rs
// Purpose: One rule per reservation field, plus the whole-form validator

use crate::field::{Field, ReservationForm};
use chrono::{Local, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PARTY_SIZE: u32 = 1;
pub const MAX_PARTY_SIZE: u32 = 12;

pub const NAME_TOO_SHORT: &str = "El nombre debe tener al menos 2 caracteres";
pub const PHONE_REQUIRED: &str = "El teléfono es obligatorio";
pub const PHONE_INVALID: &str = "Formato de teléfono inválido";
pub const DATE_REQUIRED: &str = "La fecha es obligatoria";
pub const DATE_INVALID: &str = "La fecha no es válida";
pub const DATE_IN_PAST: &str = "La fecha no puede ser anterior a hoy";
pub const TIME_REQUIRED: &str = "La hora es obligatoria";
pub const TIME_INVALID: &str = "La hora no es válida";
pub const PARTY_SIZE_OUT_OF_RANGE: &str = "El número de personas debe estar entre 1 y 12";
pub const EMAIL_INVALID: &str = "El formato del email es inválido";

// Optional leading '+', then at least 8 digits, spaces, hyphens or parens
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?[0-9\s\-()]{8,}$").unwrap()
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap()
});

/// Loose phone shape check, not an E.164 validator
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

/// Basic `local@domain.tld` shape check
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Parse the party size as a whole number within the accepted range
pub fn parse_party_size(value: &str) -> Option<u32> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| (MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(n))
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parse a `HH:MM` wall-clock time (`HH:MM:SS` is tolerated)
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Validate one field against today's local date
pub fn validate_field(field: Field, value: &str) -> Result<(), &'static str> {
    validate_field_on(field, value, Local::now().date_naive())
}

/// Validate one field. `today` bounds the earliest bookable date, inclusive.
pub fn validate_field_on(field: Field, value: &str, today: NaiveDate) -> Result<(), &'static str> {
    match field {
        Field::Nombre => {
            if value.trim().chars().count() < MIN_NAME_LEN {
                return Err(NAME_TOO_SHORT);
            }
        }
        Field::Telefono => {
            if value.is_empty() {
                return Err(PHONE_REQUIRED);
            }
            if !is_valid_phone(value) {
                return Err(PHONE_INVALID);
            }
        }
        Field::Fecha => {
            if value.trim().is_empty() {
                return Err(DATE_REQUIRED);
            }
            let date = parse_date(value).ok_or(DATE_INVALID)?;
            if date < today {
                return Err(DATE_IN_PAST);
            }
        }
        Field::Hora => {
            if value.trim().is_empty() {
                return Err(TIME_REQUIRED);
            }
            parse_time(value).ok_or(TIME_INVALID)?;
        }
        Field::Personas => {
            parse_party_size(value).ok_or(PARTY_SIZE_OUT_OF_RANGE)?;
        }
        Field::Email => {
            if !value.is_empty() && !is_valid_email(value) {
                return Err(EMAIL_INVALID);
            }
        }
    }
    Ok(())
}

/// Outcome of validating every field of a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormValidation {
    pub is_valid: bool,
    pub errors: BTreeMap<Field, &'static str>,
}

impl FormValidation {
    pub fn error(&self, field: Field) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }
}

pub fn validate_form(form: &ReservationForm) -> FormValidation {
    validate_form_on(form, Local::now().date_naive())
}

pub fn validate_form_on(form: &ReservationForm, today: NaiveDate) -> FormValidation {
    let errors: BTreeMap<Field, &'static str> = Field::ALL
        .into_iter()
        .filter_map(|field| {
            validate_field_on(field, form.get(field), today)
                .err()
                .map(|message| (field, message))
        })
        .collect();

    FormValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}
