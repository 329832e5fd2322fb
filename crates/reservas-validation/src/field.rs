// File: src/field.rs
// Purpose: Reservation form fields and the raw form payload

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// A reservation form field, named as it travels on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Nombre,
    Telefono,
    Fecha,
    Hora,
    Personas,
    Email,
}

impl Field {
    /// Every field, in form order
    pub const ALL: [Field; 6] = [
        Field::Nombre,
        Field::Telefono,
        Field::Fecha,
        Field::Hora,
        Field::Personas,
        Field::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Nombre => "nombre",
            Field::Telefono => "telefono",
            Field::Fecha => "fecha",
            Field::Hora => "hora",
            Field::Personas => "personas",
            Field::Email => "email",
        }
    }

    /// Email is the only optional field
    pub fn is_required(&self) -> bool {
        !matches!(self, Field::Email)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reservation field: {}", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Raw values entered by the guest, all kept as strings until submit
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct ReservationForm {
    #[serde(default, deserialize_with = "lenient_string")]
    pub nombre: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub telefono: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fecha: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hora: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub personas: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
}

impl ReservationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a form from decoded key/value pairs, ignoring unknown keys
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            if let Ok(field) = key.as_ref().parse::<Field>() {
                form.set(field, value);
            }
        }
        form
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Nombre => &self.nombre,
            Field::Telefono => &self.telefono,
            Field::Fecha => &self.fecha,
            Field::Hora => &self.hora,
            Field::Personas => &self.personas,
            Field::Email => &self.email,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Nombre => &mut self.nombre,
            Field::Telefono => &mut self.telefono,
            Field::Fecha => &mut self.fecha,
            Field::Hora => &mut self.hora,
            Field::Personas => &mut self.personas,
            Field::Email => &mut self.email,
        };
        *slot = value.into();
    }

    /// True when every field, optional email included, holds a value
    pub fn is_complete(&self) -> bool {
        Field::ALL.iter().all(|field| !self.get(*field).is_empty())
    }

    /// Required fields left empty
    pub fn missing_required(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| field.is_required() && self.get(*field).trim().is_empty())
            .collect()
    }
}

/// Accept strings, numbers and null for any form field.
/// Browsers and scripts disagree on whether `personas` is `"4"` or `4`.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Int(n)) => n.to_string(),
        Some(Raw::Float(n)) => n.to_string(),
        Some(Raw::Bool(b)) => b.to_string(),
        None => String::new(),
    })
}
