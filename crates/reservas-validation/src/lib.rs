// reservas-validation
// Pure field rules shared by the reservation form and the booking proxy

pub mod field;
pub mod rules;

pub use field::{Field, ReservationForm, UnknownField};
pub use rules::{
    is_valid_email, is_valid_phone, parse_date, parse_party_size, parse_time, validate_field,
    validate_field_on, validate_form, validate_form_on, FormValidation,
};
