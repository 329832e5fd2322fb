// File: src/proxy/mod.rs
// Purpose: Booking proxy between the reservation form and resOS

pub mod handler;
pub mod response;

pub use handler::{parse_form, router, ProxyState, RESERVATIONS_PATH, SIMULATED_PATH};
pub use response::{BookingEnvelope, ConfirmedBooking, ConfirmedGuest, ErrorBody, ProxyError};
