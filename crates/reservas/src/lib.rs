// reservas - restaurant reservations forwarded to resOS
// Form controller, booking normalization and the server-side booking proxy

pub mod booking;
pub mod config;
pub mod form;
pub mod proxy;
pub mod resos;

pub use booking::{BookingError, BookingNormalizer, LocalZone, NormalizedBooking, placeholder_email};
pub use config::{Config, Environment};
pub use form::{BookingGateway, FormController, HttpGateway, SubmitFlag, SubmitStatus};
pub use proxy::{router, ProxyError, ProxyState};
pub use resos::{Booking, BookingFilter, ResosClient, UpstreamError};

// Re-export the shared field rules
pub use reservas_validation as validation;
pub use reservas_validation::{Field, ReservationForm};
