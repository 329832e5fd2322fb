// File: src/resos/mod.rs
// Purpose: resOS upstream booking provider

pub mod client;
pub mod error;

pub use client::{Booking, BookingFilter, BookingGuest, ProbeBody, ProbeReport, ResosClient};
pub use error::UpstreamError;
