pub mod client;
pub mod error;

pub use client::{Geocoder, NominatimGeocoder};
pub use error::GeocodeError;
