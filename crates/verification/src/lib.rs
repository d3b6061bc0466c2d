pub mod error;
pub mod service;

pub use error::VerifyError;
pub use service::{ProximityVerifier, Verification};
