use geocode::GeocodeError;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("business {0} not found")]
    BusinessNotFound(i64),
    #[error("business address too short to geocode: '{0}'")]
    UnresolvableAddress(String),
    #[error("geocoding failed: {0}")]
    Geocoding(#[from] GeocodeError),
    #[error("store error: {0}")]
    Store(#[from] db::DbError),
}

impl VerifyError {
    /// True for the "cannot resolve coordinates" class of failures, which a
    /// submission absorbs as `Failed Location Verification` instead of
    /// propagating. Input and store errors are not absorbable.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            VerifyError::UnresolvableAddress(_) | VerifyError::Geocoding(_)
        )
    }
}
