#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("empty geocoding query")]
    EmptyQuery,
    #[error("no geocoding results for '{0}'")]
    NoResults(String),
    #[error("geocoder returned unparseable coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, GeocodeError>;
