use serde::Deserialize;

/// Submission payload as assembled by the intake form. The classification
/// engine consumes `business_name`, `business_address`, `reporter_email`,
/// `business_id` and `location_verification_tag`; the rest is stored opaquely.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSubmission {
    pub business_name: String,
    pub business_address: String,
    pub complaint_description: String,
    pub reporter_email: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub business_id: Option<i64>,
    #[serde(default)]
    pub location: Option<DeviceLocation>,
    #[serde(default)]
    pub pinned_location: Option<PinnedLocation>,
    /// Result tag of a proximity verification the client ran before
    /// submitting, as its canonical string.
    #[serde(default)]
    pub location_verification_tag: Option<String>,
    #[serde(default)]
    pub certification_accepted: bool,
}

/// Device-captured reporter position.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub timestamp_ms: i64,
}

/// Reporter-confirmed map pin.
#[derive(Debug, Clone, Deserialize)]
pub struct PinnedLocation {
    pub latitude: f64,
    pub longitude: f64,
}
