use chrono::{DateTime, Utc};
use common::geo::Coordinates;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A complaint report as persisted. Classification fields (`tags`,
/// `authenticity_level`, `authenticity_tier`) are written exactly once by the
/// intake pipeline, in the same insert as the content; readers never observe
/// one without the other.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub business_id: Option<i64>,
    pub business_name: String,
    pub business_address: String,
    pub description: String,
    pub reporter_email: String,
    pub reporter_email_norm: String,
    pub business_name_norm: String,
    pub business_address_norm: String,
    pub image_urls: Vec<String>,
    pub document_urls: Vec<String>,
    pub device_lat: Option<f64>,
    pub device_lng: Option<f64>,
    pub device_accuracy: Option<f64>,
    pub device_captured_at: Option<DateTime<Utc>>,
    pub pinned_lat: Option<f64>,
    pub pinned_lng: Option<f64>,
    pub tags: Vec<String>,
    pub authenticity_level: i32,
    pub authenticity_tier: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BusinessRow {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl BusinessRow {
    /// Registered coordinates, when both components are present and in range.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Coordinates::new(lat, lng).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    pub tier: Option<String>,
    pub reporter_email: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}
