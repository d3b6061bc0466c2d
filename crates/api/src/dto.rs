use chrono::{DateTime, Utc};
use common::geo::Coordinates;
use db::models::{BusinessRow, ReportRow};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ReportDto {
    pub id: Uuid,
    pub business_id: Option<i64>,
    pub business_name: String,
    pub business_address: String,
    pub description: String,
    pub reporter_email: String,
    pub image_urls: Vec<String>,
    pub document_urls: Vec<String>,
    pub tags: Vec<String>,
    pub authenticity_level: i32,
    pub authenticity_tier: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReportRow> for ReportDto {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            business_id: row.business_id,
            business_name: row.business_name,
            business_address: row.business_address,
            description: row.description,
            reporter_email: row.reporter_email,
            image_urls: row.image_urls,
            document_urls: row.document_urls,
            tags: row.tags,
            authenticity_level: row.authenticity_level,
            authenticity_tier: row.authenticity_tier,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BusinessDto {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<BusinessRow> for BusinessDto {
    fn from(row: BusinessRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CoordsDto {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinates> for CoordsDto {
    fn from(coords: Coordinates) -> Self {
        Self {
            lat: coords.latitude,
            lng: coords.longitude,
        }
    }
}

/// Envelope for the synchronous proximity check. Resolution failures come
/// back as `ok: false` with a reason rather than an HTTP error: the client
/// still submits the report, tagged unverified.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum VerifyLocationResponse {
    Ok {
        ok: bool,
        tag: String,
        distance_meters: f64,
        threshold_meters: f64,
        business_coords: CoordsDto,
    },
    Failed {
        ok: bool,
        error: String,
    },
}

impl VerifyLocationResponse {
    pub fn success(verification: verification::Verification) -> Self {
        Self::Ok {
            ok: true,
            tag: verification.tag.as_str().to_string(),
            distance_meters: verification.distance_meters,
            threshold_meters: verification.threshold_meters,
            business_coords: verification.business_coords.into(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failed {
            ok: false,
            error: error.into(),
        }
    }
}
