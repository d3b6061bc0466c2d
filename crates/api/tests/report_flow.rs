use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::Router;
use chrono::{DateTime, Utc};
use common::config::VerificationConfig;
use common::geo::Coordinates;
use common::text::EstablishmentKey;
use db::errors::Result as DbResult;
use db::{
    BusinessRepository, BusinessRow, NewBusiness, Repositories, ReportQuery, ReportRepository,
    ReportRow,
};
use geocode::{GeocodeError, Geocoder};
use intake::IntakePipeline;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;
use verification::ProximityVerifier;

use api::{build_router, ApiState};

// --- Test doubles for the repository traits and the geocoder ---

#[derive(Default)]
struct MemoryStore {
    reports: Mutex<Vec<ReportRow>>,
    businesses: Mutex<Vec<BusinessRow>>,
}

impl MemoryStore {
    fn seed_business(&self, business: BusinessRow) {
        self.businesses.lock().expect("lock").push(business);
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn insert(&self, report: ReportRow) -> DbResult<()> {
        self.reports.lock().expect("lock").push(report);
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ReportRow>> {
        Ok(self
            .reports
            .lock()
            .expect("lock")
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn query(&self, query: ReportQuery) -> DbResult<Vec<ReportRow>> {
        let rows = self
            .reports
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| match &query.tier {
                Some(tier) => &r.authenticity_tier == tier,
                None => true,
            })
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn count_by_reporter(
        &self,
        reporter_email_norm: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<i64> {
        Ok(self
            .reports
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| {
                r.reporter_email_norm == reporter_email_norm
                    && r.created_at >= since
                    && r.created_at < until
            })
            .count() as i64)
    }

    async fn establishments_by_reporter(
        &self,
        reporter_email_norm: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<EstablishmentKey>> {
        let mut pairs: Vec<EstablishmentKey> = self
            .reports
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| {
                r.reporter_email_norm == reporter_email_norm
                    && r.created_at >= since
                    && r.created_at < until
            })
            .map(|r| {
                EstablishmentKey::from_normalized(
                    r.business_name_norm.clone(),
                    r.business_address_norm.clone(),
                )
            })
            .collect();
        pairs.sort();
        pairs.dedup();
        Ok(pairs)
    }

    async fn count_for_establishment(
        &self,
        establishment: &EstablishmentKey,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<i64> {
        Ok(self
            .reports
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| {
                r.business_name_norm == establishment.name
                    && r.business_address_norm == establishment.address
                    && r.created_at >= since
                    && r.created_at < until
            })
            .count() as i64)
    }
}

#[async_trait]
impl BusinessRepository for MemoryStore {
    async fn create(&self, business: NewBusiness) -> DbResult<BusinessRow> {
        let mut businesses = self.businesses.lock().expect("lock");
        let row = BusinessRow {
            id: businesses.len() as i64 + 1,
            name: business.name,
            address: business.address,
            latitude: business.latitude,
            longitude: business.longitude,
            created_at: Utc::now(),
        };
        businesses.push(row.clone());
        Ok(row)
    }

    async fn get_by_id(&self, id: i64) -> DbResult<Option<BusinessRow>> {
        Ok(self
            .businesses
            .lock()
            .expect("lock")
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn set_coordinates(&self, id: i64, latitude: f64, longitude: f64) -> DbResult<()> {
        let mut businesses = self.businesses.lock().expect("lock");
        if let Some(business) = businesses.iter_mut().find(|b| b.id == id) {
            business.latitude = Some(latitude);
            business.longitude = Some(longitude);
        }
        Ok(())
    }
}

struct TestRepos {
    store: Arc<MemoryStore>,
}

impl Repositories for TestRepos {
    fn reports(&self) -> &dyn ReportRepository {
        &*self.store
    }
    fn businesses(&self) -> &dyn BusinessRepository {
        &*self.store
    }
}

struct NoResultsGeocoder;

#[async_trait]
impl Geocoder for NoResultsGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        Err(GeocodeError::NoResults(address.to_string()))
    }
}

fn setup_app(store: Arc<MemoryStore>) -> Router {
    let repositories: Arc<dyn Repositories> = Arc::new(TestRepos { store });
    let verifier = Arc::new(ProximityVerifier::new(
        repositories.clone(),
        Arc::new(NoResultsGeocoder),
        VerificationConfig::default(),
    ));
    let pipeline = Arc::new(IntakePipeline::new(repositories.clone()));
    let state = Arc::new(ApiState {
        repositories,
        pipeline,
        verifier,
        metrics_path: "/metrics",
    });
    build_router(state)
}

fn business(id: i64, lat: Option<f64>, lng: Option<f64>, address: &str) -> BusinessRow {
    BusinessRow {
        id,
        name: "Cafe One".to_string(),
        address: address.to_string(),
        latitude: lat,
        longitude: lng,
        created_at: Utc::now(),
    }
}

async fn post_json(app: &Router, path: &str, body: Value) -> (u16, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status().as_u16();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn unresolvable_address_still_stores_a_low_tier_report() {
    let store = Arc::new(MemoryStore::default());
    // No registered coordinates and a geocoder with no answers.
    store.seed_business(business(1, None, None, "Nowhere Lane 99, Atlantis"));
    let app = setup_app(store.clone());

    // The client runs verification first and gets a distinguishable failure.
    let (status, body) = post_json(
        &app,
        "/verify-location",
        json!({ "business_id": 1, "reporter_lat": 40.0, "reporter_lng": -75.0 }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("no geocoding results"));

    // The submission goes through anyway, tagged and down-ranked.
    let (status, body) = post_json(
        &app,
        "/reports",
        json!({
            "business_name": "Cafe One",
            "business_address": "Nowhere Lane 99, Atlantis",
            "complaint_description": "noise after hours",
            "reporter_email": "alice@example.com",
            "business_id": 1,
            "location_verification_tag": "Failed Location Verification",
            "certification_accepted": true
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["tags"]
        .as_array()
        .unwrap()
        .contains(&json!("Failed Location Verification")));
    assert_eq!(body["authenticity_tier"], json!("Low"));
    assert!(body["authenticity_level"].as_i64().unwrap() <= 25);
    assert_eq!(body["status"], json!("Submitted"));

    // Reviewers find it in the Low bucket.
    let response = app
        .clone()
        .oneshot(Request::get("/reports?tier=Low").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_success());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let listed: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn registered_coordinates_verify_a_nearby_reporter() {
    let store = Arc::new(MemoryStore::default());
    store.seed_business(business(1, Some(40.0), Some(-75.0), "12 Main St, Springfield"));
    let app = setup_app(store);

    // 0.00135 degrees of latitude is roughly 150 meters.
    let (status, body) = post_json(
        &app,
        "/verify-location",
        json!({ "business_id": 1, "reporter_lat": 40.00135, "reporter_lng": -75.0 }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["tag"], json!("Location Verified"));
    assert_eq!(body["threshold_meters"], json!(200.0));
    let distance = body["distance_meters"].as_f64().unwrap();
    assert!((distance - 150.1).abs() < 1.5, "expected ~150m, got {distance}");
    assert_eq!(body["business_coords"]["lat"], json!(40.0));
}

#[tokio::test]
async fn distant_reporter_gets_the_failed_tag() {
    let store = Arc::new(MemoryStore::default());
    store.seed_business(business(1, Some(40.0), Some(-75.0), "12 Main St, Springfield"));
    let app = setup_app(store);

    let (status, body) = post_json(
        &app,
        "/verify-location",
        json!({ "business_id": 1, "reporter_lat": 40.00225, "reporter_lng": -75.0 }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["tag"], json!("Failed Location Verification"));
}

#[tokio::test]
async fn invalid_reporter_coordinates_are_rejected() {
    let store = Arc::new(MemoryStore::default());
    store.seed_business(business(1, Some(40.0), Some(-75.0), "12 Main St, Springfield"));
    let app = setup_app(store);

    let (status, body) = post_json(
        &app,
        "/verify-location",
        json!({ "business_id": 1, "reporter_lat": 95.0, "reporter_lng": -75.0 }),
    )
    .await;

    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("out of range"));
}

#[tokio::test]
async fn unknown_business_is_a_not_found() {
    let store = Arc::new(MemoryStore::default());
    let app = setup_app(store);

    let (status, _) = post_json(
        &app,
        "/verify-location",
        json!({ "business_id": 42, "reporter_lat": 40.0, "reporter_lng": -75.0 }),
    )
    .await;

    assert_eq!(status, 404);
}

#[tokio::test]
async fn invalid_submission_is_rejected_without_a_row() {
    let store = Arc::new(MemoryStore::default());
    let app = setup_app(store.clone());

    let (status, body) = post_json(
        &app,
        "/reports",
        json!({
            "business_name": "Cafe One",
            "business_address": "1 First St",
            "complaint_description": "noise after hours",
            "reporter_email": "not-an-email",
            "certification_accepted": true
        }),
    )
    .await;

    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("reporter email"));
    assert!(store.reports.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn business_registration_round_trip() {
    let store = Arc::new(MemoryStore::default());
    let app = setup_app(store);

    let (status, body) = post_json(
        &app,
        "/businesses",
        json!({ "name": "Cafe Two", "address": "2 Second St", "latitude": 40.0, "longitude": -75.0 }),
    )
    .await;
    assert_eq!(status, 200);
    let id = body["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/businesses/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_success());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let fetched: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(fetched["name"], json!("Cafe Two"));
    assert_eq!(fetched["latitude"], json!(40.0));
}
