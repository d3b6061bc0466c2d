use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use classification::spam::{
    establishment_volume_window, evaluate_spam, reporter_breadth_window, reporter_volume_window,
    SpamSignals,
};
use classification::{classify_tier, Tag, TagSet};
use common::geo::Coordinates;
use common::text::{normalize_email, EstablishmentKey};
use db::{DbError, Repositories, ReportRow};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::metrics;
use crate::submission::ReportSubmission;

const DEFAULT_SCORE: i32 = 100;
const INITIAL_STATUS: &str = "Submitted";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("invalid regex")
});

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("invalid submission: {0}")]
    Invalid(String),
    #[error("store error: {0}")]
    Store(#[from] DbError),
}

/// Accepts candidate reports and persists them classified. Rule evaluation
/// reads committed rows, then the content and classification land in a single
/// insert, so no reader ever observes one without the other. Two in-flight
/// submissions can read the same committed snapshot and each stay under a
/// rule threshold the pair jointly crosses; the rules are advisory, not
/// access control, and the listing side sees the corrected count on the next
/// submission.
pub struct IntakePipeline {
    repositories: Arc<dyn Repositories>,
}

struct Candidate {
    submission: ReportSubmission,
    reporter_email_norm: String,
    establishment: EstablishmentKey,
    device: Option<(Coordinates, Option<f64>, DateTime<Utc>)>,
    pinned: Option<Coordinates>,
    tags: TagSet,
    created_at: DateTime<Utc>,
}

impl IntakePipeline {
    pub fn new(repositories: Arc<dyn Repositories>) -> Self {
        Self { repositories }
    }

    #[instrument(skip(self, submission), fields(business = %submission.business_name))]
    pub async fn submit(&self, submission: ReportSubmission) -> Result<ReportRow, IntakeError> {
        let candidate = validate(submission)?;

        let signals = self.gather_signals(&candidate).await?;
        let spam = evaluate_spam(&signals);

        let mut tags = candidate.tags.clone();
        for tag in &spam.tags {
            if tags.insert(*tag) {
                metrics::TAGS_EMITTED_TOTAL
                    .with_label_values(&[tag.as_str()])
                    .inc();
            }
        }

        let score = spam.capped_score(DEFAULT_SCORE);
        let (tier, score) = classify_tier(&tags, score);

        let row = into_row(candidate, &tags, score, tier.as_str());
        self.repositories.reports().insert(row.clone()).await?;

        metrics::REPORTS_SUBMITTED_TOTAL.inc();
        metrics::REPORTS_BY_TIER
            .with_label_values(&[tier.as_str()])
            .inc();
        info!(
            id = %row.id,
            tier = %tier,
            level = score,
            tags = ?row.tags,
            "report classified and stored"
        );

        Ok(row)
    }

    /// Windowed aggregates for the candidate, each window ending at its
    /// creation instant. The distinct-establishment set folds in the
    /// candidate's own pair; the two count rules exclude the candidate.
    async fn gather_signals(&self, candidate: &Candidate) -> Result<SpamSignals, DbError> {
        let reports = self.repositories.reports();
        let until = candidate.created_at;

        let reporter_reports_24h = reports
            .count_by_reporter(
                &candidate.reporter_email_norm,
                until - reporter_volume_window(),
                until,
            )
            .await?;

        let mut establishments: BTreeSet<EstablishmentKey> = reports
            .establishments_by_reporter(
                &candidate.reporter_email_norm,
                until - reporter_breadth_window(),
                until,
            )
            .await?
            .into_iter()
            .collect();
        establishments.insert(candidate.establishment.clone());

        let establishment_reports_7d = reports
            .count_for_establishment(
                &candidate.establishment,
                until - establishment_volume_window(),
                until,
            )
            .await?;

        Ok(SpamSignals {
            reporter_reports_24h,
            reporter_establishments_7d: establishments.len() as i64,
            establishment_reports_7d,
        })
    }
}

fn validate(submission: ReportSubmission) -> Result<Candidate, IntakeError> {
    let business_name = submission.business_name.trim();
    if business_name.is_empty() {
        return Err(IntakeError::Invalid("business name is required".into()));
    }
    if submission.business_address.trim().is_empty() {
        return Err(IntakeError::Invalid("business address is required".into()));
    }
    if submission.complaint_description.trim().is_empty() {
        return Err(IntakeError::Invalid(
            "complaint description is required".into(),
        ));
    }

    let reporter_email_norm = normalize_email(&submission.reporter_email);
    if !EMAIL_RE.is_match(&reporter_email_norm) {
        return Err(IntakeError::Invalid(format!(
            "invalid reporter email: '{}'",
            submission.reporter_email
        )));
    }

    let device = match &submission.location {
        Some(location) => {
            let coords = Coordinates::new(location.latitude, location.longitude)
                .map_err(|err| IntakeError::Invalid(err.to_string()))?;
            let captured_at = DateTime::<Utc>::from_timestamp_millis(location.timestamp_ms)
                .ok_or_else(|| {
                    IntakeError::Invalid(format!(
                        "invalid location timestamp: {}",
                        location.timestamp_ms
                    ))
                })?;
            Some((coords, location.accuracy, captured_at))
        }
        None => None,
    };

    let pinned = match &submission.pinned_location {
        Some(pin) => Some(
            Coordinates::new(pin.latitude, pin.longitude)
                .map_err(|err| IntakeError::Invalid(err.to_string()))?,
        ),
        None => None,
    };

    let mut tags = TagSet::new();
    if let Some(value) = &submission.location_verification_tag {
        let tag: Tag = value
            .parse()
            .map_err(|_| IntakeError::Invalid(format!("unknown verification tag: '{value}'")))?;
        if !matches!(tag, Tag::LocationVerified | Tag::FailedLocationVerification) {
            return Err(IntakeError::Invalid(format!(
                "'{value}' is not a location verification tag"
            )));
        }
        tags.insert(tag);
    }

    let establishment =
        EstablishmentKey::new(&submission.business_name, &submission.business_address);

    Ok(Candidate {
        reporter_email_norm,
        establishment,
        device,
        pinned,
        tags,
        created_at: Utc::now(),
        submission,
    })
}

fn into_row(candidate: Candidate, tags: &TagSet, level: i32, tier: &str) -> ReportRow {
    let Candidate {
        submission,
        reporter_email_norm,
        establishment,
        device,
        pinned,
        created_at,
        ..
    } = candidate;

    let (device_lat, device_lng, device_accuracy, device_captured_at) = match device {
        Some((coords, accuracy, captured_at)) => (
            Some(coords.latitude),
            Some(coords.longitude),
            accuracy,
            Some(captured_at),
        ),
        None => (None, None, None, None),
    };

    ReportRow {
        id: Uuid::new_v4(),
        business_id: submission.business_id,
        business_name: submission.business_name,
        business_address: submission.business_address,
        description: submission.complaint_description,
        reporter_email: submission.reporter_email,
        reporter_email_norm,
        business_name_norm: establishment.name,
        business_address_norm: establishment.address,
        image_urls: submission.images,
        document_urls: submission.documents,
        device_lat,
        device_lng,
        device_accuracy,
        device_captured_at,
        pinned_lat: pinned.map(|c| c.latitude),
        pinned_lng: pinned.map(|c| c.longitude),
        tags: tags.to_strings(),
        authenticity_level: level,
        authenticity_tier: tier.to_string(),
        status: INITIAL_STATUS.to_string(),
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::DeviceLocation;

    fn submission() -> ReportSubmission {
        ReportSubmission {
            business_name: "Cafe One".to_string(),
            business_address: "1 First St".to_string(),
            complaint_description: "noise after hours".to_string(),
            reporter_email: "Reporter@Example.com".to_string(),
            images: vec![],
            documents: vec![],
            business_id: None,
            location: None,
            pinned_location: None,
            location_verification_tag: None,
            certification_accepted: true,
        }
    }

    #[test]
    fn validation_normalizes_reporter_email() {
        let candidate = validate(submission()).expect("valid");
        assert_eq!(candidate.reporter_email_norm, "reporter@example.com");
    }

    #[test]
    fn validation_rejects_missing_fields() {
        let mut s = submission();
        s.business_name = "  ".to_string();
        assert!(matches!(validate(s), Err(IntakeError::Invalid(_))));

        let mut s = submission();
        s.reporter_email = "not-an-email".to_string();
        assert!(matches!(validate(s), Err(IntakeError::Invalid(_))));
    }

    #[test]
    fn validation_rejects_out_of_range_device_coordinates() {
        let mut s = submission();
        s.location = Some(DeviceLocation {
            latitude: 95.0,
            longitude: 0.0,
            accuracy: None,
            timestamp_ms: 1_700_000_000_000,
        });
        assert!(matches!(validate(s), Err(IntakeError::Invalid(_))));
    }

    #[test]
    fn validation_accepts_only_proximity_tags() {
        let mut s = submission();
        s.location_verification_tag = Some("Location Verified".to_string());
        let candidate = validate(s).expect("valid");
        assert!(candidate.tags.contains(Tag::LocationVerified));

        let mut s = submission();
        s.location_verification_tag = Some("Existing Case".to_string());
        assert!(matches!(validate(s), Err(IntakeError::Invalid(_))));

        let mut s = submission();
        s.location_verification_tag = Some("garbage".to_string());
        assert!(matches!(validate(s), Err(IntakeError::Invalid(_))));
    }
}
