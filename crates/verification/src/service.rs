use std::sync::Arc;

use classification::Tag;
use common::config::VerificationConfig;
use common::geo::{haversine_distance_meters, Coordinates};
use db::{BusinessRow, Repositories};
use geocode::Geocoder;
use tracing::{info, instrument, warn};

use crate::error::VerifyError;

/// Outcome of a successful proximity check. `tag` is what the client attaches
/// to its candidate report before submission.
#[derive(Debug, Clone)]
pub struct Verification {
    pub tag: Tag,
    pub distance_meters: f64,
    pub threshold_meters: f64,
    pub business_coords: Coordinates,
}

/// Classifies reporter distance against the reported business. Geocoding is
/// the only network call in the engine and happens here, before submission,
/// so the intake transaction never waits on I/O.
pub struct ProximityVerifier {
    repositories: Arc<dyn Repositories>,
    geocoder: Arc<dyn Geocoder>,
    config: VerificationConfig,
}

impl ProximityVerifier {
    pub fn new(
        repositories: Arc<dyn Repositories>,
        geocoder: Arc<dyn Geocoder>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            repositories,
            geocoder,
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn verify(
        &self,
        business_id: i64,
        reporter: Coordinates,
        threshold_meters: Option<f64>,
    ) -> Result<Verification, VerifyError> {
        let threshold = threshold_meters.unwrap_or(self.config.threshold_meters);

        let business = self
            .repositories
            .businesses()
            .get_by_id(business_id)
            .await?
            .ok_or(VerifyError::BusinessNotFound(business_id))?;

        let business_coords = self.resolve_coordinates(&business).await?;
        let distance = haversine_distance_meters(reporter, business_coords);
        let tag = if distance <= threshold {
            Tag::LocationVerified
        } else {
            Tag::FailedLocationVerification
        };

        info!(
            business_id,
            distance_meters = distance,
            threshold_meters = threshold,
            tag = %tag,
            "proximity check complete"
        );

        Ok(Verification {
            tag,
            distance_meters: distance,
            threshold_meters: threshold,
            business_coords,
        })
    }

    /// Registered coordinates win; otherwise geocode the address and cache
    /// the result on the business. The cache write is best-effort and races
    /// with concurrent verifications last-write-wins.
    async fn resolve_coordinates(
        &self,
        business: &BusinessRow,
    ) -> Result<Coordinates, VerifyError> {
        if let Some(coords) = business.coordinates() {
            return Ok(coords);
        }

        let address = business.address.trim();
        if address.chars().count() < self.config.min_address_len {
            return Err(VerifyError::UnresolvableAddress(address.to_string()));
        }

        let coords = self.geocoder.geocode(address).await?;

        if let Err(err) = self
            .repositories
            .businesses()
            .set_coordinates(business.id, coords.latitude, coords.longitude)
            .await
        {
            warn!(
                business_id = business.id,
                error = %err,
                "failed to persist geocoded coordinates"
            );
        }

        Ok(coords)
    }
}
