use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::text::EstablishmentKey;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{BusinessRow, NewBusiness, ReportQuery, ReportRow};

/// Report store. The windowed count operations are the read side of the spam
/// pattern rules: each takes an explicit `[since, until)` bound so callers
/// control the window end (the candidate's creation instant) and tests can
/// pin time. All three observe committed rows only; see the race note on the
/// intake pipeline.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn insert(&self, report: ReportRow) -> Result<()>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<ReportRow>>;
    async fn query(&self, query: ReportQuery) -> Result<Vec<ReportRow>>;

    /// Reports filed by the given normalized reporter email in the window.
    async fn count_by_reporter(
        &self,
        reporter_email_norm: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64>;

    /// Distinct establishments reported by the given normalized reporter
    /// email in the window. Returns the keys rather than a count so the
    /// caller can fold the candidate's own establishment into the set.
    async fn establishments_by_reporter(
        &self,
        reporter_email_norm: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EstablishmentKey>>;

    /// Reports filed against the given establishment in the window.
    async fn count_for_establishment(
        &self,
        establishment: &EstablishmentKey,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64>;
}

#[async_trait]
pub trait BusinessRepository: Send + Sync {
    async fn create(&self, business: NewBusiness) -> Result<BusinessRow>;
    async fn get_by_id(&self, id: i64) -> Result<Option<BusinessRow>>;

    /// Cache fill after a successful geocode. Idempotent; concurrent writers
    /// race last-write-wins.
    async fn set_coordinates(&self, id: i64, latitude: f64, longitude: f64) -> Result<()>;
}

pub trait Repositories: Send + Sync {
    fn reports(&self) -> &dyn ReportRepository;
    fn businesses(&self) -> &dyn BusinessRepository;
}
