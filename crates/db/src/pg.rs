use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::text::EstablishmentKey;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use tokio::time::{sleep, Duration};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::errors::{DbError, Result};
use crate::models::{BusinessRow, NewBusiness, ReportQuery, ReportRow};
use crate::repositories::{BusinessRepository, Repositories, ReportRepository};

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(DbError::Migration)
}

#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
    report_repo: Arc<PgReportRepository>,
    business_repo: Arc<PgBusinessRepository>,
}

impl PgDatabase {
    pub async fn connect(database_url: &str) -> Result<Self> {
        const MAX_ATTEMPTS: u32 = 5;
        const BASE_DELAY_MS: u64 = 500;

        let mut attempts = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    run_migrations(&pool).await?;
                    return Ok(Self::from_pool(pool));
                }
                Err(err) => {
                    attempts += 1;
                    if attempts >= MAX_ATTEMPTS {
                        return Err(DbError::Query(err));
                    }

                    let exp = (attempts - 1).min(5);
                    let backoff = Duration::from_millis(BASE_DELAY_MS * (1u64 << exp));
                    warn!(
                        attempts,
                        error = %err,
                        wait_ms = backoff.as_millis(),
                        "database connection failed; retrying"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let report_repo = Arc::new(PgReportRepository { pool: pool.clone() });
        let business_repo = Arc::new(PgBusinessRepository { pool: pool.clone() });

        Self {
            pool,
            report_repo,
            business_repo,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Repositories for PgDatabase {
    fn reports(&self) -> &dyn ReportRepository {
        &*self.report_repo
    }

    fn businesses(&self) -> &dyn BusinessRepository {
        &*self.business_repo
    }
}

#[derive(Clone)]
struct PgReportRepository {
    pool: PgPool,
}

const REPORT_COLUMNS: &str = r#"id, business_id, business_name, business_address, description,
       reporter_email, reporter_email_norm, business_name_norm, business_address_norm,
       image_urls, document_urls, device_lat, device_lng, device_accuracy,
       device_captured_at, pinned_lat, pinned_lng, tags, authenticity_level,
       authenticity_tier, status, created_at"#;

#[async_trait]
impl ReportRepository for PgReportRepository {
    #[instrument(skip(self, report), fields(id = %report.id))]
    async fn insert(&self, report: ReportRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (
                id, business_id, business_name, business_address, description,
                reporter_email, reporter_email_norm, business_name_norm,
                business_address_norm, image_urls, document_urls, device_lat,
                device_lng, device_accuracy, device_captured_at, pinned_lat,
                pinned_lng, tags, authenticity_level, authenticity_tier, status,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(report.id)
        .bind(report.business_id)
        .bind(report.business_name)
        .bind(report.business_address)
        .bind(report.description)
        .bind(report.reporter_email)
        .bind(report.reporter_email_norm)
        .bind(report.business_name_norm)
        .bind(report.business_address_norm)
        .bind(report.image_urls)
        .bind(report.document_urls)
        .bind(report.device_lat)
        .bind(report.device_lng)
        .bind(report.device_accuracy)
        .bind(report.device_captured_at)
        .bind(report.pinned_lat)
        .bind(report.pinned_lng)
        .bind(report.tags)
        .bind(report.authenticity_level)
        .bind(report.authenticity_tier)
        .bind(report.status)
        .bind(report.created_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(DbError::Query)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ReportRow>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1");
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    async fn query(&self, query: ReportQuery) -> Result<Vec<ReportRow>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {REPORT_COLUMNS} FROM reports"
        ));

        let mut has_where = false;

        if let Some(tier) = &query.tier {
            builder.push(" WHERE authenticity_tier = ");
            builder.push_bind(tier);
            has_where = true;
        }

        if let Some(reporter) = &query.reporter_email {
            builder.push(if has_where { " AND" } else { " WHERE" });
            builder.push(" reporter_email_norm = ");
            builder.push_bind(reporter);
            has_where = true;
        }

        if let Some(since) = query.since {
            builder.push(if has_where { " AND" } else { " WHERE" });
            builder.push(" created_at >= ");
            builder.push_bind(since);
        }

        builder.push(" ORDER BY created_at DESC ");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let query = builder.build_query_as::<ReportRow>();
        query.fetch_all(&self.pool).await.map_err(DbError::Query)
    }

    async fn count_by_reporter(
        &self,
        reporter_email_norm: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM reports
            WHERE reporter_email_norm = $1
              AND created_at >= $2
              AND created_at < $3
            "#,
        )
        .bind(reporter_email_norm)
        .bind(since)
        .bind(until)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn establishments_by_reporter(
        &self,
        reporter_email_norm: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EstablishmentKey>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT DISTINCT business_name_norm, business_address_norm
            FROM reports
            WHERE reporter_email_norm = $1
              AND created_at >= $2
              AND created_at < $3
            "#,
        )
        .bind(reporter_email_norm)
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(rows
            .into_iter()
            .map(|(name, address)| EstablishmentKey::from_normalized(name, address))
            .collect())
    }

    async fn count_for_establishment(
        &self,
        establishment: &EstablishmentKey,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM reports
            WHERE business_name_norm = $1
              AND business_address_norm = $2
              AND created_at >= $3
              AND created_at < $4
            "#,
        )
        .bind(&establishment.name)
        .bind(&establishment.address)
        .bind(since)
        .bind(until)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}

#[derive(Clone)]
struct PgBusinessRepository {
    pool: PgPool,
}

#[async_trait]
impl BusinessRepository for PgBusinessRepository {
    #[instrument(skip(self, business), fields(name = %business.name))]
    async fn create(&self, business: NewBusiness) -> Result<BusinessRow> {
        sqlx::query_as::<_, BusinessRow>(
            r#"
            INSERT INTO businesses (name, address, latitude, longitude)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, address, latitude, longitude, created_at
            "#,
        )
        .bind(business.name)
        .bind(business.address)
        .bind(business.latitude)
        .bind(business.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BusinessRow>> {
        sqlx::query_as::<_, BusinessRow>(
            r#"
            SELECT id, name, address, latitude, longitude, created_at
            FROM businesses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn set_coordinates(&self, id: i64, latitude: f64, longitude: f64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE businesses
            SET latitude = $2, longitude = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(latitude)
        .bind(longitude)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(DbError::Query)
    }
}
