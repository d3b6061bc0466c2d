use std::sync::Arc;

use anyhow::Result;
use api::{build_router, ApiState};
use axum::Router;
use common::{config::AppConfig, logging};
use db::pg::PgDatabase;
use db::Repositories;
use geocode::{Geocoder, NominatimGeocoder};
use intake::IntakePipeline;
use tracing::info;
use verification::ProximityVerifier;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("info");
    let config = AppConfig::load()?;
    let database = Arc::new(PgDatabase::connect(&config.database.url).await?);
    let repositories: Arc<dyn Repositories> = database.clone();

    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(&config.geocoder));
    let verifier = Arc::new(ProximityVerifier::new(
        repositories.clone(),
        geocoder,
        config.verification.clone(),
    ));
    let pipeline = Arc::new(IntakePipeline::new(repositories.clone()));

    let metrics_path: &'static str =
        Box::leak(config.observability.metrics_path.clone().into_boxed_str());
    let state = Arc::new(ApiState {
        repositories,
        pipeline,
        verifier,
        metrics_path,
    });
    let app: Router = build_router(state);

    let addr: std::net::SocketAddr = config.api.bind.parse()?;
    info!("api listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
