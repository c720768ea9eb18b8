use crate::cli::ServeArgs;
use crate::infra::{seed_demo_store, AppState};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lesotho_portal::clock::SystemClock;
use lesotho_portal::config::AppConfig;
use lesotho_portal::error::AppError;
use lesotho_portal::store::MemoryDocumentStore;
use lesotho_portal::telemetry;
use lesotho_portal::workflows::opportunities::OpportunityService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = MemoryDocumentStore::new();
    if args.seed_demo {
        seed_demo_store(&store)?;
        info!("seeded demo organizations, postings and students");
    }
    let service = Arc::new(OpportunityService::new(
        Arc::new(store),
        Arc::new(SystemClock),
        &config.portal,
    ));

    let app = with_portal_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        publish_concurrency = config.portal.publish_concurrency,
        "lesotho opportunities portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
