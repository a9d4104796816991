use crate::cli::ServeArgs;
use crate::infra::{seed_directory, AppState, Stores};
use crate::routes::with_transfer_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use interfaculty::config::AppConfig;
use interfaculty::error::AppError;
use interfaculty::telemetry;
use interfaculty::workflows::transfer::TransferServiceError;
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

    let stores = Stores::default();
    if config.directory.seed {
        let seeded = seed_directory(&stores.directory).map_err(TransferServiceError::from)?;
        info!(
            faculties = seeded.faculties.len(),
            programs = seeded.programs.len(),
            "seeded reference directory"
        );
    }

    let app = with_transfer_routes(stores.service())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "inter-faculty transfer service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
