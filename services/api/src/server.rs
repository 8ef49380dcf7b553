use crate::cli::ServeArgs;
use crate::infra::{AppState, DeskState};
use crate::routes::with_desk_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use feedesk::config::AppConfig;
use feedesk::error::AppError;
use feedesk::telemetry::{self, LogSink};
use feedesk::workflows::admissions::{AdmissionService, MemoryAdmissionRepository};
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

    telemetry::init(&config.telemetry, LogSink::Server)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let addr = config.server.socket_addr()?;
    let environment = config.environment;
    let school = config.school.name.clone();

    let admissions = Arc::new(AdmissionService::new(Arc::new(
        MemoryAdmissionRepository::default(),
    )));
    let desk = DeskState::new(config);

    let app = with_desk_routes(desk, admissions)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?environment, %addr, %school, "fee desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}
