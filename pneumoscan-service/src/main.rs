use pneumoscan_service::{
    AppState, ServiceConfig, build_router,
    retention::{RetentionPolicy, spawn_sweeper},
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pneumoscan_service=info,xray_gate=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();
    let app_state = AppState::from_config(&config).await?;

    spawn_sweeper(
        app_state.uploads.clone(),
        app_state.analyses.clone(),
        RetentionPolicy {
            max_age: config.retention,
            sweep_interval: config.sweep_interval,
        },
    );

    let app = build_router(app_state);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    let addr = listener.local_addr()?;

    info!("PneumoScan service listening on http://{}", addr);
    info!("Prediction endpoint: POST http://{}/predict", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
