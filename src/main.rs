use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use parcel_dispatch::api;
use parcel_dispatch::auth::verifier::HttpIdentityVerifier;
use parcel_dispatch::config::Config;
use parcel_dispatch::error::AppError;
use parcel_dispatch::gateway::StripePaymentGateway;
use parcel_dispatch::state::AppState;
use parcel_dispatch::store::Stores;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let identity = HttpIdentityVerifier::new(
        config.identity_lookup_url.clone(),
        config.identity_api_key.clone(),
        config.upstream_timeout,
    )
    .map_err(|err| AppError::Internal(format!("identity client: {err}")))?;

    let gateway = StripePaymentGateway::new(
        config.payment_api_base.clone(),
        config.payment_secret_key.clone(),
        config.upstream_timeout,
    )
    .map_err(|err| AppError::Internal(format!("payment client: {err}")))?;

    let state = AppState::new(
        Stores::in_memory(),
        Arc::new(identity),
        Arc::new(gateway),
        config.payment_currency.clone(),
        config.event_buffer_size,
    );

    let app = api::rest::router(Arc::new(state));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
