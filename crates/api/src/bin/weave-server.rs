//! The `POST /executions` surface: manually-started and single-node runs.
//! The façade's first stimulus source.

use weave_api::{with_standard_middleware, ApiConfig, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ApiConfig::from_env().unwrap_or_else(|err| {
        tracing::error!(error = %err, "invalid configuration");
        std::process::exit(1);
    });
    let state = AppState::build(&config);

    let router =
        with_standard_middleware(weave_api::routes::executions::router()).with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    tracing::info!(addr = %config.bind_addr, "weave-server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(weave_api::shutdown_signal())
        .await
        .expect("server error");
}
