use std::net::SocketAddr;

use axum::Router;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    accounts,
    error::{panic_response, route_not_found},
    shutdown::shutdown_signal,
    state::AppState,
};

pub fn build_app(state: AppState) -> Router {
    let routes = Router::new().nest("/api/users", accounts::user_routes(state.clone()));
    with_layers(routes, state)
}

/// Adds the 404 fallback, panic catching, CORS and request tracing.
pub fn with_layers(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .fallback(route_not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

/// Binds, serves until SIGINT/SIGTERM, then waits for in-flight requests.
pub async fn serve(app: Router, state: &AppState) -> anyhow::Result<()> {
    let config = &state.config;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Server running on port {} in {} mode",
        config.port,
        config.mode
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("HTTP server closed");
    Ok(())
}
