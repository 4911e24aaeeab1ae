use std::net::SocketAddr;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    applications, auth, jobs, skills,
    state::AppState,
    users,
};

/// Base64 inflates uploads by a third; the rest of the JSON body gets some room too.
fn body_limit(max_attachment_bytes: usize) -> usize {
    max_attachment_bytes / 3 * 4 + 64 * 1024
}

pub fn build_app(state: AppState) -> Router {
    let public = Router::new()
        .merge(auth::handlers::public_routes())
        .route("/health", get(|| async { "ok" }));

    let user = Router::new()
        .merge(auth::handlers::session_routes())
        .merge(users::handlers::user_routes())
        .merge(skills::handlers::user_routes())
        .merge(jobs::handlers::user_routes())
        .merge(applications::handlers::user_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_user));

    let admin = Router::new()
        .merge(users::handlers::admin_routes())
        .merge(skills::handlers::admin_routes())
        .merge(jobs::handlers::admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    let limit = body_limit(state.config.max_attachment_bytes);

    Router::new()
        .merge(public)
        .merge(user)
        .merge(admin)
        .with_state(state)
        .layer(DefaultBodyLimit::max(limit))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::body_limit;

    #[test]
    fn limit_covers_encoded_attachment() {
        let max = 1024 * 1024;
        assert!(body_limit(max) > max * 4 / 3);
    }
}
