//! HTTP API server for the LINE relay

pub mod callback;
pub mod health;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::relay::RelayContext;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Secret used to verify `x-line-signature`
    pub channel_secret: SecretString,
    pub relay: Arc<RelayContext>,
    /// Directory served under `/static/`
    pub static_dir: PathBuf,
}

/// Build the router with all routes
///
/// Staged content is served read-only from the relay's download directory.
pub fn router(state: Arc<ApiState>) -> Router {
    let downloads = ServeDir::new(state.relay.stager().dir());
    let statics = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/callback", post(callback::handle_callback))
        .with_state(state.clone())
        .nest_service("/static", statics)
        .nest_service("/downloaded", downloads)
        .merge(health::router(state))
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server listening on `port`
    #[must_use]
    pub fn new(state: ApiState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            mode = %self.state.relay.mode(),
            downloads = %self.state.relay.stager().dir().display(),
            "API server listening"
        );

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
