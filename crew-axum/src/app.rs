use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use crew_auth::{FetcherOptions, HttpSnapshotFetcher, JwtVerifier, SessionOptions};
use crew_core::CrewConfigSnapshot;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bootstrap::bootstrap_router;
use crate::CrewAxumState;

pub const HTTP_HOST_KEY: &str = "http.host";
pub const HTTP_PORT_KEY: &str = "http.port";

#[derive(Clone)]
pub struct CrewAxumApp {
    pub state: CrewAxumState,
    pub router: Router<()>,
}

impl CrewAxumApp {
    pub fn new(state: CrewAxumState) -> Self {
        let router = bootstrap_router(state.clone()).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        );
        Self { state, router }
    }

    /// Wire the HTTP fetcher and JWT verifier from configuration.
    pub fn from_config(config: &CrewConfigSnapshot) -> Result<Self> {
        let fetcher = HttpSnapshotFetcher::new(FetcherOptions::from_config(config)?)?;
        let session = SessionOptions::from_config(config)?;
        let verifier = JwtVerifier::new(session.jwt)?;
        Ok(Self::new(CrewAxumState::new(
            Arc::new(fetcher),
            Arc::new(verifier),
        )))
    }

    pub async fn listen<A>(self, addr: A) -> Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "crew bootstrap listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

/// `host:port` from config, defaulting to `127.0.0.1:3030`.
pub fn listen_addr(config: &CrewConfigSnapshot) -> String {
    let host = config
        .get_string(HTTP_HOST_KEY)
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = config
        .get_string(HTTP_PORT_KEY)
        .unwrap_or_else(|| "3030".to_string());
    format!("{host}:{port}")
}
