//! crew-axum: serves the capability bootstrap payload over HTTP.

pub mod app;
pub mod bootstrap;
mod error;
pub mod state;

pub use app::{listen_addr, CrewAxumApp};
pub use bootstrap::{bootstrap_router, BootstrapPayload};
pub use error::CrewAxumError;
pub use state::CrewAxumState;

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
