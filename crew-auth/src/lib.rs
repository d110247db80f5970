// Snapshot fetching and session handling for crew.

pub mod error;
pub mod fetcher;
pub mod options;
pub mod refresh;
pub mod session;

pub use error::{FetchError, SessionError};
pub use fetcher::{FetchContext, HttpSnapshotFetcher, SnapshotFetcher};
pub use options::{FetcherOptions, JwtAlgorithm, JwtOptions, SessionOptions};
pub use refresh::CapabilityRefresher;
pub use session::*;
