use std::sync::Arc;

use crew_auth::{JwtVerifier, SnapshotFetcher};

#[derive(Clone)]
pub struct CrewAxumState {
    pub fetcher: Arc<dyn SnapshotFetcher>,
    pub verifier: Arc<JwtVerifier>,
}

impl CrewAxumState {
    pub fn new(fetcher: Arc<dyn SnapshotFetcher>, verifier: Arc<JwtVerifier>) -> Self {
        Self { fetcher, verifier }
    }
}
