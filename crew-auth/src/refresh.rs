//! Fetch-then-hydrate coordination.

use std::sync::Arc;

use crew_core::{CapabilityStore, HydrateOutcome};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetcher::{FetchContext, SnapshotFetcher};

/// Refreshes a store from a fetcher. Overlapping refreshes are ordered by
/// fetch tickets, so a slow response never overwrites a newer one.
#[derive(Clone)]
pub struct CapabilityRefresher {
    store: CapabilityStore,
    fetcher: Arc<dyn SnapshotFetcher>,
}

impl std::fmt::Debug for CapabilityRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRefresher")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl CapabilityRefresher {
    pub fn new(store: CapabilityStore, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &CapabilityStore {
        &self.store
    }

    /// On failure the store keeps its current snapshot, flagged stale, and
    /// the error is returned to the caller.
    pub async fn refresh(&self, ctx: &FetchContext) -> Result<HydrateOutcome, FetchError> {
        let ticket = self.store.begin_fetch();
        debug!(ticket = ticket.get(), org = %ctx.tenant.org_id, "capability refresh started");

        match self.fetcher.fetch(ctx).await {
            Ok(snapshot) => Ok(self.store.hydrate_ticketed(ticket, snapshot)),
            Err(err) => {
                warn!(ticket = ticket.get(), error = %err, "capability fetch failed");
                self.store.mark_stale(ticket);
                Err(err)
            }
        }
    }

    /// Refetch for another location of the same org.
    pub async fn switch_location(
        &self,
        ctx: &FetchContext,
        location: Option<&str>,
    ) -> Result<HydrateOutcome, FetchError> {
        self.refresh(&ctx.switch_location(location)).await
    }
}
