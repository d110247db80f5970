//! Installs a server-produced snapshot into the client store.

use std::sync::Arc;

use tracing::debug;

use crate::snapshot::CapabilitySnapshot;
use crate::store::{CapabilityStore, HydrateOutcome};

/// Call [`HydrationBridge::activate`] on every render of the component that
/// owns the bootstrap snapshot. The first activation always hydrates; later
/// ones only when the supplied snapshot actually changed.
#[derive(Debug)]
pub struct HydrationBridge {
    store: CapabilityStore,
    last: Option<Arc<CapabilitySnapshot>>,
}

impl HydrationBridge {
    pub fn new(store: CapabilityStore) -> Self {
        Self { store, last: None }
    }

    pub fn store(&self) -> &CapabilityStore {
        &self.store
    }

    pub fn is_active(&self) -> bool {
        self.last.is_some()
    }

    /// Returns `None` when no hydrate call was needed.
    pub fn activate(&mut self, snapshot: Arc<CapabilitySnapshot>) -> Option<HydrateOutcome> {
        if let Some(last) = &self.last {
            if Arc::ptr_eq(last, &snapshot) || **last == *snapshot {
                return None;
            }
        }

        let first = self.last.is_none();
        self.last = Some(Arc::clone(&snapshot));
        let outcome = self.store.hydrate(snapshot);
        debug!(first, ?outcome, "hydration bridge activated");
        Some(outcome)
    }

    /// Forget the last snapshot so the next activation hydrates again.
    pub fn deactivate(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Readiness;

    #[test]
    fn first_activation_always_hydrates() {
        let store = CapabilityStore::new();
        let mut bridge = HydrationBridge::new(store.clone());

        let outcome = bridge.activate(Arc::new(CapabilitySnapshot::default()));

        assert!(matches!(outcome, Some(HydrateOutcome::Installed { .. })));
        assert_eq!(store.view().readiness(), Readiness::Ready);
    }

    #[test]
    fn same_reference_or_equal_content_is_skipped() {
        let store = CapabilityStore::new();
        let mut bridge = HydrationBridge::new(store.clone());
        let snap = Arc::new(CapabilitySnapshot::new(["shifts:view"], 10));

        bridge.activate(Arc::clone(&snap));
        let version = store.version();

        assert_eq!(bridge.activate(Arc::clone(&snap)), None);
        assert_eq!(
            bridge.activate(Arc::new(CapabilitySnapshot::new(["shifts:view"], 10))),
            None
        );
        assert_eq!(store.version(), version);
    }

    #[test]
    fn changed_snapshot_rehydrates() {
        let store = CapabilityStore::new();
        let mut bridge = HydrationBridge::new(store.clone());

        bridge.activate(Arc::new(
            CapabilitySnapshot::builder()
                .permissions(["shifts:view"])
                .active_location_id(Some("loc-1"))
                .build(),
        ));
        let outcome = bridge.activate(Arc::new(
            CapabilitySnapshot::builder()
                .permissions(["shifts:view", "shifts:edit"])
                .active_location_id(Some("loc-2"))
                .build(),
        ));

        assert!(matches!(outcome, Some(HydrateOutcome::Installed { .. })));
        assert!(store.can_token("shifts:edit"));
        assert_eq!(store.active_location_id().as_deref(), Some("loc-2"));
    }

    #[test]
    fn deactivate_after_reset_allows_rehydration() {
        let store = CapabilityStore::new();
        let mut bridge = HydrationBridge::new(store.clone());
        let snap = Arc::new(CapabilitySnapshot::new(["feed:view"], 0));

        bridge.activate(Arc::clone(&snap));
        store.reset();
        bridge.deactivate();
        assert!(!bridge.is_active());

        bridge.activate(snap);
        assert!(store.can_token("feed:view"));
    }
}
