//! The process-wide capability store.
//!
//! A `CapabilityStore` is a cheap-to-clone handle: every clone sees the same
//! snapshot. It is created at the composition root and handed to whatever
//! needs it (bridge, gates, refresh coordinator) instead of living in a
//! global.
//!
//! Reads never fail and never block on I/O. While no snapshot has been
//! hydrated the store is *not ready* and every query answers `false`; this
//! is distinct from a ready store whose snapshot grants nothing.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::config::CrewConfigSnapshot;
use crate::events::{EventPat, ListenerId, StoreEvent, StoreEventHub};
use crate::policy::CapabilityPolicy;
use crate::requirement::PermissionRequirement;
use crate::snapshot::CapabilitySnapshot;

/// Sequence number handed out per snapshot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Coarse state of the store as seen by one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NotReady,
    Ready,
    /// A snapshot is installed but the most recent refresh failed.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrateOutcome {
    Installed { version: u64 },
    /// Same content as the installed snapshot; nothing observable changed.
    Unchanged { version: u64 },
    /// The ticket was older than a request already settled (or than a reset).
    Discarded { ticket: FetchTicket },
}

#[derive(Debug, Default)]
struct StoreState {
    snapshot: Option<Arc<CapabilitySnapshot>>,
    version: u64,
    stale: bool,
    issued_ticket: u64,
    settled_ticket: u64,
}

struct CapabilityStoreInner {
    state: RwLock<StoreState>,
    events: RwLock<StoreEventHub>,
    policy: Arc<CapabilityPolicy>,
}

#[derive(Clone)]
pub struct CapabilityStore {
    inner: Arc<CapabilityStoreInner>,
}

impl Default for CapabilityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CapabilityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.view();
        f.debug_struct("CapabilityStore")
            .field("readiness", &view.readiness())
            .field("version", &view.version())
            .finish()
    }
}

impl CapabilityStore {
    pub fn new() -> Self {
        Self::with_policy(CapabilityPolicy::default())
    }

    pub fn with_policy(policy: CapabilityPolicy) -> Self {
        Self {
            inner: Arc::new(CapabilityStoreInner {
                state: RwLock::new(StoreState::default()),
                events: RwLock::new(StoreEventHub::new()),
                policy: Arc::new(policy),
            }),
        }
    }

    pub fn from_config(config: &CrewConfigSnapshot) -> Self {
        Self::with_policy(CapabilityPolicy::from_config(config))
    }

    pub fn policy(&self) -> &CapabilityPolicy {
        &self.inner.policy
    }

    /// Capture the current state. All checks made through one view see the
    /// same snapshot, even if the store is written to meanwhile.
    pub fn view(&self) -> StoreView {
        let state = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        StoreView {
            snapshot: state.snapshot.clone(),
            version: state.version,
            stale: state.stale,
            policy: Arc::clone(&self.inner.policy),
        }
    }

    /// Replace the snapshot wholesale and mark the store ready.
    pub fn hydrate(&self, snapshot: impl Into<Arc<CapabilitySnapshot>>) -> HydrateOutcome {
        let snapshot = snapshot.into();
        let (outcome, event) = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            Self::install(&mut state, snapshot)
        };
        if let Some(event) = event {
            self.emit(event);
        }
        outcome
    }

    /// Reserve the next request sequence number.
    pub fn begin_fetch(&self) -> FetchTicket {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        state.issued_ticket += 1;
        FetchTicket(state.issued_ticket)
    }

    /// Hydrate with the result of the request identified by `ticket`.
    ///
    /// Applied only when `ticket` is newer than every ticket already settled
    /// (applied or failed) and was issued after the last reset.
    pub fn hydrate_ticketed(
        &self,
        ticket: FetchTicket,
        snapshot: impl Into<Arc<CapabilitySnapshot>>,
    ) -> HydrateOutcome {
        let snapshot = snapshot.into();
        let (outcome, event) = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if ticket.0 <= state.settled_ticket {
                warn!(
                    ticket = ticket.0,
                    settled = state.settled_ticket,
                    "discarding out-of-order capability snapshot"
                );
                return HydrateOutcome::Discarded { ticket };
            }
            state.settled_ticket = ticket.0;
            Self::install(&mut state, snapshot)
        };
        if let Some(event) = event {
            self.emit(event);
        }
        outcome
    }

    /// Record that the request for `ticket` failed.
    ///
    /// The installed snapshot is kept and flagged stale. A not-ready store
    /// stays not-ready. Responses to older tickets are discarded from now on.
    /// Returns whether the stale flag was newly set.
    pub fn mark_stale(&self, ticket: FetchTicket) -> bool {
        let event = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if ticket.0 <= state.settled_ticket {
                return false;
            }
            // a failed request still supersedes every older one
            state.settled_ticket = ticket.0;
            if state.snapshot.is_none() || state.stale {
                return false;
            }
            state.stale = true;
            state.version += 1;
            StoreEvent::MarkedStale {
                version: state.version,
            }
        };
        warn!(ticket = ticket.0, "capability refresh failed, keeping previous snapshot");
        self.emit(event);
        true
    }

    /// Drop the snapshot and return to not-ready. Outstanding tickets are
    /// invalidated.
    pub fn reset(&self) {
        let event = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            state.snapshot = None;
            state.stale = false;
            state.settled_ticket = state.issued_ticket;
            state.version += 1;
            StoreEvent::Reset {
                version: state.version,
            }
        };
        debug!("capability store reset");
        self.emit(event);
    }

    fn install(
        state: &mut StoreState,
        snapshot: Arc<CapabilitySnapshot>,
    ) -> (HydrateOutcome, Option<StoreEvent>) {
        let unchanged = state
            .snapshot
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &snapshot) || **current == *snapshot);

        if unchanged && !state.stale {
            return (
                HydrateOutcome::Unchanged {
                    version: state.version,
                },
                None,
            );
        }

        state.snapshot = Some(Arc::clone(&snapshot));
        state.stale = false;
        state.version += 1;
        debug!(
            version = state.version,
            permissions = snapshot.permissions().len(),
            role_level = snapshot.role_level(),
            "capability snapshot installed"
        );

        (
            HydrateOutcome::Installed {
                version: state.version,
            },
            Some(StoreEvent::Hydrated {
                version: state.version,
                snapshot,
            }),
        )
    }

    // ──────────────────────────────────────────────────────────────
    // Queries (each takes its own view)
    // ──────────────────────────────────────────────────────────────

    pub fn is_ready(&self) -> bool {
        self.view().is_ready()
    }

    pub fn is_stale(&self) -> bool {
        self.view().is_stale()
    }

    pub fn version(&self) -> u64 {
        self.view().version()
    }

    pub fn snapshot(&self) -> Option<Arc<CapabilitySnapshot>> {
        self.view().snapshot
    }

    pub fn can(&self, requirement: &PermissionRequirement) -> bool {
        self.view().can(requirement)
    }

    pub fn can_token(&self, token: &str) -> bool {
        self.view().can_token(token)
    }

    pub fn can_any<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        self.view().can_any(tokens)
    }

    pub fn can_all<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        self.view().can_all(tokens)
    }

    pub fn has_feature(&self, tag: &str) -> bool {
        self.view().has_feature(tag)
    }

    pub fn has_plan(&self, tag: &str) -> bool {
        self.view().has_plan(tag)
    }

    pub fn has_org_role(&self, tag: &str) -> bool {
        self.view().has_org_role(tag)
    }

    pub fn has_location_role(&self, tag: &str) -> bool {
        self.view().has_location_role(tag)
    }

    pub fn role_level_at_least(&self, level: i32) -> bool {
        self.view().role_level_at_least(level)
    }

    pub fn active_location_id(&self) -> Option<String> {
        self.view().active_location_id().map(str::to_string)
    }

    // ──────────────────────────────────────────────────────────────
    // Subscriptions
    // ──────────────────────────────────────────────────────────────

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.subscribe_to(EventPat::Any, listener)
    }

    pub fn subscribe_to<F>(&self, pattern: EventPat, listener: F) -> ListenerId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.inner
            .events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .on(pattern, Arc::new(listener))
    }

    pub fn subscribe_once<F>(&self, pattern: EventPat, listener: F) -> ListenerId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.inner
            .events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .once(pattern, Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner
            .events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .off(id)
    }

    fn emit(&self, event: StoreEvent) {
        let (listeners, once_ids) = {
            let hub = self
                .inner
                .events
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            hub.snapshot_emit(event.kind())
        };

        for f in &listeners {
            f(&event);
        }

        self.inner
            .events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .finalize_once_removals(&once_ids);
    }
}

/// A consistent, read-only capture of the store.
#[derive(Debug, Clone)]
pub struct StoreView {
    snapshot: Option<Arc<CapabilitySnapshot>>,
    version: u64,
    stale: bool,
    policy: Arc<CapabilityPolicy>,
}

impl StoreView {
    pub fn readiness(&self) -> Readiness {
        match (&self.snapshot, self.stale) {
            (None, _) => Readiness::NotReady,
            (Some(_), false) => Readiness::Ready,
            (Some(_), true) => Readiness::Stale,
        }
    }

    /// Stale snapshots are still ready: they answer queries.
    pub fn is_ready(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn snapshot(&self) -> Option<&CapabilitySnapshot> {
        self.snapshot.as_deref()
    }

    pub fn can(&self, requirement: &PermissionRequirement) -> bool {
        let Some(snapshot) = self.snapshot.as_deref() else {
            return false;
        };
        requirement.evaluate_with(|token| self.policy.allows(snapshot, token))
    }

    pub fn can_token(&self, token: &str) -> bool {
        self.snapshot
            .as_deref()
            .is_some_and(|s| self.policy.allows(s, token))
    }

    pub fn can_any<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        tokens.iter().any(|t| self.can_token(t.as_ref()))
    }

    pub fn can_all<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        self.is_ready() && tokens.iter().all(|t| self.can_token(t.as_ref()))
    }

    pub fn has_feature(&self, tag: &str) -> bool {
        self.snapshot
            .as_deref()
            .is_some_and(|s| s.feature_tags().contains(tag))
    }

    pub fn has_plan(&self, tag: &str) -> bool {
        self.snapshot
            .as_deref()
            .is_some_and(|s| s.plan_tags().contains(tag))
    }

    pub fn has_org_role(&self, tag: &str) -> bool {
        self.snapshot
            .as_deref()
            .is_some_and(|s| s.org_role_tags().contains(tag))
    }

    pub fn has_location_role(&self, tag: &str) -> bool {
        self.snapshot
            .as_deref()
            .is_some_and(|s| s.location_role_tags().contains(tag))
    }

    pub fn role_level_at_least(&self, level: i32) -> bool {
        self.snapshot
            .as_deref()
            .is_some_and(|s| s.role_level() >= level)
    }

    pub fn active_location_id(&self) -> Option<&str> {
        self.snapshot.as_deref().and_then(|s| s.active_location_id())
    }
}
