//! Declarative capability gates.
//!
//! A gate turns the store state into one of three render decisions:
//! pending (no snapshot yet), granted, or denied. While pending it never
//! yields the gated content and never yields the denial fallback, so a
//! client does not flash "access denied" before its snapshot arrives.
//!
//! ```rust
//! use crew_core::{CapabilityGate, CapabilitySnapshot, CapabilityStore};
//!
//! let store = CapabilityStore::new();
//! let gate = CapabilityGate::require("haccp:view");
//!
//! assert_eq!(gate.show(&store.view(), || "checklist"), None);
//!
//! store.hydrate(CapabilitySnapshot::new(["haccp:view"], 10));
//! assert_eq!(gate.show(&store.view(), || "checklist"), Some("checklist"));
//! ```

use crate::requirement::PermissionRequirement;
use crate::store::{CapabilityStore, StoreView};

/// What a gate checks once a snapshot is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateCheck {
    Permission(PermissionRequirement),
    Feature(String),
    Plan(String),
    RoleLevel(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Pending,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityGate {
    check: Option<GateCheck>,
}

impl CapabilityGate {
    /// A gate with no requirement: passes once the store is ready.
    pub fn open() -> Self {
        Self { check: None }
    }

    pub fn require(requirement: impl Into<PermissionRequirement>) -> Self {
        Self {
            check: Some(GateCheck::Permission(requirement.into())),
        }
    }

    pub fn any_of<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::require(PermissionRequirement::any_of(tokens))
    }

    pub fn all_of<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::require(PermissionRequirement::all_of(tokens))
    }

    pub fn feature(tag: impl Into<String>) -> Self {
        Self {
            check: Some(GateCheck::Feature(tag.into())),
        }
    }

    pub fn plan(tag: impl Into<String>) -> Self {
        Self {
            check: Some(GateCheck::Plan(tag.into())),
        }
    }

    pub fn min_role_level(level: i32) -> Self {
        Self {
            check: Some(GateCheck::RoleLevel(level)),
        }
    }

    pub fn check(&self) -> Option<&GateCheck> {
        self.check.as_ref()
    }

    pub fn evaluate(&self, store: &CapabilityStore) -> GateOutcome {
        self.evaluate_in(&store.view())
    }

    /// Evaluate against an already captured view. Nested gates should share
    /// the parent's view so they all answer from the same snapshot.
    pub fn evaluate_in(&self, view: &StoreView) -> GateOutcome {
        if !view.is_ready() {
            return GateOutcome::Pending;
        }

        let granted = match &self.check {
            None => true,
            Some(GateCheck::Permission(req)) => view.can(req),
            Some(GateCheck::Feature(tag)) => view.has_feature(tag),
            Some(GateCheck::Plan(tag)) => view.has_plan(tag),
            Some(GateCheck::RoleLevel(level)) => view.role_level_at_least(*level),
        };

        if granted {
            GateOutcome::Granted
        } else {
            GateOutcome::Denied
        }
    }

    /// Children when granted, nothing otherwise.
    pub fn show<T>(&self, view: &StoreView, children: impl FnOnce() -> T) -> Option<T> {
        match self.evaluate_in(view) {
            GateOutcome::Granted => Some(children()),
            GateOutcome::Pending | GateOutcome::Denied => None,
        }
    }

    /// Children when granted, `fallback` when denied, nothing while pending.
    pub fn show_or<T>(
        &self,
        view: &StoreView,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> Option<T> {
        match self.evaluate_in(view) {
            GateOutcome::Granted => Some(children()),
            GateOutcome::Denied => Some(fallback()),
            GateOutcome::Pending => None,
        }
    }

    /// Full form: a loading placeholder for the pending state as well.
    pub fn show_with<T>(
        &self,
        view: &StoreView,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
        loading: impl FnOnce() -> T,
    ) -> T {
        match self.evaluate_in(view) {
            GateOutcome::Granted => children(),
            GateOutcome::Denied => fallback(),
            GateOutcome::Pending => loading(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::CapabilitySnapshot;

    #[test]
    fn open_gate_waits_for_hydration() {
        let store = CapabilityStore::new();
        let gate = CapabilityGate::open();

        assert_eq!(gate.evaluate(&store), GateOutcome::Pending);
        assert_eq!(gate.show(&store.view(), || "children"), None);

        store.hydrate(CapabilitySnapshot::default());
        assert_eq!(gate.show(&store.view(), || "children"), Some("children"));
    }

    #[test]
    fn pending_never_renders_fallback() {
        let store = CapabilityStore::new();
        let gate = CapabilityGate::require("inventory:edit");

        let rendered = gate.show_or(&store.view(), || "editor", || "denied");
        assert_eq!(rendered, None);

        let rendered = gate.show_with(&store.view(), || "editor", || "denied", || "spinner");
        assert_eq!(rendered, "spinner");
    }

    #[test]
    fn denied_renders_fallback() {
        let store = CapabilityStore::new();
        store.hydrate(CapabilitySnapshot::new(["inventory:view"], 10));
        let gate = CapabilityGate::require("inventory:edit");

        assert_eq!(gate.evaluate(&store), GateOutcome::Denied);
        assert_eq!(gate.show(&store.view(), || "editor"), None);
        assert_eq!(
            gate.show_or(&store.view(), || "editor", || "read-only"),
            Some("read-only")
        );
    }

    #[test]
    fn nested_gates_and_together() {
        let store = CapabilityStore::new();
        store.hydrate(
            CapabilitySnapshot::builder()
                .permissions(["haccp:view"])
                .feature_tags(["haccp"])
                .role_level(10)
                .build(),
        );
        let view = store.view();

        let outer = CapabilityGate::feature("haccp");
        let inner_ok = CapabilityGate::any_of(["haccp:view", "haccp:manage"]);
        let inner_no = CapabilityGate::all_of(["haccp:view", "haccp:manage"]);

        let both = outer.show(&view, || inner_ok.show(&view, || "log").is_some());
        assert_eq!(both, Some(true));

        let blocked = outer.show(&view, || inner_no.show(&view, || "log").is_some());
        assert_eq!(blocked, Some(false));
    }

    #[test]
    fn plan_and_role_level_checks() {
        let store = CapabilityStore::new();
        store.hydrate(
            CapabilitySnapshot::builder()
                .plan_tags(["pro"])
                .role_level(50)
                .build(),
        );

        assert_eq!(CapabilityGate::plan("pro").evaluate(&store), GateOutcome::Granted);
        assert_eq!(CapabilityGate::plan("enterprise").evaluate(&store), GateOutcome::Denied);
        assert_eq!(CapabilityGate::min_role_level(50).evaluate(&store), GateOutcome::Granted);
        assert_eq!(CapabilityGate::min_role_level(51).evaluate(&store), GateOutcome::Denied);
    }

    #[test]
    fn stale_snapshot_still_gates() {
        let store = CapabilityStore::new();
        let t = store.begin_fetch();
        store.hydrate_ticketed(t, CapabilitySnapshot::new(["feed:post"], 0));
        store.mark_stale(store.begin_fetch());

        assert!(store.is_stale());
        assert_eq!(CapabilityGate::require("feed:post").evaluate(&store), GateOutcome::Granted);
    }
}
