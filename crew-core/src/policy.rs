//! The one place that decides whether a snapshot grants a token.

use crate::config::CrewConfigSnapshot;
use crate::snapshot::CapabilitySnapshot;

pub const DEFAULT_WILDCARD: &str = "*";
pub const DEFAULT_ADMIN_THRESHOLD: i32 = 90;

pub const ADMIN_THRESHOLD_KEY: &str = "capabilities.admin_threshold";
pub const WILDCARD_KEY: &str = "capabilities.wildcard";
pub const ADMIN_OVERRIDE_KEY: &str = "capabilities.admin_override";

/// How single tokens are granted.
///
/// A token is granted when it is in the snapshot, when the snapshot holds
/// the wildcard token, or when the role level reaches `admin_threshold`
/// (unless `admin_override` is off).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityPolicy {
    pub wildcard: String,
    pub admin_threshold: i32,
    pub admin_override: bool,
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self {
            wildcard: DEFAULT_WILDCARD.to_string(),
            admin_threshold: DEFAULT_ADMIN_THRESHOLD,
            admin_override: true,
        }
    }
}

impl CapabilityPolicy {
    pub fn from_config(config: &CrewConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            wildcard: config
                .get_string(WILDCARD_KEY)
                .filter(|w| !w.trim().is_empty())
                .unwrap_or(defaults.wildcard),
            admin_threshold: config
                .get_i32(ADMIN_THRESHOLD_KEY)
                .unwrap_or(defaults.admin_threshold),
            admin_override: config
                .get_bool(ADMIN_OVERRIDE_KEY)
                .unwrap_or(defaults.admin_override),
        }
    }

    pub fn with_admin_threshold(mut self, threshold: i32) -> Self {
        self.admin_threshold = threshold;
        self
    }

    pub fn is_admin(&self, snapshot: &CapabilitySnapshot) -> bool {
        self.admin_override && snapshot.role_level() >= self.admin_threshold
    }

    pub fn allows(&self, snapshot: &CapabilitySnapshot, token: &str) -> bool {
        snapshot.has_permission(token)
            || snapshot.has_permission(&self.wildcard)
            || self.is_admin(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrewConfig;

    #[test]
    fn role_level_override_applies_at_threshold() {
        let policy = CapabilityPolicy::default();

        assert!(policy.allows(&CapabilitySnapshot::new(Vec::<String>::new(), 90), "anything"));
        assert!(!policy.allows(&CapabilitySnapshot::new(Vec::<String>::new(), 89), "anything"));
    }

    #[test]
    fn wildcard_grants_every_token() {
        let policy = CapabilityPolicy::default();
        let snap = CapabilitySnapshot::new(["*"], 0);

        assert!(policy.allows(&snap, "inventory:delete"));
    }

    #[test]
    fn config_overrides_defaults() {
        let mut config = CrewConfig::new();
        config.set(ADMIN_THRESHOLD_KEY, "100");
        config.set(WILDCARD_KEY, "all");
        config.set(ADMIN_OVERRIDE_KEY, "false");

        let policy = CapabilityPolicy::from_config(&config.snapshot());
        assert_eq!(policy.admin_threshold, 100);
        assert_eq!(policy.wildcard, "all");

        let admin = CapabilitySnapshot::new(Vec::<String>::new(), 120);
        assert!(!policy.allows(&admin, "haccp:manage"));
        assert!(policy.allows(&CapabilitySnapshot::new(["all"], 0), "haccp:manage"));
    }

    #[test]
    fn invalid_config_values_fall_back() {
        let mut config = CrewConfig::new();
        config.set(ADMIN_THRESHOLD_KEY, "ninety");
        config.set(WILDCARD_KEY, " ");

        assert_eq!(
            CapabilityPolicy::from_config(&config.snapshot()),
            CapabilityPolicy::default()
        );
    }
}
