//! # Configuration
//!
//! crew keeps configuration in a flat string key/value store, in the
//! spirit of Feathers' `app.set()` / `app.get()`. Typed views are taken
//! from an immutable [`CrewConfigSnapshot`].
//!
//! ```rust
//! use crew_core::CrewConfig;
//!
//! let mut config = CrewConfig::new();
//! config.set("capabilities.admin_threshold", "80");
//!
//! let snap = config.snapshot();
//! assert_eq!(snap.get_i32("capabilities.admin_threshold"), Some(80));
//! ```
//!
//! Environment overrides use a prefix and `__` as the path separator:
//!
//! ```bash
//! export CREW__CAPABILITIES__ADMIN_THRESHOLD=95   # capabilities.admin_threshold
//! export CREW__FETCHER__TIMEOUT=5s                # fetcher.timeout
//! ```

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct CrewConfig {
    values: HashMap<String, String>,
}

impl CrewConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> CrewConfigSnapshot {
        CrewConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrewConfigSnapshot {
    map: HashMap<String, String>,
}

impl CrewConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(|v| v.trim().parse::<i32>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}

/// Copy `PREFIX__A__B=value` style variables into `config` as `a.b`.
pub fn load_env_config(config: &mut CrewConfig, prefix: &str) -> usize {
    load_config_from(config, prefix, std::env::vars())
}

/// Same as [`load_env_config`] over an explicit set of variables.
pub fn load_config_from<I>(config: &mut CrewConfig, prefix: &str, vars: I) -> usize
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut loaded = 0;
    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) {
            let normalized = stripped
                .to_lowercase()
                .replace("__", ".");
            if normalized.is_empty() {
                continue;
            }
            tracing::debug!("config override from environment: {normalized}");
            config.set(normalized, value);
            loaded += 1;
        }
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_are_normalized_to_dotted_paths() {
        let mut config = CrewConfig::new();
        let vars = vec![
            ("CREW__CAPABILITIES__ADMIN_THRESHOLD".to_string(), "95".to_string()),
            ("CREW__FETCHER__BASE_URL".to_string(), "http://authority".to_string()),
            ("HOME".to_string(), "/root".to_string()),
            ("CREWMATE".to_string(), "x".to_string()),
        ];

        let loaded = load_config_from(&mut config, "CREW", vars);

        assert_eq!(loaded, 2);
        assert_eq!(config.get("capabilities.admin_threshold"), Some("95"));
        assert_eq!(config.get("fetcher.base_url"), Some("http://authority"));
        assert!(!config.has("home"));
        assert!(!config.has("mate"));
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let mut config = CrewConfig::new();
        config.set("capabilities.admin_override", "false");
        let snap = config.snapshot();
        config.set("capabilities.admin_override", "true");

        assert_eq!(snap.get_bool("capabilities.admin_override"), Some(false));
        assert_eq!(snap.get_i32("capabilities.admin_override"), None);
    }
}
