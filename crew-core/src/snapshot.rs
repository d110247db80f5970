//! Capability snapshots and the wire payload they are parsed from.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Point-in-time description of what the current principal may do.
///
/// Built once, then shared behind an `Arc` by the store. There are no
/// mutating methods; a change of capabilities is a new snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySnapshot {
    permissions: BTreeSet<String>,
    role_level: i32,
    org_role_tags: BTreeSet<String>,
    location_role_tags: BTreeSet<String>,
    feature_tags: BTreeSet<String>,
    plan_tags: BTreeSet<String>,
    active_location_id: Option<String>,
}

impl CapabilitySnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Shorthand for the common "tokens + role level" shape.
    pub fn new<I, S>(permissions: I, role_level: i32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder()
            .permissions(permissions)
            .role_level(role_level)
            .build()
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn has_permission(&self, token: &str) -> bool {
        self.permissions.contains(token)
    }

    pub fn role_level(&self) -> i32 {
        self.role_level
    }

    pub fn org_role_tags(&self) -> &BTreeSet<String> {
        &self.org_role_tags
    }

    pub fn location_role_tags(&self) -> &BTreeSet<String> {
        &self.location_role_tags
    }

    pub fn feature_tags(&self) -> &BTreeSet<String> {
        &self.feature_tags
    }

    pub fn plan_tags(&self) -> &BTreeSet<String> {
        &self.plan_tags
    }

    pub fn active_location_id(&self) -> Option<&str> {
        self.active_location_id.as_deref()
    }

    /// Parse a remote payload into a fully defaulted snapshot.
    pub fn from_value(value: Value) -> Result<Self, SnapshotParseError> {
        if !value.is_object() {
            return Err(SnapshotParseError::new(format!(
                "expected a JSON object, got {}",
                json_type_name(&value)
            )));
        }
        let payload: SnapshotPayload =
            serde_json::from_value(value).map_err(|e| SnapshotParseError::new(e.to_string()))?;
        Ok(payload.into_snapshot())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SnapshotParseError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| SnapshotParseError::new(e.to_string()))?;
        Self::from_value(value)
    }
}

impl<'de> Deserialize<'de> for CapabilitySnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        SnapshotPayload::deserialize(deserializer).map(SnapshotPayload::into_snapshot)
    }
}

#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    inner: CapabilitySnapshot,
}

impl SnapshotBuilder {
    pub fn permissions<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.permissions.extend(clean_tags(tokens));
        self
    }

    pub fn role_level(mut self, level: i32) -> Self {
        self.inner.role_level = level;
        self
    }

    pub fn org_role_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.org_role_tags.extend(clean_tags(tags));
        self
    }

    pub fn location_role_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.location_role_tags.extend(clean_tags(tags));
        self
    }

    pub fn feature_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.feature_tags.extend(clean_tags(tags));
        self
    }

    pub fn plan_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.plan_tags.extend(clean_tags(tags));
        self
    }

    pub fn active_location_id(mut self, location: Option<impl Into<String>>) -> Self {
        self.inner.active_location_id = location
            .map(Into::into)
            .filter(|l: &String| !l.trim().is_empty());
        self
    }

    pub fn build(self) -> CapabilitySnapshot {
        self.inner
    }
}

fn clean_tags<I, S>(tags: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter()
        .map(Into::into)
        .map(|t: String| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Raw shape returned by the capability authority.
///
/// Every field is optional and `null` is treated like "absent"; camelCase
/// and snake_case keys are both accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotPayload {
    pub permissions: Option<Vec<String>>,
    #[serde(alias = "role_level")]
    pub role_level: Option<i32>,
    #[serde(alias = "org_role_tags")]
    pub org_role_tags: Option<Vec<String>>,
    #[serde(alias = "location_role_tags")]
    pub location_role_tags: Option<Vec<String>>,
    #[serde(alias = "feature_tags")]
    pub feature_tags: Option<Vec<String>>,
    #[serde(alias = "plan_tags")]
    pub plan_tags: Option<Vec<String>>,
    #[serde(alias = "active_location_id")]
    pub active_location_id: Option<String>,
}

impl SnapshotPayload {
    pub fn into_snapshot(self) -> CapabilitySnapshot {
        CapabilitySnapshot::builder()
            .permissions(self.permissions.unwrap_or_default())
            .role_level(self.role_level.unwrap_or(0))
            .org_role_tags(self.org_role_tags.unwrap_or_default())
            .location_role_tags(self.location_role_tags.unwrap_or_default())
            .feature_tags(self.feature_tags.unwrap_or_default())
            .plan_tags(self.plan_tags.unwrap_or_default())
            .active_location_id(self.active_location_id)
            .build()
    }
}

/// The payload could not be read as a snapshot at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotParseError {
    pub message: String,
}

impl SnapshotParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SnapshotParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed capability snapshot: {}", self.message)
    }
}

impl std::error::Error for SnapshotParseError {}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_default_to_empty() {
        let snap = CapabilitySnapshot::from_value(json!({})).unwrap();

        assert!(snap.permissions().is_empty());
        assert_eq!(snap.role_level(), 0);
        assert!(snap.feature_tags().is_empty());
        assert_eq!(snap.active_location_id(), None);
    }

    #[test]
    fn nulls_are_treated_as_absent() {
        let snap = CapabilitySnapshot::from_value(json!({
            "permissions": null,
            "roleLevel": null,
            "activeLocationId": null,
        }))
        .unwrap();

        assert_eq!(snap, CapabilitySnapshot::default());
    }

    #[test]
    fn accepts_camel_and_snake_case() {
        let camel = CapabilitySnapshot::from_value(json!({
            "permissions": ["haccp:view", "haccp:view", "shifts:edit"],
            "roleLevel": 40,
            "orgRoleTags": ["manager"],
            "locationRoleTags": ["shift_lead"],
            "featureTags": ["haccp"],
            "planTags": ["pro"],
            "activeLocationId": "loc-1",
        }))
        .unwrap();
        let snake = CapabilitySnapshot::from_value(json!({
            "permissions": ["shifts:edit", "haccp:view"],
            "role_level": 40,
            "org_role_tags": ["manager"],
            "location_role_tags": ["shift_lead"],
            "feature_tags": ["haccp"],
            "plan_tags": ["pro"],
            "active_location_id": "loc-1",
        }))
        .unwrap();

        assert_eq!(camel, snake);
        assert_eq!(camel.permissions().len(), 2);
        assert_eq!(camel.active_location_id(), Some("loc-1"));
    }

    #[test]
    fn blank_tokens_and_locations_are_dropped() {
        let snap = CapabilitySnapshot::from_value(json!({
            "permissions": ["", "  ", " inventory:view "],
            "activeLocationId": "   ",
        }))
        .unwrap();

        assert_eq!(
            snap.permissions().iter().collect::<Vec<_>>(),
            vec!["inventory:view"]
        );
        assert_eq!(snap.active_location_id(), None);
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        let err = CapabilitySnapshot::from_value(json!(["haccp:view"])).unwrap_err();
        assert!(err.message.contains("an array"));

        let err = CapabilitySnapshot::from_value(json!({"roleLevel": "admin"})).unwrap_err();
        assert!(err.to_string().starts_with("malformed capability snapshot"));
    }

    #[test]
    fn serializes_camel_case_and_reads_back() {
        let snap = CapabilitySnapshot::builder()
            .permissions(["feed:post"])
            .role_level(20)
            .plan_tags(["starter"])
            .build();

        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["roleLevel"], 20);
        assert_eq!(value["planTags"], json!(["starter"]));

        let back: CapabilitySnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snap);
    }
}
