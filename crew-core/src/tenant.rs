//! Multi-tenant scoping for capability lookups.

use std::fmt;

/// Organization identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrgId(pub String);

/// Location identifier inside an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationId(pub String);

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context carried into every snapshot fetch.
///
/// `location_id = None` asks the authority for org-wide permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub org_id: OrgId,
    pub location_id: Option<LocationId>,
}

impl TenantContext {
    pub fn new<S: Into<String>>(org: S) -> Self {
        Self {
            org_id: OrgId(org.into()),
            location_id: None,
        }
    }

    pub fn with_location<S: Into<String>>(mut self, location: S) -> Self {
        self.location_id = Some(LocationId(location.into()));
        self
    }

    /// Same org, different active location.
    pub fn switch_location(&self, location: Option<&str>) -> Self {
        Self {
            org_id: self.org_id.clone(),
            location_id: location.map(|l| LocationId(l.to_string())),
        }
    }
}
