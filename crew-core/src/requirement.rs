use serde::{Deserialize, Serialize};

/// A permission query evaluated against one snapshot.
///
/// Only three forms exist. Anything richer is expressed by nesting gates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionRequirement {
    Single(String),
    /// Satisfied when at least one token is; `AnyOf([])` is never satisfied.
    AnyOf(Vec<String>),
    /// Satisfied when every token is; `AllOf([])` is always satisfied.
    AllOf(Vec<String>),
}

impl PermissionRequirement {
    pub fn single(token: impl Into<String>) -> Self {
        Self::Single(token.into())
    }

    pub fn any_of<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(tokens.into_iter().map(Into::into).collect())
    }

    pub fn all_of<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllOf(tokens.into_iter().map(Into::into).collect())
    }

    /// Evaluate with `check` deciding each individual token.
    pub fn evaluate_with<F>(&self, mut check: F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        match self {
            Self::Single(token) => check(token),
            Self::AnyOf(tokens) => tokens.iter().any(|t| check(t)),
            Self::AllOf(tokens) => tokens.iter().all(|t| check(t)),
        }
    }
}

impl From<&str> for PermissionRequirement {
    fn from(token: &str) -> Self {
        Self::single(token)
    }
}

impl From<String> for PermissionRequirement {
    fn from(token: String) -> Self {
        Self::Single(token)
    }
}
