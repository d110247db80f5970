use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::SessionError;
use crate::session::jwt::JwtVerifier;

/// A live, verified session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub subject: String,
    pub org_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub claims: Value,
}

impl Session {
    /// Build a session from verified JWT claims. `sub` and `exp` are required.
    pub fn from_claims(claims: Value) -> Result<Self, SessionError> {
        let subject = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SessionError::InvalidToken("missing sub claim".to_string()))?
            .to_string();
        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| SessionError::InvalidToken("missing exp claim".to_string()))?;
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| SessionError::InvalidToken(format!("exp out of range: {exp}")))?;
        let org_id = claims
            .get("org_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            subject,
            org_id,
            expires_at,
            claims,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Answers "is there a live session right now?".
///
/// `Ok(None)` means no session; `Err` means the authority could not answer.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, SessionError>;
}

#[async_trait]
impl<A: SessionAuthority + ?Sized> SessionAuthority for Arc<A> {
    async fn current_session(&self) -> Result<Option<Session>, SessionError> {
        (**self).current_session().await
    }
}

/// Verifies one bearer token. A missing, invalid or expired token is no session.
#[derive(Clone)]
pub struct JwtSessionAuthority {
    verifier: Arc<JwtVerifier>,
    token: Option<String>,
}

impl std::fmt::Debug for JwtSessionAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionAuthority")
            .field("verifier", &self.verifier)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl JwtSessionAuthority {
    pub fn new(verifier: Arc<JwtVerifier>, token: Option<String>) -> Self {
        Self { verifier, token }
    }

    /// Verify synchronously; used by request handlers that already hold the token.
    pub fn verify(&self) -> Result<Option<Session>, SessionError> {
        let Some(token) = self.token.as_deref() else {
            return Ok(None);
        };
        match self.verifier.verify(token) {
            Ok(claims) => Session::from_claims(claims).map(Some),
            Err(SessionError::InvalidToken(reason)) => {
                debug!(%reason, "rejecting session token");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}

#[async_trait]
impl SessionAuthority for JwtSessionAuthority {
    async fn current_session(&self) -> Result<Option<Session>, SessionError> {
        self.verify()
    }
}

/// Fixed answer, for tests and local development.
#[derive(Debug, Clone)]
pub struct StaticSessionAuthority {
    result: Result<Option<Session>, String>,
}

impl StaticSessionAuthority {
    pub fn signed_in(session: Session) -> Self {
        Self {
            result: Ok(Some(session)),
        }
    }

    pub fn signed_out() -> Self {
        Self { result: Ok(None) }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            result: Err(reason.into()),
        }
    }
}

#[async_trait]
impl SessionAuthority for StaticSessionAuthority {
    async fn current_session(&self) -> Result<Option<Session>, SessionError> {
        self.result.clone().map_err(SessionError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_from_claims() {
        let session = Session::from_claims(json!({
            "sub": "user-1",
            "exp": 2_000_000_000,
            "org_id": "org-9"
        }))
        .unwrap();

        assert_eq!(session.subject, "user-1");
        assert_eq!(session.org_id.as_deref(), Some("org-9"));
        assert_eq!(session.expires_at.timestamp(), 2_000_000_000);
        assert!(!session.is_expired_at(Utc.timestamp_opt(1_999_999_999, 0).unwrap()));
    }

    #[test]
    fn claims_without_subject_are_rejected() {
        let err = Session::from_claims(json!({ "exp": 1 })).unwrap_err();
        assert!(matches!(err, SessionError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn static_authority_answers() {
        assert!(StaticSessionAuthority::signed_out()
            .current_session()
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            StaticSessionAuthority::unavailable("down").current_session().await,
            Err(SessionError::Unavailable(_))
        ));
    }

    #[test]
    fn debug_output_hides_bearer_token() {
        let verifier = Arc::new(
            JwtVerifier::new(crate::options::JwtOptions {
                secret: Some("an-hmac-secret-that-is-long-enough!!".to_string()),
                ..Default::default()
            })
            .unwrap(),
        );
        let authority = JwtSessionAuthority::new(verifier, Some("header.body.signature".into()));
        let printed = format!("{authority:?}");

        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("header.body.signature"));
    }
}
