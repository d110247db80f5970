// Bearer token verification.

use serde_json::{Map, Value};

use crate::error::SessionError;
use crate::options::JwtOptions;
#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
use crate::options::JwtAlgorithm;

pub trait JwtProvider: Send + Sync {
    fn sign(&self, jwt: &JwtOptions, claims: &Map<String, Value>) -> Result<String, SessionError>;

    /// Returns the verified claims.
    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<Value, SessionError>;
}

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
struct NoJwtProvider;

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl JwtProvider for NoJwtProvider {
    fn sign(&self, _jwt: &JwtOptions, _claims: &Map<String, Value>) -> Result<String, SessionError> {
        Err(SessionError::Misconfigured(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)".to_string(),
        ))
    }

    fn verify(&self, _jwt: &JwtOptions, _token: &str) -> Result<Value, SessionError> {
        Err(SessionError::Misconfigured(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)".to_string(),
        ))
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
struct JsonwebtokenProvider;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JsonwebtokenProvider {
    fn algorithm(alg: JwtAlgorithm) -> jsonwebtoken::Algorithm {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }

    fn secret(jwt: &JwtOptions) -> Result<&[u8], SessionError> {
        jwt.secret
            .as_deref()
            .map(str::as_bytes)
            .ok_or_else(|| SessionError::Misconfigured("JWT secret is not configured".to_string()))
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtProvider for JsonwebtokenProvider {
    fn sign(&self, jwt: &JwtOptions, claims: &Map<String, Value>) -> Result<String, SessionError> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let header = Header::new(Self::algorithm(jwt.algorithm));
        encode(&header, claims, &EncodingKey::from_secret(Self::secret(jwt)?))
            .map_err(|e| SessionError::Misconfigured(e.to_string()))
    }

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<Value, SessionError> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let mut validation = Validation::new(Self::algorithm(jwt.algorithm));
        validation.set_issuer(&[jwt.issuer.as_str()]);
        validation.set_audience(&jwt.audience.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = jwt.leeway.as_secs();

        let decoded = decode::<Value>(
            token,
            &DecodingKey::from_secret(Self::secret(jwt)?),
            &validation,
        )
        .map_err(|e| SessionError::InvalidToken(e.to_string()))?;

        Ok(decoded.claims)
    }
}

/// Signs and verifies session tokens with the configured backend.
pub struct JwtVerifier {
    options: JwtOptions,
    provider: Box<dyn JwtProvider>,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithm", &self.options.algorithm)
            .field("issuer", &self.options.issuer)
            .field("audience", &self.options.audience)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    pub fn new(options: JwtOptions) -> Result<Self, SessionError> {
        options.validate().map_err(SessionError::Misconfigured)?;

        #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
        let provider: Box<dyn JwtProvider> = Box::new(JsonwebtokenProvider);
        #[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
        let provider: Box<dyn JwtProvider> = Box::new(NoJwtProvider);

        Ok(Self { options, provider })
    }

    pub fn options(&self) -> &JwtOptions {
        &self.options
    }

    /// `iss` and `aud` are filled in from the options when absent.
    pub fn sign(&self, mut claims: Map<String, Value>) -> Result<String, SessionError> {
        claims
            .entry("iss")
            .or_insert_with(|| Value::String(self.options.issuer.clone()));
        if let Some(aud) = self.options.audience.first() {
            claims
                .entry("aud")
                .or_insert_with(|| Value::String(aud.clone()));
        }
        self.provider.sign(&self.options, &claims)
    }

    pub fn verify(&self, token: &str) -> Result<Value, SessionError> {
        self.provider.verify(&self.options, token)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("  bearer   abc "), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("abc"), None);
    }

    #[test]
    fn verifier_requires_a_secret() {
        let err = JwtVerifier::new(JwtOptions::default()).unwrap_err();
        assert!(matches!(err, SessionError::Misconfigured(_)));
    }
}
