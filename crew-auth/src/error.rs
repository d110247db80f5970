use crew_core::{CrewError, SnapshotParseError};
use serde_json::json;
use thiserror::Error;

/// Why a capability snapshot could not be obtained.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetcher misconfigured: {0}")]
    Config(String),

    #[error("capability request failed: {0}")]
    Transport(String),

    #[error("capability request timed out")]
    Timeout,

    #[error("capability endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Malformed(#[from] SnapshotParseError),
}

impl FetchError {
    /// Transport failures and timeouts may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Config(_) | FetchError::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Client-facing messages are fixed; the upstream detail only travels as
/// the error source, which is logged but never serialized.
impl From<FetchError> for CrewError {
    fn from(err: FetchError) -> Self {
        let crew = match &err {
            FetchError::Status { status: 401, .. } => {
                CrewError::not_authenticated("Capability authority rejected the session")
            }
            FetchError::Status { status: 403, .. } => {
                CrewError::forbidden("Capability authority denied access")
            }
            FetchError::Status { status, .. } => {
                CrewError::bad_gateway(format!("Capability authority returned {status}"))
                    .with_data(json!({ "upstreamStatus": status }))
            }
            FetchError::Transport(_) => CrewError::bad_gateway("Capability authority unreachable"),
            FetchError::Malformed(_) => {
                CrewError::bad_gateway("Capability authority returned a malformed snapshot")
            }
            FetchError::Timeout => CrewError::gateway_timeout("Capability authority timed out"),
            FetchError::Config(_) => CrewError::general_error("Capability fetcher misconfigured"),
        };
        crew.with_source(err)
    }
}

/// Session lookup failures. The guard treats all of them as "no session".
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    #[error("session verification misconfigured: {0}")]
    Misconfigured(String),

    #[error("session provider unavailable: {0}")]
    Unavailable(String),
}

impl From<SessionError> for CrewError {
    fn from(err: SessionError) -> Self {
        let crew = match &err {
            SessionError::InvalidToken(_) => CrewError::not_authenticated("Invalid session token"),
            SessionError::Misconfigured(_) => {
                CrewError::general_error("Session verification misconfigured")
            }
            SessionError::Unavailable(_) => {
                CrewError::unavailable("Session provider unavailable")
            }
        };
        crew.with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_core::ErrorKind;

    #[test]
    fn fetch_errors_map_to_gateway_kinds() {
        let cases = [
            (FetchError::Timeout, ErrorKind::GatewayTimeout),
            (FetchError::Transport("refused".into()), ErrorKind::BadGateway),
            (
                FetchError::Status { status: 500, body: "boom".into() },
                ErrorKind::BadGateway,
            ),
            (
                FetchError::Status { status: 401, body: String::new() },
                ErrorKind::NotAuthenticated,
            ),
            (
                FetchError::Status { status: 403, body: String::new() },
                ErrorKind::Forbidden,
            ),
            (FetchError::Config("no url".into()), ErrorKind::GeneralError),
        ];

        for (err, kind) in cases {
            assert_eq!(CrewError::from(err).kind, kind);
        }
    }

    #[test]
    fn upstream_body_stays_out_of_client_json() {
        let crew = CrewError::from(FetchError::Status {
            status: 500,
            body: "permission denied for table grants".into(),
        });
        let body = crew.to_json();

        assert_eq!(body["message"], "Capability authority returned 500");
        assert_eq!(body["data"]["upstreamStatus"], 500);
        assert!(!body.to_string().contains("grants"));
        assert!(std::error::Error::source(&crew)
            .unwrap()
            .to_string()
            .contains("grants"));
    }

    #[test]
    fn transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Status { status: 503, body: String::new() }.is_transient());
        assert!(!FetchError::Status { status: 404, body: String::new() }.is_transient());
        assert!(!FetchError::Config("x".into()).is_transient());
    }
}
