//! # Errors (Feathers-style)
//!
//! The capability store and gates never fail: on any uncertainty they
//! degrade to "deny". Errors only exist at the edges, where a snapshot is
//! fetched or a bootstrap payload is served. Those edges report a
//! `CrewError`, which carries a status code and class name, can travel
//! inside `anyhow::Error`, and leaves serialization to the transport.

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::{json, Value};

/// Error classes that can surface at the fetch / session / bootstrap boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotAuthenticated,
    Forbidden,
    GeneralError,
    BadGateway,
    Unavailable,
    GatewayTimeout,
}

impl ErrorKind {
    /// (status, name, class name)
    fn parts(self) -> (u16, &'static str, &'static str) {
        match self {
            ErrorKind::BadRequest => (400, "BadRequest", "bad-request"),
            ErrorKind::NotAuthenticated => (401, "NotAuthenticated", "not-authenticated"),
            ErrorKind::Forbidden => (403, "Forbidden", "forbidden"),
            ErrorKind::GeneralError => (500, "GeneralError", "general-error"),
            ErrorKind::BadGateway => (502, "BadGateway", "bad-gateway"),
            ErrorKind::Unavailable => (503, "Unavailable", "unavailable"),
            ErrorKind::GatewayTimeout => (504, "GatewayTimeout", "gateway-timeout"),
        }
    }

    pub fn status_code(self) -> u16 {
        self.parts().0
    }

    pub fn name(self) -> &'static str {
        self.parts().1
    }

    pub fn class_name(self) -> &'static str {
        self.parts().2
    }
}

/// A structured crew error that can live inside `anyhow::Error`.
///
/// `message` and `data` are shown to clients; `source` is for logs only.
#[derive(Debug)]
pub struct CrewError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub source: Option<AnyError>,
}

impl CrewError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: impl Into<AnyError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `CrewError` anywhere in an `anyhow` context chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&CrewError> {
        err.chain().find_map(|e| e.downcast_ref::<CrewError>())
    }

    /// Client-facing JSON body. Never includes the source chain.
    pub fn to_json(&self) -> Value {
        let (code, name, class_name) = self.kind.parts();
        let mut body = json!({
            "name": name,
            "message": self.message,
            "code": code,
            "className": class_name,
        });
        if let Some(data) = &self.data {
            body["data"] = data.clone();
        }
        body
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
    pub fn gateway_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GatewayTimeout, msg)
    }
}

impl fmt::Display for CrewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind.name(), self.code(), self.message)
    }
}

impl std::error::Error for CrewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

/// Return early with a `CrewError` built from one of its constructors,
/// converted into the function's error type.
#[macro_export]
macro_rules! bail_crew {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::CrewError::$ctor($msg).into())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::CrewError::$ctor(format!($fmt, $($arg)*)).into())
    };
}
