//! Snapshot fetcher contract and the HTTP RPC implementation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use crew_core::{CapabilitySnapshot, SnapshotParseError, TenantContext};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;
use crate::options::FetcherOptions;

/// Everything a fetch needs to scope the request.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchContext {
    pub tenant: TenantContext,
    pub access_token: Option<String>,
}

impl FetchContext {
    pub fn new(tenant: TenantContext) -> Self {
        Self {
            tenant,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn switch_location(&self, location: Option<&str>) -> Self {
        Self {
            tenant: self.tenant.switch_location(location),
            access_token: self.access_token.clone(),
        }
    }
}

impl fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchContext")
            .field("tenant", &self.tenant)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Retrieves the caller's capability snapshot from the remote authority.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self, ctx: &FetchContext) -> Result<CapabilitySnapshot, FetchError>;
}

#[async_trait]
impl<F: SnapshotFetcher + ?Sized> SnapshotFetcher for Arc<F> {
    async fn fetch(&self, ctx: &FetchContext) -> Result<CapabilitySnapshot, FetchError> {
        (**self).fetch(ctx).await
    }
}

#[derive(Serialize)]
struct RpcArgs<'a> {
    p_org_id: &'a str,
    p_location_id: Option<&'a str>,
}

/// Calls `POST {base_url}/rpc/{procedure}`.
#[derive(Debug, Clone)]
pub struct HttpSnapshotFetcher {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpSnapshotFetcher {
    pub fn new(options: FetcherOptions) -> Result<Self, FetchError> {
        options.validate().map_err(FetchError::Config)?;
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;
        Ok(Self::with_client(client, &options))
    }

    pub fn with_client(client: reqwest::Client, options: &FetcherOptions) -> Self {
        Self {
            client,
            endpoint: options.endpoint(),
            api_key: options.api_key.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self, ctx: &FetchContext) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &ctx.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| FetchError::Config("access token is not a valid header value".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| FetchError::Config("api key is not a valid header value".into()))?;
            headers.insert("apikey", value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch(&self, ctx: &FetchContext) -> Result<CapabilitySnapshot, FetchError> {
        let args = RpcArgs {
            p_org_id: &ctx.tenant.org_id.0,
            p_location_id: ctx.tenant.location_id.as_ref().map(|l| l.0.as_str()),
        };

        debug!(
            endpoint = %self.endpoint,
            org = %ctx.tenant.org_id,
            location = ?args.p_location_id,
            "fetching capability snapshot"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers(ctx)?)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            FetchError::Malformed(SnapshotParseError::new(format!("invalid JSON: {e}")))
        })?;
        parse_rpc_body(value)
    }
}

/// Set-returning procedures answer with a one-row array.
fn parse_rpc_body(value: Value) -> Result<CapabilitySnapshot, FetchError> {
    let value = match value {
        Value::Array(mut rows) => match rows.len() {
            1 => rows.remove(0),
            0 => {
                return Err(FetchError::Malformed(SnapshotParseError::new(
                    "procedure returned no rows",
                )))
            }
            n => {
                return Err(FetchError::Malformed(SnapshotParseError::new(
                    format!("procedure returned {n} rows"),
                )))
            }
        },
        other => other,
    };
    Ok(CapabilitySnapshot::from_value(value)?)
}
