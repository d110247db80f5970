//! `GET /bootstrap`: verified session plus the caller's capability snapshot,
//! ready to be fed into a hydration bridge.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use crew_auth::{extract_bearer_token, FetchContext, JwtSessionAuthority, Session};
use crew_core::{bail_crew, CapabilitySnapshot, CrewError, TenantContext};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::CrewAxumError;
use crate::state::CrewAxumState;

pub const ORG_HEADER: &str = "x-org-id";
pub const LOCATION_HEADER: &str = "x-location-id";

#[derive(Debug, Serialize)]
pub struct BootstrapPayload {
    pub session: Session,
    pub snapshot: CapabilitySnapshot,
}

pub fn bootstrap_router(state: CrewAxumState) -> Router {
    Router::new()
        .route("/bootstrap", get(bootstrap))
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[instrument(skip_all)]
async fn bootstrap(
    State(state): State<CrewAxumState>,
    headers: HeaderMap,
) -> Result<Json<BootstrapPayload>, CrewAxumError> {
    let Some(token) = header(&headers, AUTHORIZATION.as_str()).and_then(extract_bearer_token)
    else {
        bail_crew!(not_authenticated, "No access token");
    };
    let token = token.to_string();

    let session = JwtSessionAuthority::new(state.verifier.clone(), Some(token.clone()))
        .verify()
        .map_err(CrewError::from)?
        .ok_or_else(|| CrewError::not_authenticated("Invalid or expired session"))?;

    let Some(org) = header(&headers, ORG_HEADER)
        .map(str::to_string)
        .or_else(|| session.org_id.clone())
    else {
        bail_crew!(bad_request, "Missing {} header", ORG_HEADER);
    };

    let mut tenant = TenantContext::new(org);
    if let Some(location) = header(&headers, LOCATION_HEADER) {
        tenant = tenant.with_location(location);
    }
    debug!(subject = %session.subject, org = %tenant.org_id, "bootstrapping capabilities");

    let ctx = FetchContext::new(tenant).with_access_token(token);
    let snapshot = state
        .fetcher
        .fetch(&ctx)
        .await
        .map_err(CrewError::from)?;

    Ok(Json(BootstrapPayload { session, snapshot }))
}
