//! Control-plane HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and shared helpers for identifying the
//! calling actor and collecting request context for access-attempt logs.
//!
//! # Security considerations
//! Authentication happens upstream; the gateway forwards the authenticated
//! actor in the `x-actor-id` header and this layer trusts it.
pub mod access;
pub mod admin;
pub mod audit;
pub mod error;
pub mod openapi;
pub mod requests;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_unauthorized};
use crate::governance::AttemptMetadata;
use axum::http::HeaderMap;
use gatehouse_authz::ActorId;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// Headers copied into access-attempt metadata, with the key they are stored under.
const METADATA_HEADERS: [(&str, &str); 3] = [
    ("user-agent", "user_agent"),
    ("x-forwarded-for", "forwarded_for"),
    ("x-request-id", "request_id"),
];

/// Resolve the calling actor from request headers.
///
/// # Errors
/// - Returns 401 when the header is missing, blank, or not valid UTF-8.
pub(crate) fn caller(headers: &HeaderMap) -> Result<ActorId, ApiError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ActorId::new)
        .ok_or_else(|| api_unauthorized("missing x-actor-id header"))
}

pub(crate) fn attempt_metadata(headers: &HeaderMap) -> AttemptMetadata {
    METADATA_HEADERS
        .iter()
        .filter_map(|(header, key)| {
            let value = headers.get(*header)?.to_str().ok()?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
