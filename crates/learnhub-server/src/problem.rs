//! Fault-to-HTTP mapping.
//!
//! The single place faults become HTTP-visible. Every user-visible error
//! response is an RFC 7807 body built here, tagged with the request's
//! correlation id, and every mapping emits a structured log record: expected
//! faults (4xx) at warn with the fault kind, unexpected faults at error with
//! the source chain. No component upstream formats an ad hoc error body.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use learnhub_core::{Fault, ProblemDetails, RequestContext};

/// Media type for RFC 7807 bodies.
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Map a fault to its problem body, logging it in the process.
pub fn to_problem(fault: &Fault, ctx: &RequestContext, instance: &str) -> ProblemDetails {
    if fault.is_expected() {
        tracing::warn!(
            request_id = %ctx.request_id(),
            fault_kind = %fault.kind(),
            instance = %instance,
            "{fault}"
        );
    } else {
        tracing::error!(
            request_id = %ctx.request_id(),
            fault_kind = %fault.kind(),
            instance = %instance,
            source = %source_chain(fault),
            "{fault}"
        );
    }

    ProblemDetails::from_fault(fault, ctx, instance)
}

/// Build the HTTP response for a fault.
pub fn problem_response(fault: &Fault, ctx: &RequestContext, instance: &str) -> Response {
    let problem = to_problem(fault, ctx, instance);
    let status =
        StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut res = (status, Json(problem)).into_response();
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
    );
    res
}

/// Render the error source chain for logging. Full detail stays in the logs;
/// the response body only ever carries the generic detail.
fn source_chain(fault: &Fault) -> String {
    let mut parts = Vec::new();
    let mut source = std::error::Error::source(fault);
    while let Some(err) = source {
        parts.push(err.to_string());
        source = err.source();
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" -> ")
    }
}
