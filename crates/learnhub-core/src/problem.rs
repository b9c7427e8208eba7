//! RFC 7807 Problem Details error body.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::correlation::RequestContext;
use crate::error::Fault;

/// Standardized machine-readable error body (RFC 7807).
///
/// Constructed fresh per fault, 1:1 with a single faulted request; never
/// persisted. Carries the request correlation id as `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: Value,
    pub instance: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub request_id: String,
}

impl ProblemDetails {
    /// Build a problem body for a fault raised while handling a request.
    ///
    /// Unexpected faults get a generic detail: internals and stack traces
    /// never leak into the response body.
    #[must_use]
    pub fn from_fault(fault: &Fault, ctx: &RequestContext, instance: impl Into<String>) -> Self {
        let status = fault.status();
        let detail = match fault {
            Fault::Validation { message, errors } if !errors.is_empty() => {
                let fields: serde_json::Map<String, Value> = errors
                    .iter()
                    .map(|(field, msg)| (field.clone(), Value::String(msg.clone())))
                    .collect();
                serde_json::json!({ "message": message, "errors": fields })
            }
            Fault::Unexpected(_) => Value::String("Internal server error".to_string()),
            other => Value::String(other.to_string()),
        };

        Self {
            problem_type: format!("https://httpstatuses.com/{status}"),
            title: status_title(status).to_string(),
            status,
            detail,
            instance: instance.into(),
            timestamp: OffsetDateTime::now_utc(),
            request_id: ctx.request_id().to_string(),
        }
    }
}

fn status_title(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Error",
    }
}
