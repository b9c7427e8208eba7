//! Per-request correlation context.
//!
//! One context is created at request entry and carried through logging,
//! caching and error mapping for that request. It is never persisted.

use std::time::Instant;

use time::OffsetDateTime;

/// Request-scoped identity: correlation id plus start instant.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    started_at: Instant,
    started_at_utc: OffsetDateTime,
}

impl RequestContext {
    /// Begin a new request context with a freshly generated correlation id.
    ///
    /// Infallible: uuid-v4 generation cannot exhaust entropy in practice.
    #[must_use]
    pub fn begin() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Begin a request context with an externally supplied correlation id
    /// (e.g. an inbound `X-Request-ID` header set by a gateway).
    #[must_use]
    pub fn with_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            started_at: Instant::now(),
            started_at_utc: OffsetDateTime::now_utc(),
        }
    }

    /// The opaque correlation id for this request.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// When the request started, in wall-clock time.
    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at_utc
    }

    /// Milliseconds elapsed since the request started. Monotonic, never
    /// negative (`Instant`-based, immune to wall-clock adjustments).
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}
