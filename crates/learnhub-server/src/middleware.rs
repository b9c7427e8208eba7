use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use learnhub_core::{Principal, RequestContext, Role};

// =============================================================================
// Request Correlation Middleware
// =============================================================================

/// Middleware that opens the per-request correlation context.
///
/// Runs before any logging, cache or task work for the request:
/// 1. Honors an inbound `X-Request-ID` (gateway-assigned) or generates one
/// 2. Stores the `RequestContext` and `Principal` in request extensions
/// 3. Mirrors `X-Request-ID` and adds `X-Response-Time-ms` on the response
/// 4. Emits the access log record for the request
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static("x-request-id");

    // If the incoming request already has a request-id, preserve it; otherwise generate one
    let ctx = match req
        .headers()
        .get(&header_name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        Some(id) => RequestContext::with_id(id),
        None => RequestContext::begin(),
    };

    let principal = principal_from_headers(req.headers());
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    req.extensions_mut().insert(ctx.clone());
    req.extensions_mut().insert(principal);

    let mut res = next.run(req).await;

    let elapsed_ms = ctx.elapsed_ms();

    if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
        res.headers_mut().insert(header_name, value);
    }
    if let Ok(value) = HeaderValue::from_str(&elapsed_ms.to_string()) {
        res.headers_mut()
            .insert(HeaderName::from_static("x-response-time-ms"), value);
    }

    tracing::info!(
        target: "learnhub::access",
        method = %method,
        path = %path,
        status = %res.status().as_u16(),
        user_id = %principal
            .user_id
            .map_or_else(|| "-".to_string(), |id| id.to_string()),
        duration_ms = %elapsed_ms,
        request_id = %ctx.request_id(),
        "request handled"
    );

    res
}

// =============================================================================
// Principal Extraction
// =============================================================================

/// Read the current principal from the opaque identity headers set by the
/// upstream auth layer (`X-User-Id`, `X-User-Role`). This core does not
/// authenticate; missing or malformed headers mean anonymous.
pub fn principal_from_headers(headers: &HeaderMap) -> Principal {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .map(Role::parse)
        .unwrap_or(Role::Anonymous);

    match (user_id, role) {
        (Some(user_id), role) if role != Role::Anonymous => Principal {
            user_id: Some(user_id),
            role,
        },
        _ => Principal::anonymous(),
    }
}
