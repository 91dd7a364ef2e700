use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, field, info, info_span};
use uuid::Uuid;

use crate::api::AppState;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client supplied request id that is echoed back.
const MAX_REQUEST_ID_LEN: usize = 64;

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

/// Part of the site a route template belongs to.
#[must_use]
pub fn section_for(route: &str) -> &'static str {
    match route {
        "/" | "/search/" => "listing",
        r if r.starts_with("/tag/") => "listing",
        r if r.starts_with("/post/") => "post",
        r if ["/addpost/", "/editpost/", "/deletepost/"]
            .iter()
            .any(|p| r.starts_with(p)) =>
        {
            "editor"
        }
        r if r.starts_with("/password-reset") => "password_reset",
        r if r.starts_with("/accounts/") => "session",
        "/register/" | "/check-email/" | "/success/" | "/profile/" => "account",
        r if r.starts_with("/activate/") => "account",
        _ => "other",
    }
}

/// Keeps a sane incoming request id, otherwise mints a new one.
fn request_id(req: &Request) -> String {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string)
}

/// Runs the request inside a `request` span and closes it with one wide
/// event. `actor_middleware` fills in `user_id` and `username` from inside
/// the span.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(&req);
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |mp| mp.as_str().to_string());
    let section = section_for(&route);

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %req.uri().path(),
        route = %route,
        section,
        user_id = field::Empty,
        username = field::Empty,
    );

    async move {
        let mut response = next.run(req).await;
        let status = response.status();
        let elapsed = start.elapsed();

        let labels = [
            ("method", method.to_string()),
            ("path", route),
            ("status", status.as_u16().to_string()),
        ];
        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(elapsed.as_secs_f64());
        if method == Method::GET && status.is_success() {
            metrics::counter!("folio_page_views_total", "section" => section).increment(1);
        }

        let outcome = if status.is_server_error() {
            "error"
        } else if status.is_client_error() {
            "client_error"
        } else if status.is_redirection() {
            "redirect"
        } else {
            "success"
        };

        info!(
            event = "http_request_finished",
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            status_code = status.as_u16(),
            outcome,
            "Request finished"
        );

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; img-src 'self' data: https:; \
    script-src 'self' https://www.google.com/recaptcha/ https://www.gstatic.com/recaptcha/; \
    frame-src https://www.google.com/recaptcha/; style-src 'self' 'unsafe-inline'; \
    frame-ancestors 'none'; base-uri 'self'";

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    for (name, value) in [
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("referrer-policy", "strict-origin-when-cross-origin"),
        ("content-security-policy", CONTENT_SECURITY_POLICY),
    ] {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::section_for;

    #[test]
    fn routes_map_to_sections() {
        assert_eq!(section_for("/"), "listing");
        assert_eq!(section_for("/tag/{name}/"), "listing");
        assert_eq!(section_for("/post/{id}/"), "post");
        assert_eq!(section_for("/editpost/{id}/"), "editor");
        assert_eq!(section_for("/accounts/login/"), "session");
        assert_eq!(section_for("/activate/{uid}/{token}/"), "account");
        assert_eq!(section_for("/password-reset-confirm/{uid}/{token}/"), "password_reset");
        assert_eq!(section_for("unmatched"), "other");
    }
}
