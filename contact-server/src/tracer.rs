use std::{net::SocketAddr, time::Duration};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request, Response, header},
};
use tower_http::classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier};
use tower_http::trace::{DefaultOnBodyChunk, DefaultOnEos, MakeSpan, OnResponse, TraceLayer};
use tracing::{Span, error, field, info};

type TraceLayerType = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    HttpMakeSpan,
    fn(&Request<Body>, &Span),
    AccessLog,
    DefaultOnBodyChunk,
    DefaultOnEos,
    fn(ServerErrorsFailureClass, Duration, &Span),
>;

/// Placeholder used for access-log fields the request did not carry.
const ABSENT: &str = "-";

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(ABSENT)
}

/// Opens one span per request carrying the combined access-log fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(|| ABSENT.to_string(), |info| info.0.ip().to_string());
        let headers = request.headers();

        tracing::info_span!(
            "http_request",
            remote_addr = %remote_addr,
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.version(),
            referrer = %header_str(headers, header::REFERER),
            user_agent = %header_str(headers, header::USER_AGENT),
            status = field::Empty,
            length = field::Empty,
        )
    }
}

pub(crate) fn on_request_handler(req: &Request<Body>, span: &Span) {
    span.in_scope(|| {
        info!(
            method = %req.method(),
            uri = %req.uri(),
            "started processing request"
        );
    });
}

pub(crate) fn on_failure_handler(error: ServerErrorsFailureClass, latency: Duration, span: &Span) {
    span.in_scope(|| {
        error!(
            error = %error,
            latency = ?latency,
            "error processing request"
        );
    });
}

/// Emits the access-log line once the response head is ready.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessLog;

impl<B> OnResponse<B> for AccessLog {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status().as_u16();
        let length = header_str(response.headers(), header::CONTENT_LENGTH);

        span.record("status", status);
        span.record("length", length);
        span.in_scope(|| {
            info!(status, length, latency = ?latency, "finished processing request");
        });
    }
}

/// Request logging layer; outermost in the middleware stack.
#[must_use]
pub fn create_trace_layer() -> TraceLayerType {
    TraceLayer::new_for_http()
        .make_span_with(HttpMakeSpan)
        .on_request(on_request_handler as fn(&Request<Body>, &Span))
        .on_response(AccessLog)
        .on_failure(on_failure_handler as fn(ServerErrorsFailureClass, Duration, &Span))
}
