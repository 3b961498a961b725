//! HTTP request logging
//!
//! Each request produces one entry whose `httpRequest` key follows the Cloud
//! Logging `HttpRequest` layout, so the log viewer shows method, status and
//! latency inline.

use crate::Logger;
use http::header::{self, HeaderMap};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Instant;

/// The request summary logged under `httpRequest`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpPayload {
    /// e.g. "GET", "POST"
    pub request_method: String,

    /// The request target as received, e.g. "/some/info?color=red".
    pub request_url: String,

    pub status: u16,

    pub user_agent: String,

    /// Address of the peer that sent the request.
    pub remote_ip: String,

    /// Value of `x-forwarded-for`, when a proxy set one.
    pub forwarded_for: String,

    /// Time from `start` until `finish`, e.g. "1.503ms".
    pub duration: String,

    pub referrer: String,
}

/// Logs one entry per HTTP request.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    logger: Logger,
}

impl RequestLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Record the parts of `request` to log and start the clock.
    pub fn start<B>(&self, request: &http::Request<B>, remote: Option<SocketAddr>) -> InFlight<'_> {
        let headers = request.headers();
        InFlight {
            logger: &self.logger,
            started: Instant::now(),
            payload: HttpPayload {
                request_method: request.method().to_string(),
                request_url: request.uri().to_string(),
                user_agent: header_value(headers, header::USER_AGENT.as_str()),
                remote_ip: remote.map(|addr| addr.ip().to_string()).unwrap_or_default(),
                forwarded_for: header_value(headers, "x-forwarded-for"),
                referrer: header_value(headers, header::REFERER.as_str()),
                ..Default::default()
            },
            status: None,
        }
    }
}

/// A request that is being served.
#[must_use = "a request is only logged by `finish`"]
pub struct InFlight<'a> {
    logger: &'a Logger,
    started: Instant,
    payload: HttpPayload,
    status: Option<StatusCode>,
}

impl InFlight<'_> {
    /// Record the response status. Only the first status recorded counts,
    /// later ones are ignored like a second `WriteHeader`.
    pub fn record_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Log the request, at ERROR for 4xx and 5xx and INFO otherwise.
    ///
    /// `status` is used unless one was already recorded.
    pub fn finish(mut self, status: StatusCode) -> HttpPayload {
        self.record_status(status);
        let status = self.status.unwrap_or(status);

        let mut payload = self.payload;
        payload.status = status.as_u16();
        payload.duration = format!("{:?}", self.started.elapsed());

        let message = format!(
            "{} {} {}",
            payload.request_method,
            payload.request_url,
            status.canonical_reason().unwrap_or("")
        );
        let json = serde_json::to_string(&payload).unwrap_or_default();

        self.logger.in_scope(|| {
            if status.as_u16() >= 400 {
                tracing::error!(httpRequest = %json, "{}", message);
            } else {
                tracing::info!(httpRequest = %json, "{}", message);
            }
        });

        payload
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
