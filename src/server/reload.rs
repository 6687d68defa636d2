// src/server/reload.rs

//! Live reload: a broadcast hub, the SSE endpoint browsers subscribe to,
//! and the middleware that injects the client script into HTML pages.

use std::convert::Infallible;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tracing::warn;

/// Path of the Server-Sent Events stream.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Snippet appended to every served HTML page.
pub const CLIENT_SCRIPT: &str = r#"<script>(function () {
  var source = new EventSource("/__livereload");
  source.addEventListener("reload", function () { window.location.reload(); });
})();</script>"#;

/// Fan-out of reload notifications to every connected browser.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<String>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Tell every connected client that `unit` was rebuilt. Returns how many
    /// clients were listening.
    pub fn notify(&self, unit: &str) -> usize {
        self.tx.send(unit.to_string()).unwrap_or(0)
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// GET /__livereload: emits a `reload` event for every notification.
pub async fn sse_handler(State(hub): State<ReloadHub>) -> impl IntoResponse {
    let stream = BroadcastStream::new(hub.subscribe()).filter_map(|msg| {
        msg.ok()
            .map(|unit| Ok::<Event, Infallible>(Event::default().event("reload").data(unit)))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Insert [`CLIENT_SCRIPT`] before the last `</body>`, or append it when the
/// page has none.
pub fn inject_script(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + CLIENT_SCRIPT.len());
            out.push_str(&html[..idx]);
            out.push_str(CLIENT_SCRIPT);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{CLIENT_SCRIPT}"),
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"))
}

/// Response middleware: rewrite full `200 OK` HTML bodies answering a GET to
/// carry the client script. Partial content, HEAD and everything else pass
/// through untouched.
pub async fn inject_livereload(method: Method, response: Response) -> Response {
    if method != Method::GET || response.status() != StatusCode::OK || !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(err) => {
            warn!("failed to buffer HTML response: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body = match std::str::from_utf8(&bytes) {
        Ok(html) => Body::from(inject_script(html)),
        Err(_) => Body::from(bytes),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    // Byte offsets of the file no longer match the rewritten body.
    parts.headers.remove(header::ACCEPT_RANGES);
    Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body() {
        let out = inject_script("<html><body><p>x</p></BODY></html>");
        assert!(out.ends_with(&format!("{CLIENT_SCRIPT}</BODY></html>")));
        assert!(out.starts_with("<html><body><p>x</p>"));
    }

    #[test]
    fn script_is_appended_without_body_tag() {
        assert_eq!(inject_script("<p>hi</p>"), format!("<p>hi</p>{CLIENT_SCRIPT}"));
    }

    #[tokio::test]
    async fn notify_reaches_subscribers() {
        let hub = ReloadHub::new();
        assert_eq!(hub.notify("html"), 0);

        let mut rx = hub.subscribe();
        assert_eq!(hub.notify("style"), 1);
        assert_eq!(rx.recv().await.unwrap(), "style");
    }
}
