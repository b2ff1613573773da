//! Development server with live reload.
//!
//! Serves the output directory. Every HTML response gets a small client
//! that listens on `/__livereload`, a Server-Sent Events stream carrying
//! `styles` and `page` events from the build.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::handler::HandlerWithoutStateExt;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::services::ServeDir;

use super::relay::{relay_router, RelayState};
use crate::reload::BroadcastReload;
use crate::tasks::views::NOT_FOUND_DIRECTIVE;

/// Path of the reload event stream.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Script injected before `</body>` of every served page.
pub const RELOAD_CLIENT: &str = r#"<script>(function(){var s=new EventSource("/__livereload");s.addEventListener("page",function(){location.reload()});s.addEventListener("styles",function(){document.querySelectorAll('link[rel="stylesheet"]').forEach(function(l){var u=new URL(l.href);u.searchParams.set("livereload",Date.now());l.href=u.toString()})})})();</script>"#;

/// What the dev server serves.
#[derive(Debug, Clone)]
pub struct DevServer {
    /// Output directory
    pub root: PathBuf,
    /// File served at `/`, relative to `root`
    pub index: String,
    /// Stem of the error page (`error` for `error.php` / `error.html`)
    pub error_stem: String,
    /// Reload signal source
    pub reload: BroadcastReload,
    /// Relay mounted alongside the site, if any
    pub relay: Option<RelayState>,
}

/// Build the dev server router.
pub fn dev_router(server: DevServer) -> Router {
    let root = server.root.clone();
    let error_stem = server.error_stem.clone();
    let not_found = move || {
        let root = root.clone();
        let error_stem = error_stem.clone();
        async move { not_found_page(&root, &error_stem) }
    };

    let index_root = server.root.clone();
    let index_file = server.index.clone();
    let not_found_index = not_found.clone();
    let index = move || {
        let path = index_root.join(&index_file);
        let not_found = not_found_index.clone();
        async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(html) => Html(html).into_response(),
                Err(_) => not_found().await,
            }
        }
    };

    let mut router = Router::new()
        .route(LIVERELOAD_PATH, get(livereload))
        .with_state(server.reload.clone())
        .route("/", get(index));

    if let Some(relay) = server.relay {
        router = router.merge(relay_router(relay));
    }

    router
        .fallback_service(ServeDir::new(&server.root).not_found_service(not_found.into_service()))
        .layer(middleware::from_fn(inject_reload_client))
}

async fn livereload(
    State(reload): State<BroadcastReload>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(reload.subscribe()).filter_map(|signal| {
        // a lagged receiver skips missed signals; the next one still arrives
        signal.ok().map(|scope| Ok(Event::default().event(scope.as_str()).data(scope.as_str())))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// 404 response, with the site's own error page when one was built.
///
/// The production page is `<stem>.php` with the status directive in front;
/// the directive is dropped since the status is set here.
fn not_found_page(root: &Path, error_stem: &str) -> Response {
    let php = root.join(format!("{}.php", error_stem));
    let html = root.join(format!("{}.html", error_stem));

    let body = std::fs::read_to_string(&php)
        .map(|page| page.strip_prefix(NOT_FOUND_DIRECTIVE).map(str::to_string).unwrap_or(page))
        .or_else(|_| std::fs::read_to_string(&html));

    match body {
        Ok(page) => (StatusCode::NOT_FOUND, Html(page)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

/// Insert the reload client before the last `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], RELOAD_CLIENT, &html[pos..]),
        None => format!("{}{}", html, RELOAD_CLIENT),
    }
}

async fn inject_reload_client(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    let status = response.status();
    if !is_html || !(status == StatusCode::OK || status == StatusCode::NOT_FOUND) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "could not buffer page for reload injection");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let page = inject_client(&String::from_utf8_lossy(&bytes));

    parts.headers.remove(header::CONTENT_LENGTH);
    if let Ok(len) = HeaderValue::from_str(&page.len().to_string()) {
        parts.headers.insert(header::CONTENT_LENGTH, len);
    }
    Response::from_parts(parts, Body::from(page))
}
