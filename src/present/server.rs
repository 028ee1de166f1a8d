//! Serve mode: a one-page HTTP server on an ephemeral local port.
//!
//! `GET /` renders the report with a hook that requests `GET /loaded` once
//! the page has loaded in the browser. The first such request ends the wait
//! and the server shuts down, unless it was asked to keep running.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use super::PresentError;
use crate::config::Config;
use crate::report::Report;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    /// Ignore the load signal and serve until cancelled.
    pub keep_running: bool,
    pub load_timeout: Duration,
}

impl From<&Config> for ServeOptions {
    fn from(config: &Config) -> Self {
        Self {
            keep_running: config.keep_running,
            load_timeout: config.load_timeout,
        }
    }
}

/// What ended the wait in serve mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    TimedOut,
    Cancelled,
}

#[derive(Clone)]
pub struct ServerState {
    report: Arc<Report>,
    loaded: mpsc::Sender<()>,
}

impl ServerState {
    pub fn new(report: Report, loaded: mpsc::Sender<()>) -> Self {
        Self {
            report: Arc::new(report),
            loaded,
        }
    }
}

/// Build the router for the report page.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/loaded", get(loaded))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<ServerState>) -> Response {
    match state.report.render(true) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "error rendering html");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering HTML: {e}"),
            )
                .into_response()
        }
    }
}

async fn loaded(State(state): State<ServerState>) -> StatusCode {
    if state.loaded.try_send(()).is_err() {
        debug!("load signal already pending");
    }
    StatusCode::OK
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

/// Serve `report` on `localhost`, hand the URL to `launch`, then wait for
/// the page to load, the timeout, or `cancel`, and shut the server down.
pub async fn serve<L>(
    report: Report,
    options: &ServeOptions,
    cancel: &CancellationToken,
    launch: L,
) -> Result<LoadOutcome, PresentError>
where
    L: FnOnce(&str) -> std::io::Result<()>,
{
    let (loaded_tx, mut loaded_rx) = mpsc::channel(1);
    let app = router(ServerState::new(report, loaded_tx));

    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .map_err(PresentError::Bind)?;
    let port = listener.local_addr().map_err(PresentError::Bind)?.port();

    let shutdown = cancel.child_token();
    let server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
        }
    });

    let url = format!("http://localhost:{port}");
    info!(%url, "serving report");

    if let Err(e) = launch(&url) {
        shutdown.cancel();
        let _ = server.await;
        return Err(PresentError::Browser(e));
    }

    let outcome = if options.keep_running {
        cancel.cancelled().await;
        LoadOutcome::Cancelled
    } else {
        tokio::select! {
            Some(()) = loaded_rx.recv() => LoadOutcome::Loaded,
            _ = tokio::time::sleep(options.load_timeout) => LoadOutcome::TimedOut,
            _ = cancel.cancelled() => LoadOutcome::Cancelled,
        }
    };

    match outcome {
        LoadOutcome::Loaded => debug!("browser loaded the page"),
        LoadOutcome::TimedOut => error!(
            timeout = ?options.load_timeout,
            "browser did not load the page in time"
        ),
        LoadOutcome::Cancelled => debug!("serve cancelled"),
    }

    debug!("shutting down the server");
    shutdown.cancel();
    match server.await {
        Ok(Ok(())) => Ok(outcome),
        Ok(Err(e)) => Err(PresentError::Serve(e)),
        Err(e) => Err(PresentError::Serve(std::io::Error::new(
            std::io::ErrorKind::Other,
            e,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Timeline;
    use axum::body::Body;
    use axum::http::Request;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt; // for `oneshot`

    fn empty_report() -> Report {
        Report::new(&Timeline::default())
    }

    fn options(keep_running: bool, load_timeout: Duration) -> ServeOptions {
        ServeOptions {
            keep_running,
            load_timeout,
        }
    }

    #[tokio::test]
    async fn test_index_serves_page_with_load_hook() {
        let (tx, _rx) = mpsc::channel(1);
        let app = router(ServerState::new(empty_report(), tx));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("0 passed, 0 failed"));
        assert!(html.contains("fetch('/loaded')"));
    }

    #[tokio::test]
    async fn test_loaded_signals_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let app = router(ServerState::new(empty_report(), tx));

        for _ in 0..3 {
            let request = Request::builder().uri("/loaded").body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(rx.try_recv(), Ok(()));
        assert!(rx.try_recv().is_err(), "extra signals are dropped");
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (tx, _rx) = mpsc::channel(1);
        let app = router(ServerState::new(empty_report(), tx));

        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn http_get(port: u16, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect((Ipv4Addr::LOCALHOST, port))
            .await
            .unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn port_of(url: &str) -> u16 {
        url.rsplit(':').next().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_serve_until_loaded() {
        let token = CancellationToken::new();
        let outcome = serve(
            empty_report(),
            &options(false, Duration::from_secs(10)),
            &token,
            |url| {
                let port = port_of(url);
                tokio::spawn(async move {
                    let page = http_get(port, "/").await;
                    assert!(page.starts_with("HTTP/1.1 200"));
                    http_get(port, "/loaded").await;
                });
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome, LoadOutcome::Loaded);
    }

    #[tokio::test]
    async fn test_serve_times_out() {
        let token = CancellationToken::new();
        let outcome = serve(
            empty_report(),
            &options(false, Duration::from_millis(50)),
            &token,
            |_| Ok(()),
        )
        .await
        .unwrap();

        assert_eq!(outcome, LoadOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_keep_running_ignores_load_signal() {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let outcome = serve(
            empty_report(),
            &options(true, Duration::from_millis(10)),
            &token,
            |url| {
                let port = port_of(url);
                tokio::spawn(async move {
                    http_get(port, "/loaded").await;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    cancel.cancel();
                });
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome, LoadOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_browser_error() {
        let token = CancellationToken::new();
        let result = serve(
            empty_report(),
            &options(false, Duration::from_secs(10)),
            &token,
            |_| Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser")),
        )
        .await;

        assert!(matches!(result, Err(PresentError::Browser(_))));
    }
}
