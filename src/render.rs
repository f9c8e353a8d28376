//! Page rendering: turning a URL into HTML.
//!
//! The browser driver is an external collaborator. Everything the crawler
//! needs from it is captured by the [`Renderer`] trait: given a
//! [`RenderRequest`], produce the page's HTML after client-side scripts have
//! run. Two implementations ship with the crate:
//!
//! - [`HttpRenderer`]: a plain HTTP GET. No scripts run, so the settle and
//!   scroll timings do not apply; a ready condition is honored by
//!   re-fetching until the selector shows up or the timeout passes.
//! - [`CommandRenderer`]: runs an external headless browser that prints the
//!   rendered DOM on stdout (for example `chromium --headless --dump-dom`).
//!
//! [`AnyRenderer`] picks one at runtime from the config. Retries live in
//! [`crate::retry::RetryRenderer`], not here.

use crate::error::FetchError;
use crate::utils::truncate_for_log;
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Scroll to the bottom, wait, scroll back to the top, wait.
///
/// Triggers lazy-loaded content on renderers that execute scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollCycle {
    pub bottom_wait: Duration,
    pub top_wait: Duration,
}

/// Block until an element matching `selector` is present.
///
/// Timing out is not an error: the renderer logs a warning and returns
/// whatever HTML it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyCondition {
    pub selector: String,
    pub timeout: Duration,
    /// Extra wait once the element appeared, for late rendering.
    pub settle_after: Duration,
}

/// One page to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub url: String,
    /// Fixed delay after navigation.
    pub settle: Duration,
    pub scroll: Option<ScrollCycle>,
    pub ready: Option<ReadyCondition>,
}

impl RenderRequest {
    /// A request with no waiting at all, for static documents like feeds.
    pub fn document(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            settle: Duration::ZERO,
            scroll: None,
            ready: None,
        }
    }

    /// Time a script-executing renderer should let the page run before
    /// capturing it: settle, the scroll cycle waits and the post-ready wait.
    pub fn script_budget(&self) -> Duration {
        let scroll = self
            .scroll
            .map(|s| s.bottom_wait + s.top_wait)
            .unwrap_or_default();
        let after_ready = self.ready.as_ref().map(|r| r.settle_after).unwrap_or_default();
        self.settle + scroll + after_ready
    }
}

/// Anything that can produce rendered HTML for a URL.
pub trait Renderer {
    /// Render the page, or fail with a transient [`FetchError`].
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError>;
}

impl<R: Renderer> Renderer for &R {
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        (**self).render(request).await
    }
}

/// True when `html` contains at least one element matching `selector`.
///
/// An unparseable selector counts as present so a bad ready condition never
/// stalls a run.
pub fn selector_present(html: &str, selector: &str) -> bool {
    let Ok(sel) = Selector::parse(selector) else {
        warn!(%selector, "Ready selector does not parse; not waiting for it");
        return true;
    };
    Html::parse_document(html).select(&sel).next().is_some()
}

/// Plain HTTP renderer backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
    poll_interval: Duration,
}

impl HttpRenderer {
    pub fn new(user_agent: &str, request_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .build()
            .map_err(|source| FetchError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            poll_interval: Duration::from_secs(2),
        })
    }

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })
    }
}

impl Renderer for HttpRenderer {
    #[instrument(level = "debug", skip_all, fields(url = %request.url))]
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let mut html = self.get(&request.url).await?;

        if let Some(ready) = &request.ready {
            while !selector_present(&html, &ready.selector) {
                if t0.elapsed() + self.poll_interval > ready.timeout {
                    warn!(
                        url = %request.url,
                        selector = %ready.selector,
                        timeout_secs = ready.timeout.as_secs(),
                        "Ready selector not found; continuing with current HTML"
                    );
                    return Ok(html);
                }
                sleep(self.poll_interval).await;
                html = self.get(&request.url).await?;
            }
        }

        debug!(bytes = html.len(), elapsed_ms = t0.elapsed().as_millis() as u64, "Fetched page");
        Ok(html)
    }
}

/// Renderer that shells out to a headless browser.
///
/// Arguments may contain `{url}` and `{budget_ms}` placeholders; the latter
/// receives [`RenderRequest::script_budget`] in milliseconds so the browser
/// lets scripts run for the settle, scroll and post-ready time.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    fn expand_args(&self, request: &RenderRequest) -> Vec<String> {
        let budget = request.script_budget().as_millis().to_string();
        self.args
            .iter()
            .map(|a| a.replace("{url}", &request.url).replace("{budget_ms}", &budget))
            .collect()
    }
}

impl Renderer for CommandRenderer {
    #[instrument(level = "debug", skip_all, fields(url = %request.url, program = %self.program))]
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        let budget = self.timeout
            + request.script_budget()
            + request.ready.as_ref().map(|r| r.timeout).unwrap_or_default();

        let run = Command::new(&self.program)
            .args(self.expand_args(request))
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(budget, run)
            .await
            .map_err(|_| FetchError::Timeout {
                url: request.url.clone(),
                secs: budget.as_secs(),
            })?
            .map_err(|e| FetchError::Command {
                program: self.program.clone(),
                url: request.url.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Command {
                program: self.program.clone(),
                url: request.url.clone(),
                detail: format!("{}: {}", output.status, truncate_for_log(stderr.trim(), 300)),
            });
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        if let Some(ready) = &request.ready {
            if !selector_present(&html, &ready.selector) {
                warn!(
                    url = %request.url,
                    selector = %ready.selector,
                    "Ready selector not found in rendered DOM; continuing"
                );
            }
        }
        Ok(html)
    }
}

/// Runtime choice between the shipped renderers.
#[derive(Debug, Clone)]
pub enum AnyRenderer {
    Http(HttpRenderer),
    Command(CommandRenderer),
}

impl Renderer for AnyRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        match self {
            AnyRenderer::Http(r) => r.render(request).await,
            AnyRenderer::Command(r) => r.render(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn request() -> RenderRequest {
        RenderRequest {
            url: "https://example.com/blog".to_string(),
            settle: Duration::from_secs(5),
            scroll: Some(ScrollCycle {
                bottom_wait: Duration::from_secs(2),
                top_wait: Duration::from_secs(1),
            }),
            ready: None,
        }
    }

    #[test]
    fn test_script_budget_sums_settle_and_scroll() {
        assert_eq!(request().script_budget(), Duration::from_secs(8));
        assert_eq!(
            RenderRequest::document("https://example.com/feed.xml").script_budget(),
            Duration::ZERO
        );
    }

    #[test]
    fn test_script_budget_includes_post_ready_wait() {
        let mut req = request();
        req.ready = Some(ReadyCondition {
            selector: "article".to_string(),
            timeout: Duration::from_secs(20),
            settle_after: Duration::from_secs(2),
        });
        assert_eq!(req.script_budget(), Duration::from_secs(10));
    }

    #[test]
    fn test_selector_present() {
        let html = r#"<div id="__APP"><a href="/blog/x">x</a></div>"#;
        assert!(selector_present(html, r#"#__APP a[href*="/blog/"]"#));
        assert!(!selector_present(html, "article"));
        assert!(selector_present(html, "[[[not a selector"));
    }

    #[test]
    fn test_command_args_expand_placeholders() {
        let r = CommandRenderer::new(
            "chromium",
            vec![
                "--headless".to_string(),
                "--virtual-time-budget={budget_ms}".to_string(),
                "--dump-dom".to_string(),
                "{url}".to_string(),
            ],
            Duration::from_secs(30),
        );
        assert_eq!(
            r.expand_args(&request()),
            vec![
                "--headless",
                "--virtual-time-budget=8000",
                "--dump-dom",
                "https://example.com/blog",
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_renderer_captures_stdout() {
        let r = CommandRenderer::new(
            "echo",
            vec!["<html><body>{url}</body></html>".to_string()],
            Duration::from_secs(5),
        );
        let html = r
            .render(&RenderRequest::document("https://example.com/a"))
            .await
            .unwrap();
        assert!(html.contains("<body>https://example.com/a</body>"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_renderer_nonzero_exit_is_error() {
        let r = CommandRenderer::new("false", vec![], Duration::from_secs(5));
        let err = r
            .render(&RenderRequest::document("https://example.com/a"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Command { .. }));
    }

    fn waiting_for(url: String, selector: &str, timeout: Duration) -> RenderRequest {
        RenderRequest {
            ready: Some(ReadyCondition {
                selector: selector.to_string(),
                timeout,
                settle_after: Duration::ZERO,
            }),
            ..RenderRequest::document(url)
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_renderer_missing_ready_selector_is_not_fatal() {
        let r = CommandRenderer::new(
            "echo",
            vec!["<html><body><p>loading</p></body></html>".to_string()],
            Duration::from_secs(5),
        );
        let req = waiting_for("https://example.com/a".to_string(), "article", Duration::from_millis(100));
        let html = r.render(&req).await.unwrap();
        assert!(html.contains("<p>loading</p>"));
    }

    fn quick_http() -> HttpRenderer {
        let mut r = HttpRenderer::new("feedsmith-test", Duration::from_secs(5)).unwrap();
        r.poll_interval = Duration::from_millis(50);
        r
    }

    #[tokio::test]
    async fn test_http_ready_timeout_returns_last_html() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET).path("/blog");
                then.status(200).body("<html><body><p>shell only</p></body></html>");
            })
            .await;

        let req = waiting_for(server.url("/blog"), "article", Duration::from_millis(300));
        let html = quick_http().render(&req).await.unwrap();

        assert!(html.contains("shell only"));
        assert!(page.calls_async().await >= 2);
    }

    #[tokio::test]
    async fn test_http_ready_selector_present_fetches_once() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET).path("/blog");
                then.status(200).body("<html><body><article>hi</article></body></html>");
            })
            .await;

        let req = waiting_for(server.url("/blog"), "article", Duration::from_secs(5));
        let html = quick_http().render(&req).await.unwrap();

        assert!(html.contains("<article>hi</article>"));
        assert_eq!(page.calls_async().await, 1);
    }

    #[tokio::test]
    async fn test_http_error_status_is_fetch_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/down");
                then.status(503);
            })
            .await;

        let err = quick_http()
            .render(&RenderRequest::document(server.url("/down")))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }
}
