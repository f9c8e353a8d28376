//! Run configuration.
//!
//! Loaded from a YAML file when one is given, otherwise built from
//! [`AppConfig::default`], which reproduces the two stock pipelines: the
//! Binance blog listing and the Binance Square feed relay.
//!
//! ```yaml
//! renderer:
//!   kind: command
//!   program: chromium
//!   args: ["--headless", "--virtual-time-budget={budget_ms}", "--dump-dom", "{url}"]
//! pipelines:
//!   - name: blog
//!     output: feeds/blog.xml
//!     feed: { title: Blog, description: Latest, link: "https://example.com/blog",
//!             default_author: Blog, generator: Blog RSS Generator }
//!     source:
//!       kind: listing
//!       base_url: https://example.com/blog
//!       path_marker: /blog/
//! ```
//!
//! Every pipeline is validated on load by compiling its selectors, patterns
//! and URLs, so a typo fails the run before any page is fetched.

use crate::error::{ConfigError, FetchError};
use crate::extract::{ContentExtractor, ContentSettings, ListingExtractor, ListingSource};
use crate::models::FeedConfig;
use crate::render::{AnyRenderer, CommandRenderer, HttpRenderer, ReadyCondition, RenderRequest, ScrollCycle};
use crate::retry::RetrySettings;
use crate::sources::relay::{CategoryPageFilter, RelaySource};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};
use url::Url;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub renderer: RendererConfig,
    pub pipelines: Vec<PipelineConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig::default(),
            pipelines: vec![PipelineConfig::binance_blog(), PipelineConfig::binance_square()],
        }
    }
}

impl AppConfig {
    /// Read and validate a config file, or validate the defaults when `path` is `None`.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let config: AppConfig = serde_yaml::from_str(&raw)?;
                info!(path = %path.display(), pipelines = config.pipelines.len(), "Loaded config file");
                config
            }
            None => {
                info!("No config file given; using built-in pipelines");
                AppConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for pipeline in &self.pipelines {
            if !names.insert(pipeline.name.as_str()) {
                return Err(ConfigError::invalid(&pipeline.name, "duplicate pipeline name"));
            }
            pipeline.validate()?;
        }
        debug!(pipelines = names.len(), "Config validated");
        Ok(())
    }
}

/// Which [`crate::render::Renderer`] to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RendererConfig {
    /// Plain HTTP GET; client-side scripts do not run.
    Http {
        #[serde(default = "default_user_agent")]
        user_agent: String,
        #[serde(default = "default_request_timeout_secs")]
        timeout_secs: u64,
    },
    /// External headless browser printing the rendered DOM on stdout.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_command_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_user_agent() -> String {
    DESKTOP_USER_AGENT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_command_timeout_secs() -> u64 {
    60
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig::Http {
            user_agent: default_user_agent(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RendererConfig {
    pub fn build(&self) -> Result<AnyRenderer, FetchError> {
        Ok(match self {
            RendererConfig::Http {
                user_agent,
                timeout_secs,
            } => AnyRenderer::Http(HttpRenderer::new(user_agent, Duration::from_secs(*timeout_secs))?),
            RendererConfig::Command {
                program,
                args,
                timeout_secs,
            } => AnyRenderer::Command(CommandRenderer::new(
                program.clone(),
                args.clone(),
                Duration::from_secs(*timeout_secs),
            )),
        })
    }

    /// Plain HTTP client for static documents such as upstream feeds.
    ///
    /// A browser's `--dump-dom` output wraps XML in HTML, so feeds are always
    /// fetched over HTTP even when pages go through a command renderer.
    pub fn document_renderer(&self) -> Result<HttpRenderer, FetchError> {
        match self {
            RendererConfig::Http {
                user_agent,
                timeout_secs,
            } => HttpRenderer::new(user_agent, Duration::from_secs(*timeout_secs)),
            RendererConfig::Command { .. } => {
                HttpRenderer::new(DESKTOP_USER_AGENT, Duration::from_secs(default_request_timeout_secs()))
            }
        }
    }
}

/// One independent scrape-and-publish run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default = "yes")]
    pub enabled: bool,
    /// Where the RSS file is written.
    pub output: PathBuf,
    /// Optional JSON dump of the final records.
    #[serde(default)]
    pub json_dump: Option<PathBuf>,
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
    /// Render each article's detail page for its body.
    #[serde(default = "yes")]
    pub fetch_content: bool,
    pub feed: FeedConfig,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Pause between two article fetches.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    #[serde(default)]
    pub content: ContentSettings,
    pub source: SourceConfig,
}

fn yes() -> bool {
    true
}

fn default_max_articles() -> usize {
    30
}

fn default_rate_limit_ms() -> u64 {
    1_000
}

/// Where a pipeline's records come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A rendered blog listing page.
    Listing(ListingSource),
    /// An upstream RSS feed whose items are re-published with full bodies.
    Relay(RelaySource),
}

impl SourceConfig {
    /// The URL the pipeline starts from, for logs and errors.
    pub fn origin(&self) -> &str {
        match self {
            SourceConfig::Listing(l) => &l.base_url,
            SourceConfig::Relay(r) => &r.feed_url,
        }
    }
}

impl PipelineConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(ConfigError::invalid(name, "pipeline name is empty"));
        }
        if self.max_articles == 0 {
            return Err(ConfigError::invalid(name, "max_articles must be at least 1"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::invalid(name, "output path is empty"));
        }
        Url::parse(&self.feed.link)
            .map_err(|e| ConfigError::invalid(name, format!("feed.link {:?}: {e}", self.feed.link)))?;

        for timing in [&self.render.listing, &self.render.article] {
            if let Some(ready) = &timing.ready {
                Selector::parse(&ready.selector)
                    .map_err(|e| ConfigError::invalid(name, format!("ready selector {:?}: {e}", ready.selector)))?;
            }
        }

        ContentExtractor::new(name, &self.content)?;
        match &self.source {
            SourceConfig::Listing(listing) => {
                ListingExtractor::new(name, listing)?;
            }
            SourceConfig::Relay(relay) => {
                Url::parse(&relay.feed_url)
                    .map_err(|e| ConfigError::invalid(name, format!("feed_url {:?}: {e}", relay.feed_url)))?;
                CategoryPageFilter::new(name, &relay.category_page)?;
            }
        }
        Ok(())
    }

    /// The stock blog-listing pipeline.
    pub fn binance_blog() -> Self {
        Self {
            name: "binance_blog".to_string(),
            enabled: true,
            output: PathBuf::from("feeds/binance_blog_feed.xml"),
            json_dump: None,
            max_articles: 30,
            fetch_content: true,
            feed: FeedConfig {
                title: "Binance Blog".to_string(),
                description: "Latest articles from Binance Blog".to_string(),
                link: "https://www.binance.com/en/blog".to_string(),
                language: "en".to_string(),
                default_author: "Binance Blog".to_string(),
                generator: "Binance Blog RSS Generator".to_string(),
            },
            render: RenderSettings {
                listing: PageTiming {
                    ready: Some(ReadyTiming {
                        selector: r#"#__APP a[href*="/blog/"]"#.to_string(),
                        timeout_ms: 20_000,
                        settle_after_ms: 2_000,
                    }),
                    ..PageTiming::default()
                },
                article: PageTiming::default(),
            },
            retry: RetrySettings::default(),
            rate_limit_ms: default_rate_limit_ms(),
            content: ContentSettings {
                selectors: vec![r#"#__APP div[class*="bn-flex"][class*="flex-col"][class*="gap-2"]"#.to_string()],
                ..ContentSettings::default()
            },
            source: SourceConfig::Listing(ListingSource {
                base_url: "https://www.binance.com/en/blog".to_string(),
                path_marker: "/blog/".to_string(),
                app_root: "#__APP".to_string(),
                markers: Default::default(),
            }),
        }
    }

    /// The stock Binance Square relay pipeline.
    pub fn binance_square() -> Self {
        Self {
            name: "binance_square".to_string(),
            enabled: true,
            output: PathBuf::from("feeds/binance_square_feed.xml"),
            json_dump: None,
            max_articles: 50,
            fetch_content: true,
            feed: FeedConfig {
                title: "Binance Square News".to_string(),
                description: "Latest news from Binance Square with full content".to_string(),
                link: "https://www.binance.com/en/square".to_string(),
                language: "en".to_string(),
                default_author: "Binance Square".to_string(),
                generator: "Binance Square RSS Generator".to_string(),
            },
            render: RenderSettings {
                listing: PageTiming::default(),
                article: PageTiming {
                    settle_ms: 3_000,
                    scroll: Some(ScrollTiming {
                        bottom_ms: 2_000,
                        top_ms: 0,
                    }),
                    ready: None,
                },
            },
            retry: RetrySettings::default(),
            rate_limit_ms: default_rate_limit_ms(),
            content: ContentSettings {
                selectors: [
                    r#"div[class*="richtext"]"#,
                    r#"div[class*="content"]"#,
                    "article",
                    r#"div[class*="post-content"]"#,
                    r#"div[class*="article-content"]"#,
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                refine_metadata: false,
                ..ContentSettings::default()
            },
            source: SourceConfig::Relay(RelaySource {
                feed_url: "https://rss.app/feeds/yRmgWoblxWMXGv0F.xml".to_string(),
                category_page: Default::default(),
            }),
        }
    }
}

/// Render timings for the two kinds of page a pipeline loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RenderSettings {
    /// The listing page (listing sources only).
    pub listing: PageTiming,
    /// Each article's detail page.
    pub article: PageTiming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageTiming {
    pub settle_ms: u64,
    pub scroll: Option<ScrollTiming>,
    pub ready: Option<ReadyTiming>,
}

impl Default for PageTiming {
    fn default() -> Self {
        Self {
            settle_ms: 5_000,
            scroll: Some(ScrollTiming {
                bottom_ms: 2_000,
                top_ms: 1_000,
            }),
            ready: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollTiming {
    pub bottom_ms: u64,
    pub top_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyTiming {
    pub selector: String,
    #[serde(default = "default_ready_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_ready_settle_ms")]
    pub settle_after_ms: u64,
}

fn default_ready_timeout_ms() -> u64 {
    20_000
}

fn default_ready_settle_ms() -> u64 {
    2_000
}

impl PageTiming {
    pub fn request(&self, url: impl Into<String>) -> RenderRequest {
        RenderRequest {
            url: url.into(),
            settle: Duration::from_millis(self.settle_ms),
            scroll: self.scroll.map(|s| ScrollCycle {
                bottom_wait: Duration::from_millis(s.bottom_ms),
                top_wait: Duration::from_millis(s.top_ms),
            }),
            ready: self.ready.as_ref().map(|r| ReadyCondition {
                selector: r.selector.clone(),
                timeout: Duration::from_millis(r.timeout_ms),
                settle_after: Duration::from_millis(r.settle_after_ms),
            }),
        }
    }
}
