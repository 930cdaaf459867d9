use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};
use tracing::{debug, info};
use webdriver::capabilities::Capabilities;

/// How the underlying browser is launched and reached.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebDriver endpoint managing the browser (chromedriver).
    pub webdriver_url: String,
    /// Run without a visible window.
    pub headless: bool,
    /// User agent presented by every page the session opens.
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Chrome command-line arguments for the session.
///
/// Sandboxing is disabled for portability in constrained hosting
/// environments.
pub fn build_launch_arguments(config: &SessionConfig) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-extensions".to_string(),
        format!("--user-agent={}", config.user_agent),
        "--window-size=1280,1024".to_string(),
    ];
    if config.headless {
        args.push("--headless".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

struct SessionInner {
    client: Client,
    base_window: WindowHandle,
}

/// Lazily-initialised, process-wide browser resource.
///
/// Construction is cheap; nothing launches until the first page lease. The
/// one-time launch is memoized through a `OnceCell`, so concurrent first
/// callers race safely and exactly one browser process ever starts. A failed
/// launch is retried by the next caller.
pub struct BrowserSession {
    config: SessionConfig,
    inner: OnceCell<SessionInner>,
    page_gate: Arc<Mutex<()>>,
    closed: AtomicBool,
}

impl BrowserSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
            page_gate: Arc::new(Mutex::new(())),
            closed: AtomicBool::new(false),
        }
    }

    async fn acquire(&self) -> Result<&SessionInner> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(anyhow!("browser session is shut down"));
        }
        self.inner
            .get_or_try_init(|| launch(&self.config))
            .await
    }

    /// Open a fresh window for one request.
    ///
    /// WebDriver sessions are stateful (one focused window at a time), so
    /// the lease also holds the session's page gate: page use is exclusive
    /// for the lease lifetime and state never leaks between requests. The
    /// gate is released when the lease drops, even if [`PageLease::close`]
    /// was skipped.
    pub async fn lease_page(&self) -> Result<PageLease> {
        let exclusive = Arc::clone(&self.page_gate).lock_owned().await;
        let inner = self.acquire().await?;

        let created = inner.client.new_window(true).await?;
        inner.client.switch_to_window(created.handle.clone()).await?;
        debug!(target: "browser.session", "page leased");

        Ok(PageLease {
            client: inner.client.clone(),
            base_window: inner.base_window.clone(),
            _exclusive: exclusive,
        })
    }

    /// Terminate the underlying browser process.
    ///
    /// Effective exactly once; later calls (or a call before anything was
    /// launched) are no-ops. Waits for an in-flight page lease to finish.
    pub async fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(inner) = self.inner.get() {
            let _drain = self.page_gate.lock().await;
            inner.client.clone().close().await?;
            info!(target: "browser.session", "browser session terminated");
        }
        Ok(())
    }
}

async fn launch(config: &SessionConfig) -> Result<SessionInner> {
    let mut caps = Capabilities::new();
    let mut chrome_opts = HashMap::new();
    chrome_opts.insert("args".to_string(), json!(build_launch_arguments(config)));
    caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

    let client = ClientBuilder::native()
        .capabilities(caps)
        .connect(&config.webdriver_url)
        .await?;
    let base_window = client.window().await?;

    info!(
        target: "browser.session",
        webdriver_url = %config.webdriver_url,
        headless = config.headless,
        "browser session started"
    );

    Ok(SessionInner {
        client,
        base_window,
    })
}

/// Exclusive handle on one browser window, owned by a single in-flight
/// request. Callers must [`close`](PageLease::close) it on every exit path.
#[derive(Debug)]
pub struct PageLease {
    client: Client,
    base_window: WindowHandle,
    _exclusive: OwnedMutexGuard<()>,
}

impl PageLease {
    /// Navigate to `url`, bounded by a hard timeout. A timeout is an ordinary
    /// recoverable error, not fatal to the session.
    pub async fn goto(&self, url: &str, limit: Duration) -> Result<()> {
        tokio::time::timeout(limit, self.client.goto(url))
            .await
            .map_err(|_| anyhow!("navigation timed out after {}s: {url}", limit.as_secs()))??;
        Ok(())
    }

    /// `src` of every `img` element on the page, in document order.
    pub async fn image_sources(&self) -> Result<Vec<String>> {
        let elements = self.client.find_all(Locator::Css("img")).await?;
        let mut sources = Vec::with_capacity(elements.len());
        for element in elements {
            if let Some(src) = element.attr("src").await? {
                sources.push(src);
            }
        }
        Ok(sources)
    }

    /// Close the leased window and refocus the session's base window.
    pub async fn close(self) -> Result<()> {
        self.client.close_window().await?;
        self.client.switch_to_window(self.base_window.clone()).await?;
        Ok(())
    }
}
