//! Headless Chrome sessions: launch, resource filtering, navigation and teardown.

use std::future::Future;
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{ContinueRequestParams, EventRequestPaused, FailRequestParams};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, EventResponseReceived, ResourceType};
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, SetLifecycleEventsEnabledParams};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserSettings, PageFetcher, RenderedPage, WaitUntil};
use crate::{Result, SiphonError};

/// Status reported when no main document response was observed
const DEFAULT_STATUS: u16 = 200;

/// CDP commands outlive the navigation deadline so the deadline reports first
const CDP_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

fn is_allowed(resource: &ResourceType) -> bool {
    matches!(resource, ResourceType::Document | ResourceType::Script)
}

/// One Chrome process with at most one page, owned by a single attempt.
///
/// [`close`](Self::close) tears both down. A session dropped without closing
/// (panic, cancelled future) closes them on a background task instead.
pub struct BrowserSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    interceptor: Option<JoinHandle<()>>,
    profile: Option<TempDir>,
    runtime: Handle,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("open", &self.browser.is_some())
            .field("has_page", &self.page.is_some())
            .finish()
    }
}

impl BrowserSession {
    /// Launches an isolated headless Chrome with a throwaway profile.
    ///
    /// # Errors
    ///
    /// [`SiphonError::Unknown`] when Chrome cannot be found or started.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let profile = tempfile::Builder::new()
            .prefix("siphon-chrome-")
            .tempdir()
            .map_err(|e| SiphonError::Unknown(format!("Failed to create browser profile: {e}")))?;

        let mut builder = BrowserConfig::builder()
            .args(settings.launch_args.iter().map(String::as_str))
            .user_data_dir(profile.path())
            .request_timeout(settings.navigation_timeout + CDP_TIMEOUT_SLACK)
            .enable_request_intercept();
        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| SiphonError::Unknown(format!("Invalid browser configuration: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SiphonError::Unknown(format!("Failed to launch browser: {e}")))?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });
        debug!(profile = %profile.path().display(), "Browser launched");

        Ok(Self {
            browser: Some(browser),
            page: None,
            handler: Some(handler),
            interceptor: None,
            profile: Some(profile),
            runtime: Handle::current(),
        })
    }

    /// Opens the session's page with the given identity and resource filter.
    ///
    /// # Errors
    ///
    /// [`SiphonError::Unknown`] if a page is already open or CDP setup fails.
    pub async fn open_page(&mut self, user_agent: &str) -> Result<Page> {
        if self.page.is_some() {
            return Err(SiphonError::Unknown("session already has a page".to_string()));
        }
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| SiphonError::Unknown("browser already closed".to_string()))?;

        let page = browser.new_page("about:blank").await.map_err(setup_error)?;
        self.page = Some(page.clone());

        page.set_user_agent(user_agent).await.map_err(setup_error)?;
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(setup_error)?;
        self.interceptor = Some(install_resource_filter(&page).await?);

        Ok(page)
    }

    /// Launches a session, runs `operation` on its page and tears everything
    /// down whether the operation succeeded or not.
    ///
    /// # Errors
    ///
    /// Launch and page setup errors, or whatever `operation` returns.
    pub async fn with_page<T, F, Fut>(settings: &BrowserSettings, user_agent: &str, operation: F) -> Result<T>
    where
        F: FnOnce(Page) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut session = Self::launch(settings).await?;
        let result = match session.open_page(user_agent).await {
            Ok(page) => operation(page).await,
            Err(e) => Err(e),
        };
        session.close().await;
        result
    }

    /// Closes the page, then the browser, and waits for Chrome to exit.
    pub async fn close(mut self) {
        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            debug!(error = %e, "Failed to close page");
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Failed to close browser");
            }
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "Failed to wait for browser exit");
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        debug!("Browser session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }
        let page = self.page.take();
        let browser = self.browser.take();
        let handler = self.handler.take();
        let profile = self.profile.take();

        if browser.is_none() {
            if let Some(handler) = handler {
                handler.abort();
            }
            return;
        }

        warn!("Browser session dropped without close, cleaning up in background");
        self.runtime.spawn(async move {
            if let Some(page) = page {
                let _ = page.close().await;
            }
            if let Some(mut browser) = browser {
                let _ = browser.close().await;
                let _ = browser.wait().await;
            }
            if let Some(handler) = handler {
                handler.abort();
            }
            drop(profile);
        });
    }
}

fn setup_error(e: chromiumoxide::error::CdpError) -> SiphonError {
    SiphonError::Unknown(format!("Browser setup failed: {e}"))
}

/// Continues document and script requests and aborts the rest.
async fn install_resource_filter(page: &Page) -> Result<JoinHandle<()>> {
    let mut paused = page.event_listener::<EventRequestPaused>().await.map_err(setup_error)?;
    let page = page.clone();

    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let request_id = event.request_id.clone();
            let outcome = if is_allowed(&event.resource_type) {
                page.execute(ContinueRequestParams::new(request_id)).await.map(drop)
            } else {
                page.execute(FailRequestParams::new(request_id, ErrorReason::BlockedByClient))
                    .await
                    .map(drop)
            };
            if let Err(e) = outcome {
                debug!(error = %e, "Request interception failed");
            }
        }
    }))
}

/// Navigates `page` to `url` and waits for the `wait_until` lifecycle event
/// of the main frame, all within `timeout`.
///
/// # Errors
///
/// [`SiphonError::NavigationTimeout`] when the deadline passes,
/// [`SiphonError::Navigation`] when Chrome reports a failed navigation.
pub async fn navigate(page: &Page, url: &str, timeout: Duration, wait_until: WaitUntil) -> Result<RenderedPage> {
    let mut lifecycle = page.event_listener::<EventLifecycleEvent>().await.map_err(setup_error)?;
    let mut responses = page.event_listener::<EventResponseReceived>().await.map_err(setup_error)?;
    let main_frame = page.mainframe().await.ok().flatten();

    let settle = async {
        let navigation = page.goto(url);
        tokio::pin!(navigation);

        let mut status = None;
        let mut navigated = false;
        let mut settled = false;

        while !(navigated && settled) {
            tokio::select! {
                result = &mut navigation, if !navigated => {
                    result.map_err(|e| SiphonError::Navigation(e.to_string()))?;
                    navigated = true;
                }
                Some(event) = responses.next(), if status.is_none() => {
                    if event.r#type == ResourceType::Document {
                        status = u16::try_from(event.response.status).ok();
                    }
                }
                Some(event) = lifecycle.next(), if !settled => {
                    let in_main_frame = main_frame.as_ref().is_none_or(|frame| *frame == event.frame_id);
                    if in_main_frame && event.name == wait_until.event_name() {
                        settled = true;
                    }
                }
                else => return Err(SiphonError::Navigation("page closed before navigation settled".to_string())),
            }
        }
        Ok::<_, SiphonError>(status)
    };

    let status = tokio::time::timeout(timeout, settle)
        .await
        .map_err(|_| SiphonError::NavigationTimeout { timeout_secs: timeout.as_secs() })??;

    let html = page
        .content()
        .await
        .map_err(|e| SiphonError::Unknown(format!("Failed to read page content: {e}")))?;
    let final_url = page.url().await.ok().flatten().unwrap_or_else(|| url.to_string());
    let status_code = status.unwrap_or(DEFAULT_STATUS);
    debug!(url, status_code, bytes = html.len(), "Page rendered");

    Ok(RenderedPage { html, status_code, final_url })
}

/// [`PageFetcher`] that launches a fresh Chrome for every call.
#[derive(Debug, Clone, Default)]
pub struct BrowserFetcher {
    settings: BrowserSettings,
}

impl BrowserFetcher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str, user_agent: &str) -> Result<RenderedPage> {
        let timeout = self.settings.navigation_timeout;
        let wait_until = self.settings.wait_until;

        BrowserSession::with_page(&self.settings, user_agent, |page| async move {
            navigate(&page, url, timeout, wait_until).await
        })
        .await
    }
}
