//! Browser session management.
//!
//! Pages are rendered by a headless Chrome instance that lives for exactly
//! one extraction attempt. [`PageFetcher`] is the seam the extraction service
//! talks to; [`BrowserFetcher`] is the Chrome-backed implementation and is
//! only available with the `browser` feature.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::Result;

#[cfg(feature = "browser")]
mod session;

#[cfg(feature = "browser")]
pub use session::{BrowserFetcher, BrowserSession, navigate};

/// Hard limit for a navigation to settle
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(20);

/// Chrome flags needed to run inside containers
pub const DEFAULT_LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-first-run",
    "--no-default-browser-check",
    "--mute-audio",
];

/// Chrome lifecycle event that marks a navigation as settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    /// The `load` event fired
    Load,
    /// At most two connections in flight for 500ms
    #[default]
    NetworkAlmostIdle,
    /// No connections in flight for 500ms
    NetworkIdle,
}

impl WaitUntil {
    /// Name of the matching `Page.lifecycleEvent`
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::NetworkAlmostIdle => "networkAlmostIdle",
            Self::NetworkIdle => "networkIdle",
        }
    }
}

/// Settings for launching and driving the headless browser.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserSettings {
    /// Budget for navigation plus waiting for [`wait_until`](Self::wait_until)
    pub navigation_timeout: Duration,
    /// Chrome binary; auto-detected when `None`
    pub chrome_executable: Option<PathBuf>,
    /// Extra command line flags passed to Chrome
    pub launch_args: Vec<String>,
    pub wait_until: WaitUntil,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            chrome_executable: None,
            launch_args: DEFAULT_LAUNCH_ARGS.iter().map(|arg| arg.to_string()).collect(),
            wait_until: WaitUntil::default(),
        }
    }
}

/// Serialized DOM of a page after navigation settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    /// Status of the main document response, 200 when none was observed
    pub status_code: u16,
    /// URL after redirects
    pub final_url: String,
}

/// Renders a URL into HTML.
///
/// Implementations must not share state between calls: every call is one
/// isolated attempt with its own identity.
pub trait PageFetcher: Send + Sync {
    /// Navigates to `url` presenting `user_agent` and returns the rendered page.
    ///
    /// # Errors
    ///
    /// [`SiphonError::NavigationTimeout`](crate::SiphonError::NavigationTimeout) when
    /// the page does not settle in time, [`SiphonError::Navigation`](crate::SiphonError::Navigation)
    /// for network failures, [`SiphonError::Unknown`](crate::SiphonError::Unknown) otherwise.
    fn fetch(&self, url: &str, user_agent: &str) -> impl Future<Output = Result<RenderedPage>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BrowserSettings::default();
        assert_eq!(settings.navigation_timeout, Duration::from_secs(20));
        assert_eq!(settings.wait_until, WaitUntil::NetworkAlmostIdle);
        assert!(settings.chrome_executable.is_none());
        assert!(settings.launch_args.iter().any(|arg| arg == "--no-sandbox"));
    }

    #[test]
    fn test_lifecycle_event_names() {
        assert_eq!(WaitUntil::Load.event_name(), "load");
        assert_eq!(WaitUntil::NetworkAlmostIdle.event_name(), "networkAlmostIdle");
        assert_eq!(WaitUntil::NetworkIdle.event_name(), "networkIdle");
    }
}
