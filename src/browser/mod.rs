//! Headless browser abstraction
//!
//! The crawler only talks to the browser through the three traits defined
//! here. The Chromium implementation lives behind the `chromium` feature;
//! tests drive the crawler with in-process fakes.

#[cfg(feature = "chromium")]
mod chromium;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumProvider;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Handle;

/// Browser-level errors
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Failed to open page: {0}")]
    Page(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Failed to close: {0}")]
    Close(String),
}

/// Per-page settings applied before navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
}

impl From<&crate::config::BrowserConfig> for PageOptions {
    fn from(config: &crate::config::BrowserConfig) -> Self {
        Self {
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Launches browser sessions, one per scan
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A running browser owned by exactly one crawl
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn open_page(&self, options: &PageOptions) -> Result<Box<dyn PageHandle>, BrowserError>;

    /// Shuts the browser down; calling it twice is a no-op
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// A single open tab
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigates and waits until the page is network-idle
    ///
    /// Returns the HTTP status of the main document when the browser reported
    /// one. There is no timeout here; callers bound the whole call.
    async fn navigate(&self, url: &str) -> Result<Option<u16>, BrowserError>;

    /// Evaluates a JavaScript expression and returns its JSON value
    ///
    /// Promises are awaited.
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Owns a browser session and guarantees it is shut down
///
/// Call [`SessionGuard::release`] on every normal exit path. If the guard is
/// dropped while still holding the session (early return, panic unwinding),
/// the close is spawned onto the current tokio runtime.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    runtime: Option<Handle>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Borrows the session
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Page`] if the session was already released.
    pub fn session(&self) -> Result<&dyn BrowserSession, BrowserError> {
        self.session
            .as_deref()
            .ok_or_else(|| BrowserError::Page("browser session already released".to_string()))
    }

    /// Closes the session, consuming the guard
    pub async fn release(mut self) -> Result<(), BrowserError> {
        match self.session.take() {
            Some(mut session) => session.close().await,
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        match &self.runtime {
            Some(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!("Browser session cleanup failed: {}", e);
                    } else {
                        tracing::trace!("Browser session closed from drop guard");
                    }
                });
            }
            None => tracing::warn!("Browser session dropped outside of a runtime"),
        }
    }
}

/// Builds a call expression `function(args...)` with JSON-encoded arguments
///
/// # Example
///
/// ```
/// use a11y_crawl::browser::call_expression;
///
/// let expr = call_expression("run", &["wcag2a"]).unwrap();
/// assert_eq!(expr, r#"(run)(["wcag2a"])"#);
/// ```
pub fn call_expression<A: Serialize + ?Sized>(
    function: &str,
    argument: &A,
) -> Result<String, BrowserError> {
    let argument = serde_json::to_string(argument)
        .map_err(|e| BrowserError::Evaluation(format!("unserializable argument: {}", e)))?;
    Ok(format!("({})({})", function, argument))
}
