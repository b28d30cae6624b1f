//! Chromium over the DevTools protocol

use super::{BrowserError, BrowserProvider, BrowserSession, PageHandle, PageOptions};
use crate::config::BrowserConfig as BrowserSettings;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EventResponseReceived, ResourceType, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::{FutureExt, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lifecycle event fired once no network connections remain for 500ms
const NETWORK_IDLE: &str = "networkIdle";

/// Launches a local headless Chromium per scan
pub struct ChromiumProvider {
    settings: BrowserSettings,
}

impl ChromiumProvider {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn launch_config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .window_size(self.settings.viewport_width, self.settings.viewport_height);

        if let Some(executable) = &self.settings.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait]
impl BrowserProvider for ChromiumProvider {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let config = self.launch_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while the handler is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        debug!("Launched headless Chromium");

        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            handler_task: Some(handler_task),
        }))
    }
}

struct ChromiumSession {
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_page(&self, options: &PageOptions) -> Result<Box<dyn PageHandle>, BrowserError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| BrowserError::Page("browser already closed".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))?;

        page.set_user_agent(SetUserAgentOverrideParams::new(options.user_agent.clone()))
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(options.viewport_width),
            i64::from(options.viewport_height),
            1.0,
            false,
        ))
        .await
        .map_err(|e| BrowserError::Page(e.to_string()))?;

        Ok(Box::new(ChromiumPage { page: Some(page) }))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let result = match browser.close().await {
            Ok(_) => {
                if let Err(e) = browser.wait().await {
                    warn!("Chromium did not exit cleanly: {}", e);
                }
                Ok(())
            }
            Err(e) => Err(BrowserError::Close(e.to_string())),
        };

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        result
    }
}

struct ChromiumPage {
    page: Option<Page>,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page
            .as_ref()
            .ok_or_else(|| BrowserError::Page("page already closed".to_string()))
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<Option<u16>, BrowserError> {
        let page = self.page()?;
        let failed = |e: CdpError| BrowserError::Navigation(e.to_string());

        // Subscribe before navigating so no event of this load is missed
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(failed)?;
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(failed)?;
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(failed)?;

        let navigation = page.execute(NavigateParams::new(url)).await.map_err(failed)?.result;
        if let Some(error) = navigation.error_text {
            return Err(BrowserError::Navigation(error));
        }

        // Same-document navigations keep the previous loader and fire no new lifecycle
        let Some(loader) = navigation.loader_id else {
            return Ok(None);
        };

        loop {
            let event = lifecycle.next().await.ok_or_else(|| {
                BrowserError::Navigation("page closed before the network went idle".to_string())
            })?;
            if event.loader_id == loader && event.name == NETWORK_IDLE {
                break;
            }
        }

        let mut status = None;
        while let Some(Some(response)) = responses.next().now_or_never() {
            if response.r#type == ResourceType::Document && response.loader_id == loader {
                status = u16::try_from(response.response.status)
                    .ok()
                    .filter(|code| *code != 0);
            }
        }

        debug!("Navigated to {} (status {:?})", url, status);
        Ok(status)
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, BrowserError> {
        let page = self.page()?;

        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::Evaluation)?;

        let result = page
            .evaluate_expression(params)
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| BrowserError::Close(e.to_string())),
            None => Ok(()),
        }
    }
}
