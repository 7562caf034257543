//! Headless Chrome sessions via the DevTools protocol

use crate::config::BrowserConfig;
use crate::pool::session::{Session, SessionError, SessionFactory};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig as ChromeConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One Chrome process with a single reusable tab
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    page_load_timeout: Duration,
    /// Chrome profile, removed when the session is dropped
    _profile: TempDir,
}

impl BrowserSession {
    async fn load(&self, url: &str, wait_for: Option<&str>) -> Result<String, SessionError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let Some(selector) = wait_for else {
            return self.page.content().await.map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            });
        };

        // Content behind the selector is filled in by page scripts after load
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                if let Ok(Some(html)) = element.inner_html().await {
                    if !html.trim().is_empty() {
                        return Ok(html);
                    }
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Session for BrowserSession {
    async fn render(&mut self, url: &str, wait_for: Option<&str>) -> Result<String, SessionError> {
        tracing::debug!("Rendering {}", url);
        tokio::time::timeout(self.page_load_timeout, self.load(url, wait_for))
            .await
            .map_err(|_| SessionError::Timeout(self.page_load_timeout))?
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Closed(e.to_string()));
        let _ = self.browser.wait().await;
        self.handler.abort();
        result
    }
}

/// Launches a fresh headless Chrome per session
pub struct BrowserSessionFactory {
    config: BrowserConfig,
    user_agent: Option<String>,
}

impl BrowserSessionFactory {
    pub fn new(config: BrowserConfig, user_agent: Option<String>) -> Self {
        Self { config, user_agent }
    }

    /// Chrome settings plus the profile directory they point at
    fn chrome_config(&self, label: &str) -> Result<(ChromeConfig, TempDir), SessionError> {
        // Separate profile directories let several browsers run side by side
        let profile = tempfile::Builder::new()
            .prefix(&format!("device-resolver-{}-", label))
            .tempdir()
            .map_err(|e| SessionError::Launch(format!("cannot create profile directory: {}", e)))?;

        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
        ];
        if let Some(user_agent) = &self.user_agent {
            args.push(format!("--user-agent={}", user_agent));
        }

        let mut builder = ChromeConfig::builder().user_data_dir(profile.path()).args(args);
        builder = if self.config.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if let Some(executable) = &self.config.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder.build().map_err(SessionError::Launch)?;
        Ok((config, profile))
    }
}

#[async_trait]
impl SessionFactory for BrowserSessionFactory {
    type Session = BrowserSession;

    async fn create(&self, label: &str) -> Result<BrowserSession, SessionError> {
        let (config, profile) = self.chrome_config(label)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(SessionError::Launch(e.to_string()));
            }
        };

        tracing::debug!("Launched browser for {}", label);
        Ok(BrowserSession {
            browser,
            page,
            handler,
            page_load_timeout: Duration::from_secs(self.config.page_load_timeout_seconds),
            _profile: profile,
        })
    }
}
