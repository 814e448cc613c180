//! Browser lifecycle management
//!
//! Launches a browser or attaches to one that is already running, and finds
//! (or opens) the tab the agent lives in.

use super::navigation::PageNavigator;
use crate::error::{BrowserError, Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Configuration for the browser the agent drives
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// DevTools websocket URL of a running browser (None = launch one)
    pub connect_url: Option<String>,
    /// Run in headless mode (default: false, the user types into this window)
    pub headless: bool,
    /// Browser window width (default: 1280)
    pub width: u32,
    /// Browser window height (default: 900)
    pub height: u32,
    /// Enable sandbox (default: true)
    pub sandbox: bool,
    /// Navigation timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Profile directory, so the host session survives restarts
    pub user_data_dir: Option<String>,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            connect_url: None,
            headless: false,
            width: 1280,
            height: 900,
            sandbox: true,
            timeout_ms: 30000,
            chrome_path: None,
            user_data_dir: None,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Attach to a running browser instead of launching
    pub fn connect_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.connect_url = Some(url.into());
        self
    }

    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set navigation timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Set the profile directory
    pub fn user_data_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.config.user_data_dir = Some(dir.into());
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// Handle to an open browser page
#[derive(Clone)]
pub struct PageHandle {
    pub(crate) page: Page,
    pub(crate) url: Arc<RwLock<String>>,
}

impl PageHandle {
    fn new(page: Page, url: impl Into<String>) -> Self {
        Self {
            page,
            url: Arc::new(RwLock::new(url.into())),
        }
    }

    /// Get the underlying chromiumoxide Page
    pub fn inner(&self) -> &Page {
        &self.page
    }

    /// Last URL this handle navigated to or was adopted at
    pub async fn url(&self) -> String {
        self.url.read().await.clone()
    }

    pub(crate) async fn set_url(&self, url: String) {
        *self.url.write().await = url;
    }
}

/// Whether a page at `url` belongs to the host application
pub fn is_host_page(url: &str, marker: &str) -> bool {
    !marker.is_empty() && url.contains(marker)
}

/// High-level browser controller
pub struct BrowserController {
    browser: Browser,
    handler: JoinHandle<()>,
    config: BrowserConfig,
    attached: bool,
}

impl BrowserController {
    /// Launch or attach, depending on `config.connect_url`
    #[instrument(skip(config))]
    pub async fn with_config(config: BrowserConfig) -> Result<Self> {
        let (browser, mut handler, attached) = match config.connect_url.clone() {
            Some(url) => {
                info!("Connecting to running browser at {}", url);
                let (browser, handler) =
                    Browser::connect(url.as_str())
                        .await
                        .map_err(|e| BrowserError::ConnectFailed {
                            url,
                            message: e.to_string(),
                        })?;
                (browser, handler, true)
            }
            None => {
                info!("Launching browser with config: headless={}", config.headless);
                let cdp_config = Self::launch_config(&config)?;
                let (browser, handler) = Browser::launch(cdp_config)
                    .await
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
                (browser, handler, false)
            }
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("Browser handler event error");
                    break;
                }
            }
            debug!("Browser handler finished");
        });

        info!("Browser ready");

        Ok(Self {
            browser,
            handler: handler_task,
            config,
            attached,
        })
    }

    fn launch_config(config: &BrowserConfig) -> Result<CdpBrowserConfig> {
        let mut builder = CdpBrowserConfig::builder();

        builder = builder.viewport(chromiumoxide::handler::viewport::Viewport {
            width: config.width,
            height: config.height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        });

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.arg("--no-sandbox");
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        if let Some(ref dir) = config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }

        for arg in &config.extra_args {
            builder = builder.arg(arg);
        }

        Ok(builder
            .build()
            .map_err(BrowserError::ConfigError)?)
    }

    /// Create a new page/tab
    #[instrument(skip(self))]
    pub async fn new_page(&self) -> Result<PageHandle> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        debug!("Created new page");
        Ok(PageHandle::new(page, "about:blank"))
    }

    /// Find an open tab whose URL contains `marker`
    #[instrument(skip(self))]
    pub async fn find_host_page(&mut self, marker: &str) -> Result<Option<PageHandle>> {
        if let Err(e) = self.browser.fetch_targets().await {
            debug!("Target discovery failed: {}", e);
        }

        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        for page in pages {
            let Ok(Some(url)) = page.url().await else {
                continue;
            };
            if is_host_page(&url, marker) {
                info!("Adopting open tab at {}", url);
                return Ok(Some(PageHandle::new(page, url)));
            }
        }
        Ok(None)
    }

    /// Adopt the host tab if one is open, otherwise open `address`
    #[instrument(skip(self))]
    pub async fn open_host(&mut self, address: &str, marker: &str) -> Result<PageHandle> {
        if let Some(page) = self.find_host_page(marker).await? {
            return Ok(page);
        }

        let page = self.new_page().await?;
        let options = super::navigation::NavigationOptions {
            timeout_ms: self.config.timeout_ms,
            ..Default::default()
        };
        PageNavigator::goto(&page, address, Some(options)).await?;
        Ok(page)
    }

    /// Get the browser configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Close a launched browser, or just detach from an attached one
    #[instrument(skip(self))]
    pub async fn close(mut self) -> Result<()> {
        if self.attached {
            info!("Detaching from browser");
            self.handler.abort();
            return Ok(());
        }

        info!("Closing browser");
        self.browser
            .close()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        let _ = tokio::time::timeout(Duration::from_secs(5), self.handler).await;

        info!("Browser closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_config_default() {
        let config = BrowserConfig::default();
        assert!(config.connect_url.is_none());
        assert!(!config.headless);
        assert_eq!(config.width, 1280);
        assert!(config.sandbox);
        assert_eq!(config.timeout_ms, 30000);
    }

    #[test]
    fn test_browser_config_builder() {
        let config = BrowserConfig::builder()
            .connect_url("ws://127.0.0.1:9222/devtools/browser/abc")
            .headless(true)
            .viewport(1024, 768)
            .sandbox(false)
            .timeout_ms(60000)
            .user_data_dir("/tmp/profile")
            .arg("--disable-gpu")
            .build();

        assert_eq!(
            config.connect_url.as_deref(),
            Some("ws://127.0.0.1:9222/devtools/browser/abc")
        );
        assert!(config.headless);
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, 768);
        assert!(!config.sandbox);
        assert_eq!(config.timeout_ms, 60000);
        assert_eq!(config.user_data_dir.as_deref(), Some("/tmp/profile"));
        assert_eq!(config.extra_args, vec!["--disable-gpu"]);
    }

    #[tokio::test]
    #[ignore = "needs a local Chromium"]
    async fn test_open_host_reuses_marked_tab() {
        let config = BrowserConfig::builder().headless(true).sandbox(false).build();
        let mut controller = BrowserController::with_config(config).await.unwrap();

        let first = controller
            .open_host("https://example.com/", "example.com")
            .await
            .unwrap();
        let adopted = controller.find_host_page("example.com").await.unwrap();

        assert!(adopted.is_some());
        assert!(first.url().await.contains("example.com"));
        controller.close().await.unwrap();
    }

    #[test]
    fn test_is_host_page() {
        assert!(is_host_page("https://claude.ai/chat/123", "claude.ai"));
        assert!(!is_host_page("https://example.com", "claude.ai"));
        assert!(!is_host_page("https://example.com", ""));
    }
}
