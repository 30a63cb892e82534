use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("timed out after {timeout:?} waiting for {condition}")]
    Timeout { condition: String, timeout: Duration },

    #[error("no element matches {0}")]
    MissingElement(String),

    #[error("no page is open")]
    NotOpen,
}

impl RenderError {
    fn browser(e: impl std::fmt::Display) -> Self {
        RenderError::Browser(e.to_string())
    }
}

/// Imperative actions run inside the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Scroll to a fraction of the document height.
    ScrollToFraction(f64),
    ScrollToBottom,
    /// Programmatic `element.click()`, immune to overlays intercepting pointer events.
    Click(String),
}

impl Trigger {
    pub fn to_script(&self) -> String {
        match self {
            Trigger::ScrollToFraction(f) => {
                format!("window.scrollTo(0, document.body.scrollHeight * {});", f)
            }
            Trigger::ScrollToBottom => "window.scrollTo(0, document.body.scrollHeight);".to_string(),
            Trigger::Click(selector) => format!(
                "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
                js_string(selector)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    Present(String),
    /// Present, visible and not disabled.
    Clickable(String),
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitCondition::Present(s) => write!(f, "presence of {}", s),
            WaitCondition::Clickable(s) => write!(f, "clickable {}", s),
        }
    }
}

/// A script-executing page renderer holding one open document at a time.
pub trait Renderer {
    fn open(&mut self, url: &str) -> Result<(), RenderError>;

    /// Hide the window from the operator; a no-op where there is no window.
    fn minimize(&mut self) -> Result<(), RenderError>;

    fn current_document(&self) -> Result<String, RenderError>;

    fn run_trigger(&self, trigger: &Trigger) -> Result<(), RenderError>;

    /// Blocks until `condition` holds or `timeout` elapses.
    fn wait_for(&self, condition: &WaitCondition, timeout: Duration) -> Result<(), RenderError>;

    fn close(&mut self) -> Result<(), RenderError>;
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct ChromeRenderer {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeRenderer {
    pub fn launch(headless: bool, chrome_path: Option<PathBuf>) -> Result<Self, RenderError> {
        let args = vec![OsStr::new("--disable-gpu"), OsStr::new("--no-sandbox")];
        let browser = Browser::new(LaunchOptions {
            headless,
            sandbox: false,
            path: chrome_path,
            window_size: Some((1366, 900)),
            idle_browser_timeout: Duration::from_secs(300),
            args,
            ..Default::default()
        })
        .map_err(|e| RenderError::Launch(e.to_string()))?;

        let tab = browser.new_tab().map_err(RenderError::browser)?;
        info!("Browser launched (headless: {})", headless);

        Ok(ChromeRenderer {
            browser: Some(browser),
            tab: Some(tab),
        })
    }

    fn tab(&self) -> Result<&Arc<Tab>, RenderError> {
        self.tab.as_ref().ok_or(RenderError::NotOpen)
    }

    fn evaluate_bool(&self, script: &str) -> Result<bool, RenderError> {
        let result = self.tab()?.evaluate(script, false).map_err(RenderError::browser)?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn poll_until<F>(&self, condition: &WaitCondition, timeout: Duration, mut check: F) -> Result<(), RenderError>
    where
        F: FnMut() -> Result<bool, RenderError>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if check()? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(RenderError::Timeout {
                    condition: condition.to_string(),
                    timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Renderer for ChromeRenderer {
    fn open(&mut self, url: &str) -> Result<(), RenderError> {
        let tab = self.tab()?;
        tab.navigate_to(url).map_err(RenderError::browser)?;
        tab.wait_until_navigated().map_err(RenderError::browser)?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    fn minimize(&mut self) -> Result<(), RenderError> {
        self.tab()?.set_bounds(Bounds::Minimized).map_err(RenderError::browser)?;
        Ok(())
    }

    fn current_document(&self) -> Result<String, RenderError> {
        self.tab()?.get_content().map_err(RenderError::browser)
    }

    fn run_trigger(&self, trigger: &Trigger) -> Result<(), RenderError> {
        let script = trigger.to_script();
        match trigger {
            Trigger::Click(selector) => {
                if !self.evaluate_bool(&script)? {
                    return Err(RenderError::MissingElement(selector.clone()));
                }
            }
            _ => {
                self.tab()?.evaluate(&script, false).map_err(RenderError::browser)?;
            }
        }
        Ok(())
    }

    fn wait_for(&self, condition: &WaitCondition, timeout: Duration) -> Result<(), RenderError> {
        match condition {
            WaitCondition::Present(selector) => {
                let script = format!("document.querySelector({}) !== null", js_string(selector));
                self.poll_until(condition, timeout, || self.evaluate_bool(&script))
            }
            WaitCondition::Clickable(selector) => {
                let script = format!(
                    "(() => {{ const el = document.querySelector({}); if (!el) return false; \
                     const r = el.getBoundingClientRect(); \
                     return !el.disabled && el.getAttribute('aria-disabled') !== 'true' && r.width > 0 && r.height > 0; }})()",
                    js_string(selector)
                );
                self.poll_until(condition, timeout, || self.evaluate_bool(&script))
            }
        }
    }

    fn close(&mut self) -> Result<(), RenderError> {
        if let Some(tab) = self.tab.take() {
            if let Err(e) = tab.close(true) {
                warn!("Failed to close tab: {}", e);
            }
        }
        // Dropping the browser terminates the child process.
        if self.browser.take().is_some() {
            debug!("Browser closed");
        }
        Ok(())
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_scripts() {
        assert_eq!(
            Trigger::ScrollToFraction(0.6).to_script(),
            "window.scrollTo(0, document.body.scrollHeight * 0.6);"
        );
        assert_eq!(
            Trigger::ScrollToBottom.to_script(),
            "window.scrollTo(0, document.body.scrollHeight);"
        );
    }

    #[test]
    fn click_script_escapes_selector() {
        let script = Trigger::Click(r#"button[aria-label^="Laman berikutnya"]"#.to_string()).to_script();
        assert!(script.contains(r#"document.querySelector("button[aria-label^=\"Laman berikutnya\"]")"#));
        assert!(script.contains("el.click()"));
    }

    #[test]
    fn condition_display_names_selector() {
        assert_eq!(WaitCondition::Present("#x".into()).to_string(), "presence of #x");
    }
}
