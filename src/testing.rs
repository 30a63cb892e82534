//! Scripted renderer and markup fixtures for exercising the collection loop
//! without a browser.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::config::{Config, Timings};
use crate::delay_manager::RetryPolicy;
use crate::renderer::{RenderError, Renderer, Trigger, WaitCondition};

/// Config with the default selectors and retry bounds but no waiting.
pub fn test_config() -> Config {
    Config {
        timings: Timings::zero(),
        reveal_retry: RetryPolicy::instant(5),
        advance_retry: RetryPolicy::instant(3),
        ..Config::default()
    }
}

/// A review-feed page with `count` reviews numbered from `start`.
pub fn review_page(start: usize, count: usize) -> String {
    let items: Vec<(Option<String>, String, Option<String>)> = (start..start + count)
        .map(|i| {
            (
                Some(format!("user {}", i)),
                format!("review number {}", i),
                Some(format!("bintang {} dari 5", i % 5 + 1)),
            )
        })
        .collect();
    render_page(&items)
}

/// A review-feed page built from `(username, body, rating label)` triples.
pub fn page_with(items: &[(Option<&str>, &str, Option<&str>)]) -> String {
    let owned: Vec<(Option<String>, String, Option<String>)> = items
        .iter()
        .map(|(name, body, label)| (name.map(String::from), body.to_string(), label.map(String::from)))
        .collect();
    render_page(&owned)
}

fn render_page(items: &[(Option<String>, String, Option<String>)]) -> String {
    let mut html = String::from("<html><body><header>Product</header><section id=\"review-feed\">");
    for (name, body, label) in items {
        html.push_str("<article>");
        if let Some(name) = name {
            html.push_str(&format!("<span class=\"name\">{}</span>", name));
        }
        html.push_str(&format!("<p><span data-testid=\"lblItemUlasan\">{}</span></p>", body));
        if let Some(label) = label {
            html.push_str(&format!("<div data-testid=\"icnStarRating\" aria-label=\"{}\"></div>", label));
        }
        html.push_str("</article>");
    }
    html.push_str("</section></body></html>");
    html
}

/// Everything the fake renderer was asked to do.
#[derive(Debug, Clone, Default)]
pub struct FakeLog {
    pub opened: Vec<String>,
    pub minimized: usize,
    pub closed: usize,
    pub feed_waits: usize,
    pub next_waits: usize,
    pub triggers: Vec<Trigger>,
}

impl FakeLog {
    pub fn triggers_of(&self, trigger: &Trigger) -> usize {
        self.triggers.iter().filter(|t| *t == trigger).count()
    }

    pub fn clicks(&self) -> usize {
        self.triggers.iter().filter(|t| matches!(t, Trigger::Click(_))).count()
    }
}

/// Serves a fixed list of pages per URL; the next-page control exists
/// whenever another page follows the current one.
pub struct FakeRenderer {
    sites: HashMap<String, Vec<String>>,
    unreachable: HashSet<String>,
    pages: Vec<String>,
    current: Cell<usize>,
    hidden_feed_waits: Cell<u32>,
    feed_always_present: bool,
    log: Rc<RefCell<FakeLog>>,
}

impl FakeRenderer {
    /// A renderer already showing `pages`.
    pub fn single(pages: Vec<String>) -> Self {
        FakeRenderer {
            sites: HashMap::new(),
            unreachable: HashSet::new(),
            pages,
            current: Cell::new(0),
            hidden_feed_waits: Cell::new(0),
            feed_always_present: false,
            log: Rc::new(RefCell::new(FakeLog::default())),
        }
    }

    /// A renderer that loads pages according to the URL passed to `open`.
    pub fn for_sites(sites: HashMap<String, Vec<String>>) -> Self {
        FakeRenderer {
            sites,
            ..FakeRenderer::single(Vec::new())
        }
    }

    /// The first `waits` presence waits time out (`u32::MAX`: all of them).
    pub fn with_hidden_feed(self, waits: u32) -> Self {
        self.hidden_feed_waits.set(waits);
        self
    }

    pub fn with_feed_always_present(mut self) -> Self {
        self.feed_always_present = true;
        self
    }

    pub fn with_unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    /// Share a log across renderers, e.g. one per URL in a batch.
    pub fn with_log(mut self, log: Rc<RefCell<FakeLog>>) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> FakeLog {
        self.log.borrow().clone()
    }

    pub fn page_index(&self) -> usize {
        self.current.get()
    }

    fn has_next(&self) -> bool {
        self.current.get() + 1 < self.pages.len()
    }

    fn timeout(condition: &WaitCondition, timeout: Duration) -> RenderError {
        RenderError::Timeout {
            condition: condition.to_string(),
            timeout,
        }
    }
}

impl Renderer for FakeRenderer {
    fn open(&mut self, url: &str) -> Result<(), RenderError> {
        self.log.borrow_mut().opened.push(url.to_string());
        if self.unreachable.contains(url) {
            return Err(RenderError::Browser(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)));
        }
        if !self.sites.is_empty() {
            self.pages = self.sites.get(url).cloned().unwrap_or_default();
        }
        self.current.set(0);
        Ok(())
    }

    fn minimize(&mut self) -> Result<(), RenderError> {
        self.log.borrow_mut().minimized += 1;
        Ok(())
    }

    fn current_document(&self) -> Result<String, RenderError> {
        self.pages.get(self.current.get()).cloned().ok_or(RenderError::NotOpen)
    }

    fn run_trigger(&self, trigger: &Trigger) -> Result<(), RenderError> {
        self.log.borrow_mut().triggers.push(trigger.clone());
        if let Trigger::Click(selector) = trigger {
            if !self.has_next() {
                return Err(RenderError::MissingElement(selector.clone()));
            }
            self.current.set(self.current.get() + 1);
        }
        Ok(())
    }

    fn wait_for(&self, condition: &WaitCondition, timeout: Duration) -> Result<(), RenderError> {
        match condition {
            WaitCondition::Present(selector) => {
                self.log.borrow_mut().feed_waits += 1;
                let hidden = self.hidden_feed_waits.get();
                if hidden > 0 {
                    if hidden != u32::MAX {
                        self.hidden_feed_waits.set(hidden - 1);
                    }
                    return Err(Self::timeout(condition, timeout));
                }
                if self.feed_always_present {
                    return Ok(());
                }
                let html = self.current_document()?;
                let document = Html::parse_document(&html);
                let present = Selector::parse(selector)
                    .map(|s| document.select(&s).next().is_some())
                    .unwrap_or(false);
                if present { Ok(()) } else { Err(Self::timeout(condition, timeout)) }
            }
            WaitCondition::Clickable(_) => {
                self.log.borrow_mut().next_waits += 1;
                if self.has_next() { Ok(()) } else { Err(Self::timeout(condition, timeout)) }
            }
        }
    }

    fn close(&mut self) -> Result<(), RenderError> {
        self.log.borrow_mut().closed += 1;
        Ok(())
    }
}
