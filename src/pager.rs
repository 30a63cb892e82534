use std::time::Duration;
use log::info;

use crate::config::Config;
use crate::delay_manager::{self, RetryPolicy};
use crate::renderer::{Renderer, Trigger, WaitCondition};

const REVEAL_FRACTION: f64 = 0.6;

pub struct PageAdvancer<'r, R: Renderer> {
    renderer: &'r R,
    review_section: WaitCondition,
    next_page: String,
    reveal_retry: RetryPolicy,
    advance_retry: RetryPolicy,
    bottom_settle: Duration,
}

impl<'r, R: Renderer> PageAdvancer<'r, R> {
    pub fn new(renderer: &'r R, config: &Config) -> Self {
        PageAdvancer {
            renderer,
            review_section: WaitCondition::Present(config.selectors.review_section()),
            next_page: config.selectors.next_page.clone(),
            reveal_retry: config.reveal_retry,
            advance_retry: config.advance_retry,
            bottom_settle: config.timings.bottom_settle,
        }
    }

    /// Lazy-loads the review feed. `false` means the feed never showed up.
    pub fn reveal_current_page(&self) -> bool {
        delay_manager::with_retries("Scroll to reviews", &self.reveal_retry, |timeout| {
            self.renderer.run_trigger(&Trigger::ScrollToFraction(REVEAL_FRACTION))?;
            self.renderer.wait_for(&self.review_section, timeout)
        })
        .is_some()
    }

    /// Clicks the next-page control. `false` means this was the last page.
    pub fn advance_to_next_page(&self) -> bool {
        let next = WaitCondition::Clickable(self.next_page.clone());
        let clicked = delay_manager::with_retries("Next page", &self.advance_retry, |timeout| {
            self.renderer.run_trigger(&Trigger::ScrollToBottom)?;
            delay_manager::pause("bottom settle", self.bottom_settle);
            self.renderer.wait_for(&next, timeout)?;
            self.renderer.run_trigger(&Trigger::Click(self.next_page.clone()))
        });

        match clicked {
            Some(()) => true,
            None => {
                info!("No next-page control found; last page reached.");
                false
            }
        }
    }
}
