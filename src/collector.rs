use log::{debug, info, warn};
use scraper::Html;

use crate::config::Config;
use crate::delay_manager;
use crate::document::PageSnapshot;
use crate::extractor::Extractor;
use crate::models::ReviewRecord;
use crate::pager::PageAdvancer;
use crate::renderer::Renderer;

#[derive(Debug, Default)]
pub struct CollectionState {
    pub accumulated: Vec<ReviewRecord>,
    pub previous_total: usize,
    pub page_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Scrolling,
    Extracting,
    Deciding { element_groups: usize },
    Advancing,
    Done(StopReason),
}

/// Why collection for a URL ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FeedNotRevealed,
    DocumentUnavailable,
    SectionMissing,
    NoElementGroups,
    LowVolume,
    Stalled,
    LastPage,
}

impl StopReason {
    fn describe(&self) -> &'static str {
        match self {
            StopReason::FeedNotRevealed => "review feed did not appear",
            StopReason::DocumentUnavailable => "page content unavailable",
            StopReason::SectionMissing => "review section not found",
            StopReason::NoElementGroups => "no reviews found",
            StopReason::LowVolume => "few reviews on page, probably the last one",
            StopReason::Stalled => "review count did not grow, probably the last page",
            StopReason::LastPage => "no further pages",
        }
    }
}

pub struct CollectionLoop<'a> {
    config: &'a Config,
    extractor: &'a Extractor,
}

impl<'a> CollectionLoop<'a> {
    pub fn new(config: &'a Config, extractor: &'a Extractor) -> Self {
        CollectionLoop { config, extractor }
    }

    pub fn run<R: Renderer>(&self, renderer: &R) -> Vec<ReviewRecord> {
        self.run_with_reason(renderer).0
    }

    pub fn run_with_reason<R: Renderer>(&self, renderer: &R) -> (Vec<ReviewRecord>, StopReason) {
        let advancer = PageAdvancer::new(renderer, self.config);
        let mut state = CollectionState {
            page_index: 1,
            ..CollectionState::default()
        };
        let mut phase = Phase::Scrolling;

        let reason = loop {
            phase = match phase {
                Phase::Scrolling => {
                    if advancer.reveal_current_page() {
                        Phase::Extracting
                    } else {
                        Phase::Done(StopReason::FeedNotRevealed)
                    }
                }
                Phase::Extracting => self.extract_page(renderer, &mut state),
                Phase::Deciding { element_groups } => self.decide(&mut state, element_groups),
                Phase::Advancing => {
                    if advancer.advance_to_next_page() {
                        delay_manager::pause("navigation settle", self.config.timings.navigation_settle);
                        state.page_index += 1;
                        Phase::Scrolling
                    } else {
                        Phase::Done(StopReason::LastPage)
                    }
                }
                Phase::Done(reason) => break reason,
            };
        };

        info!(
            "Stopped after page {}: {}. Collected {} reviews.",
            state.page_index,
            reason.describe(),
            state.accumulated.len()
        );
        (state.accumulated, reason)
    }

    fn extract_page<R: Renderer>(&self, renderer: &R, state: &mut CollectionState) -> Phase {
        delay_manager::pause("snapshot settle", self.config.timings.snapshot_settle);

        let html = match renderer.current_document() {
            Ok(html) => html,
            Err(e) => {
                warn!("Could not read page content: {}", e);
                return Phase::Done(StopReason::DocumentUnavailable);
            }
        };
        let document = Html::parse_document(&html);
        let selectors = &self.config.selectors;

        let snapshot = match PageSnapshot::capture(&document, &selectors.review_section_id, &selectors.element_tag) {
            Some(s) => s,
            None => {
                warn!("Review section not found.");
                return Phase::Done(StopReason::SectionMissing);
            }
        };
        if snapshot.is_empty() {
            warn!("No reviews found in review section.");
            return Phase::Done(StopReason::NoElementGroups);
        }

        for group in &snapshot.element_groups {
            match self.extractor.extract(*group) {
                Ok(record) => state.accumulated.push(record),
                Err(e) => debug!("Skipping review element: {}", e),
            }
        }

        info!(
            "Page {}: {} reviews found. Total: {}",
            state.page_index,
            snapshot.count(),
            state.accumulated.len()
        );
        Phase::Deciding { element_groups: snapshot.count() }
    }

    fn decide(&self, state: &mut CollectionState, element_groups: usize) -> Phase {
        if element_groups < self.config.low_volume_threshold {
            return Phase::Done(StopReason::LowVolume);
        }
        if state.accumulated.len() == state.previous_total {
            return Phase::Done(StopReason::Stalled);
        }
        state.previous_total = state.accumulated.len();

        if let Some(max) = self.config.max_pages {
            if state.page_index >= max {
                info!("Reached page limit ({}).", max);
                return Phase::Done(StopReason::LastPage);
            }
        }
        Phase::Advancing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{page_with, review_page, test_config, FakeRenderer};

    fn collect(renderer: &FakeRenderer, config: &Config) -> (Vec<ReviewRecord>, StopReason) {
        let extractor = Extractor::new(&config.selectors).unwrap();
        CollectionLoop::new(config, &extractor).run_with_reason(renderer)
    }

    #[test]
    fn low_volume_page_ends_collection() {
        let renderer = FakeRenderer::single(vec![review_page(0, 12), review_page(12, 4), review_page(16, 12)]);
        let (records, reason) = collect(&renderer, &test_config());
        assert_eq!(reason, StopReason::LowVolume);
        assert_eq!(records.len(), 16);
        assert_eq!(renderer.page_index(), 1);
    }

    #[test]
    fn stalled_progress_ends_collection() {
        // Second page has enough element groups but none carry a review body.
        let empty_bodies: Vec<(Option<&str>, &str, Option<&str>)> = vec![(Some("x"), "", None); 12];
        let renderer = FakeRenderer::single(vec![review_page(0, 12), page_with(&empty_bodies)]);
        let (records, reason) = collect(&renderer, &test_config());
        assert_eq!(reason, StopReason::Stalled);
        assert_eq!(records.len(), 12);
    }

    #[test]
    fn rejected_groups_are_skipped_without_ending_the_page() {
        let mut items: Vec<(Option<&str>, &str, Option<&str>)> = Vec::new();
        let bodies = [
            "a", "b", "", "c", "d", " \n ", "e", "f", "NO-BODY", "g", "h", "i",
        ];
        for body in bodies {
            items.push((Some("u"), body, Some("bintang 5 dari 5")));
        }
        let first = page_with(&items).replace("<p><span data-testid=\"lblItemUlasan\">NO-BODY</span></p>", "");
        let renderer = FakeRenderer::single(vec![first, review_page(100, 3)]);

        let (records, reason) = collect(&renderer, &test_config());
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "a", "b", "c", "d", "e", "f", "g", "h", "i",
                "review number 100", "review number 101", "review number 102",
            ]
        );
        assert_eq!(renderer.page_index(), 1);
        assert_eq!(reason, StopReason::LowVolume);
    }

    #[test]
    fn first_page_without_valid_reviews_stalls() {
        let empty_bodies: Vec<(Option<&str>, &str, Option<&str>)> = vec![(None, " ", None); 10];
        let renderer = FakeRenderer::single(vec![page_with(&empty_bodies)]);
        let (records, reason) = collect(&renderer, &test_config());
        assert!(records.is_empty());
        assert_eq!(reason, StopReason::Stalled);
    }

    #[test]
    fn missing_next_control_keeps_collected_records() {
        let renderer = FakeRenderer::single(vec![review_page(0, 12)]);
        let (records, reason) = collect(&renderer, &test_config());
        assert_eq!(reason, StopReason::LastPage);
        assert_eq!(records.len(), 12);
        assert_eq!(renderer.log().next_waits, 3);
    }

    #[test]
    fn feed_never_revealed_returns_empty() {
        let renderer = FakeRenderer::single(vec![review_page(0, 12)]).with_hidden_feed(u32::MAX);
        let (records, reason) = collect(&renderer, &test_config());
        assert!(records.is_empty());
        assert_eq!(reason, StopReason::FeedNotRevealed);
    }

    #[test]
    fn missing_section_ends_collection() {
        let renderer = FakeRenderer::single(vec!["<html><body><p>nothing</p></body></html>".to_string()])
            .with_feed_always_present();
        let (_, reason) = collect(&renderer, &test_config());
        assert_eq!(reason, StopReason::SectionMissing);
    }

    #[test]
    fn empty_section_ends_collection() {
        let renderer = FakeRenderer::single(vec![page_with(&[])]);
        let (records, reason) = collect(&renderer, &test_config());
        assert!(records.is_empty());
        assert_eq!(reason, StopReason::NoElementGroups);
    }

    #[test]
    fn duplicates_across_pages_are_kept_in_document_order() {
        let renderer = FakeRenderer::single(vec![review_page(0, 10), review_page(5, 10), review_page(20, 2)]);
        let (records, _) = collect(&renderer, &test_config());
        assert_eq!(records.len(), 22);
        assert_eq!(records[0].text, "review number 0");
        assert_eq!(records[10].text, "review number 5");
    }

    #[test]
    fn page_limit_stops_early() {
        let config = Config { max_pages: Some(2), ..test_config() };
        let renderer = FakeRenderer::single(vec![review_page(0, 10), review_page(10, 10), review_page(20, 10)]);
        let (records, reason) = collect(&renderer, &config);
        assert_eq!(reason, StopReason::LastPage);
        assert_eq!(records.len(), 20);
    }
}
