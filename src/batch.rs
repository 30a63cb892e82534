use log::{error, info, warn};

use crate::collector::CollectionLoop;
use crate::config::Config;
use crate::delay_manager;
use crate::extractor::Extractor;
use crate::models::{BatchOutcome, ReviewRecord, ScrapeStatus, UrlReport};
use crate::renderer::{RenderError, Renderer};

pub struct BatchRunner<'a> {
    config: &'a Config,
    extractor: Extractor,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a Config) -> Result<Self, crate::config::ConfigError> {
        Ok(BatchRunner {
            config,
            extractor: Extractor::new(&config.selectors)?,
        })
    }

    /// Processes `urls` in order. `launch` supplies a fresh renderer per URL;
    /// a launch failure aborts the batch, anything after it does not.
    pub fn run<R, F>(&self, urls: &[String], mut launch: F) -> Result<BatchOutcome, RenderError>
    where
        R: Renderer,
        F: FnMut() -> Result<R, RenderError>,
    {
        let mut outcome = BatchOutcome::default();
        let total = urls.len();

        for (i, url) in urls.iter().enumerate() {
            info!("Scraping product {} of {}: {}", i + 1, total, url);

            let mut renderer = launch()?;
            let (records, status) = self.collect_url(&mut renderer, url);
            if let Err(e) = renderer.close() {
                warn!("Failed to release renderer for {}: {}", url, e);
            }

            if status == ScrapeStatus::NoData {
                warn!("No reviews from this link: {}", url);
            }
            outcome.reports.push(UrlReport {
                url: url.clone(),
                status,
                records: records.len(),
            });
            outcome.records.extend(records);
        }

        info!(
            "Batch finished: {} reviews from {} links.",
            outcome.records.len(),
            total
        );
        Ok(outcome)
    }

    fn collect_url<R: Renderer>(&self, renderer: &mut R, url: &str) -> (Vec<ReviewRecord>, ScrapeStatus) {
        if let Err(e) = renderer.open(url) {
            error!("Failed to open {}: {}", url, e);
            return (Vec::new(), ScrapeStatus::Error);
        }
        if let Err(e) = renderer.minimize() {
            warn!("Could not minimize browser window: {}", e);
        }
        delay_manager::pause("initial render", self.config.timings.initial_render);

        let records = CollectionLoop::new(self.config, &self.extractor).run(&*renderer);
        let status = if records.is_empty() {
            ScrapeStatus::NoData
        } else {
            ScrapeStatus::Success
        };
        (records, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{review_page, test_config, FakeLog, FakeRenderer};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[test]
    fn failing_url_does_not_abort_batch() {
        let config = test_config();
        let runner = BatchRunner::new(&config).unwrap();
        let log = Rc::new(RefCell::new(FakeLog::default()));
        let mut sites = HashMap::new();
        sites.insert("https://shop.test/b".to_string(), vec![review_page(0, 5)]);

        let urls = vec!["https://shop.test/a".to_string(), "https://shop.test/b".to_string()];
        let outcome = runner
            .run(&urls, || {
                Ok(FakeRenderer::for_sites(sites.clone())
                    .with_unreachable("https://shop.test/a")
                    .with_log(log.clone()))
            })
            .unwrap();

        assert_eq!(outcome.records.len(), 5);
        assert_eq!(outcome.reports[0].status, ScrapeStatus::Error);
        assert_eq!(outcome.reports[1].status, ScrapeStatus::Success);
        // Renderer released for both URLs, minimized only where opened.
        assert_eq!(log.borrow().closed, 2);
        assert_eq!(log.borrow().minimized, 1);
    }

    #[test]
    fn empty_listing_reports_no_data() {
        let config = test_config();
        let runner = BatchRunner::new(&config).unwrap();
        let urls = vec!["https://shop.test/empty".to_string()];
        let outcome = runner
            .run(&urls, || Ok(FakeRenderer::for_sites(HashMap::new())))
            .unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.reports[0].status, ScrapeStatus::NoData);
    }

    #[test]
    fn launch_failure_propagates() {
        let config = test_config();
        let runner = BatchRunner::new(&config).unwrap();
        let urls = vec!["https://shop.test/a".to_string()];
        let result = runner.run::<FakeRenderer, _>(&urls, || Err(RenderError::Launch("no chrome".into())));
        assert!(matches!(result, Err(RenderError::Launch(_))));
    }
}
