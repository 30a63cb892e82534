use std::io;

use anyhow::Context;
use log::{error, info, warn};

use review_harvester_lib::{input_loader, logger, prompt};
use review_harvester_lib::{BatchRunner, ChromeRenderer, Config, MergeStore, ScrapeStatus};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logger::init();

    let config = Config::from_env().context("invalid configuration")?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    // 1. Source URLs: from file when configured, otherwise ask the operator.
    let urls = match &config.input_path {
        Some(path) => input_loader::load_urls(path)
            .with_context(|| format!("cannot load product URLs from {}", path.display()))?,
        None => match prompt::read_source_urls(&mut input, &mut out) {
            Ok(urls) => urls,
            Err(e) => {
                error!("{}", e);
                return Ok(());
            }
        },
    };
    if urls.is_empty() {
        warn!("No valid product URLs given. Nothing to do.");
        return Ok(());
    }

    // 2. Existing dataset, read once up front.
    let store = MergeStore::new(&config.output_path);
    let existing = store.load().context("existing review file is unreadable")?;

    // 3. Scrape.
    info!("Starting to scrape {} products...", urls.len());
    let runner = BatchRunner::new(&config).context("invalid selectors")?;
    let outcome = runner
        .run(&urls, || ChromeRenderer::launch(config.headless, config.chrome_path.clone()))
        .context("could not start the browser")?;

    for report in &outcome.reports {
        match report.status {
            ScrapeStatus::Success => info!("{}: {} reviews", report.url, report.records),
            ScrapeStatus::NoData => warn!("{}: no reviews", report.url),
            ScrapeStatus::Error => warn!("{}: failed to load", report.url),
        }
    }

    // 4. Merge and persist.
    if outcome.is_empty() {
        error!("No data could be saved.");
        return Ok(());
    }
    let merged = store
        .commit(outcome.records, existing)
        .with_context(|| format!("failed to save {}", store.path().display()))?;
    println!("\n{}", merged.summary(store.path()));

    if config.input_path.is_none() {
        prompt::wait_for_enter(&mut input, &mut out)?;
    }
    Ok(())
}
