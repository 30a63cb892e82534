pub mod models;
pub mod config;
pub mod logger;
pub mod delay_manager;
pub mod document;
pub mod extractor;
pub mod renderer;
pub mod pager;
pub mod collector;
pub mod batch;
pub mod store;
pub mod input_loader;
pub mod prompt;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Exporting types for convenience
pub use batch::BatchRunner;
pub use collector::{CollectionLoop, CollectionState, StopReason};
pub use config::Config;
pub use extractor::{ExtractionError, Extractor};
pub use models::{BatchOutcome, ReviewRecord, ScrapeStatus, UrlReport};
pub use pager::PageAdvancer;
pub use renderer::{ChromeRenderer, RenderError, Renderer, Trigger, WaitCondition};
pub use store::{MergeOutcome, MergeStore};
