pub mod browser;
pub mod content;
pub mod observer;
pub mod orchestrator;
pub mod results;
pub mod search_page;
pub mod search_url;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod timings;
pub mod traits;

pub use browser::ChromiumConnector;
pub use observer::{ScrapeEvent, ScrapeObserver, TracingObserver};
pub use orchestrator::{PipelineError, ScrapeOrchestrator};
pub use search_url::{build_search_url, recency_token};
pub use timings::ScrapeTimings;
pub use traits::{BrowserConnector, BrowserPage, Locator, PageElement, SessionProvider};
