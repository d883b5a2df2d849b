use std::sync::Arc;

use async_trait::async_trait;

use steel_client::SteelClient;
use steelsearch_common::{ScrapeRecord, SearchQuery};
use steelsearch_scout::{ChromiumConnector, PipelineError, ScrapeOrchestrator};

/// Executes one search-and-scrape run per call.
#[async_trait]
pub trait SearchRunner: Send + Sync {
    async fn run(&self, query: &SearchQuery) -> Result<Vec<ScrapeRecord>, PipelineError>;
}

/// Production runner: Steel-provisioned sessions driven over CDP.
pub struct SteelSearchRunner {
    sessions: Arc<SteelClient>,
    connector: Arc<ChromiumConnector>,
}

impl SteelSearchRunner {
    pub fn new(sessions: SteelClient) -> Self {
        Self {
            sessions: Arc::new(sessions),
            connector: Arc::new(ChromiumConnector),
        }
    }
}

#[async_trait]
impl SearchRunner for SteelSearchRunner {
    async fn run(&self, query: &SearchQuery) -> Result<Vec<ScrapeRecord>, PipelineError> {
        ScrapeOrchestrator::new(self.sessions.clone(), self.connector.clone())
            .run(query)
            .await
    }
}
