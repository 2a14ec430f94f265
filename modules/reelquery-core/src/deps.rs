use crate::activities::{Transcriber, VideoDownloader, VideoSearcher};
use crate::config::AppConfig;
use ai_client::{Claude, OpenAi};
use std::sync::Arc;

/// Central dependency container passed to every workflow, object, and
/// service constructor. Built once at server startup and shared behind an
/// `Arc` so each durable invocation gets its own cheap handle.
#[derive(Clone)]
pub struct PipelineDeps {
    pub http_client: reqwest::Client,
    pub ai: Arc<OpenAi>,
    pub claude: Option<Arc<Claude>>,
    pub searcher: Arc<dyn VideoSearcher>,
    pub downloader: Arc<dyn VideoDownloader>,
    pub transcriber: Arc<dyn Transcriber>,
    pub config: AppConfig,
}

impl PipelineDeps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        http_client: reqwest::Client,
        ai: Arc<OpenAi>,
        claude: Option<Arc<Claude>>,
        searcher: Arc<dyn VideoSearcher>,
        downloader: Arc<dyn VideoDownloader>,
        transcriber: Arc<dyn Transcriber>,
        config: AppConfig,
    ) -> Self {
        Self {
            http_client,
            ai,
            claude,
            searcher,
            downloader,
            transcriber,
            config,
        }
    }
}
