use anyhow::Result;

/// Application configuration loaded from environment variables.
///
/// Only secrets and environment-specific values live here; algorithm
/// parameters (TOPK, CORE_KEEP, timeouts) are compile-time constants in the
/// pipeline crate since they're invariants of the system, not deployment
/// knobs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Object store (content-addressed video/transcript/manifest bucket)
    pub object_store_endpoint: String,
    pub object_store_region: String,
    pub object_store_access_key: String,
    pub object_store_secret_key: String,
    pub object_store_bucket: String,
    pub object_store_use_path_style: bool,

    // AI / LLM
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub summarize_model: String,
    pub keyword_model: String,

    // Black-box activity services (platform search/download/STT engines live
    // behind these HTTP endpoints; this crate only speaks their wire contract)
    pub search_service_url: String,
    pub download_service_url: String,
    pub transcribe_service_url: String,

    // Durable runtime (Restate)
    pub restate_admin_url: Option<String>,
    pub restate_self_url: Option<String>,
    pub restate_auth_token: Option<String>,
    pub restate_bind_addr: String,

    // Bounded parallelism
    pub cpu_worker_count: usize,
    pub gpu_worker_count: usize,
    pub pipeline_parallelism: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            object_store_endpoint: std::env::var("OBJECT_STORE_ENDPOINT")?,
            object_store_region: std::env::var("OBJECT_STORE_REGION")
                .unwrap_or_else(|_| "us-east-1".to_string()),
            object_store_access_key: std::env::var("OBJECT_STORE_ACCESS_KEY")?,
            object_store_secret_key: std::env::var("OBJECT_STORE_SECRET_KEY")?,
            object_store_bucket: std::env::var("OBJECT_STORE_BUCKET")
                .unwrap_or_else(|_| "reelquery".to_string()),
            object_store_use_path_style: std::env::var("OBJECT_STORE_PATH_STYLE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            summarize_model: std::env::var("SUMMARIZE_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            keyword_model: std::env::var("KEYWORD_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            search_service_url: std::env::var("SEARCH_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8090/search".to_string()),
            download_service_url: std::env::var("DOWNLOAD_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8090/download".to_string()),
            transcribe_service_url: std::env::var("TRANSCRIBE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8091/transcribe".to_string()),
            restate_admin_url: std::env::var("RESTATE_ADMIN_URL").ok(),
            restate_self_url: std::env::var("RESTATE_SELF_URL").ok(),
            restate_auth_token: std::env::var("RESTATE_AUTH_TOKEN").ok(),
            restate_bind_addr: std::env::var("RESTATE_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:9080".to_string()),
            cpu_worker_count: std::env::var("CPU_WORKER_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            gpu_worker_count: std::env::var("GPU_WORKER_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            pipeline_parallelism: std::env::var("PIPELINE_PARALLELISM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OBJECT_STORE_ENDPOINT: {}", self.object_store_endpoint);
        tracing::info!("  OBJECT_STORE_BUCKET: {}", self.object_store_bucket);
        tracing::info!(
            "  OBJECT_STORE_ACCESS_KEY: {}",
            preview(&self.object_store_access_key)
        );
        tracing::info!("  OPENAI_API_KEY: {}", preview_opt(&self.openai_api_key));
        tracing::info!(
            "  ANTHROPIC_API_KEY: {}",
            preview_opt(&self.anthropic_api_key)
        );
        tracing::info!(
            "  RESTATE_ADMIN_URL: {}",
            preview_opt(&self.restate_admin_url)
        );
        tracing::info!(
            "  parallelism: cpu={} gpu={} pipeline={}",
            self.cpu_worker_count,
            self.gpu_worker_count,
            self.pipeline_parallelism
        );
    }
}
