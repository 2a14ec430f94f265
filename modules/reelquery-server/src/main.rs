use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use reelquery_pipeline::orchestrator::QueryObjectImpl;
use reelquery_pipeline::runner::{QueryPipelineWorkflowImpl, VideoPipelineWorkflowImpl};

// Import Restate traits to bring `.serve()` into scope
use reelquery_pipeline::orchestrator::QueryObject;
use reelquery_pipeline::runner::{QueryPipelineWorkflow, VideoPipelineWorkflow};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting reelquery-server");

    let config = reelquery_core::AppConfig::from_env()?;

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    // AI clients
    let openai = Arc::new(ai_client::OpenAi::new(
        config.openai_api_key.clone().unwrap_or_default(),
        config.summarize_model.clone(),
    ));
    let claude = config
        .anthropic_api_key
        .as_ref()
        .map(|key| Arc::new(ai_client::Claude::new(key, "claude-sonnet-4-5-20250929")));

    // Object store (videos, thumbnails, transcripts, manifests, combined artifacts)
    let store = Arc::new(reelquery_store::ObjectStore::new(
        &config.object_store_endpoint,
        &config.object_store_region,
        &config.object_store_bucket,
        &config.object_store_access_key,
        &config.object_store_secret_key,
        config.object_store_use_path_style,
    )?);
    let manifests = Arc::new(reelquery_store::ManifestStore::new((*store).clone()));

    // Black-box activities (search/download/STT engines behind their own services)
    let searcher: Arc<dyn reelquery_core::VideoSearcher> = Arc::new(
        reelquery_pipeline::adapters::HttpVideoSearcher::new(
            http_client.clone(),
            config.search_service_url.clone(),
        ),
    );
    let downloader: Arc<dyn reelquery_core::VideoDownloader> = Arc::new(
        reelquery_pipeline::adapters::HttpVideoDownloader::new(
            http_client.clone(),
            config.download_service_url.clone(),
        ),
    );
    let transcriber: Arc<dyn reelquery_core::Transcriber> = Arc::new(
        reelquery_pipeline::adapters::HttpTranscriber::new(
            http_client.clone(),
            config.transcribe_service_url.clone(),
        ),
    );

    let restate_bind_addr = config.restate_bind_addr.clone();
    let restate_admin_url = config.restate_admin_url.clone();
    let restate_self_url = config.restate_self_url.clone();
    let restate_auth_token = config.restate_auth_token.clone();

    let deps = Arc::new(reelquery_core::PipelineDeps::new(
        http_client,
        openai,
        claude,
        searcher,
        downloader,
        transcriber,
        config,
    ));

    // ─── Restate Endpoint ────────────────────────────────────────────────────

    let restate_endpoint = restate_sdk::endpoint::Endpoint::builder()
        .bind(
            QueryObjectImpl::with_deps(deps.clone(), store.clone(), manifests.clone()).serve(),
        )
        .bind(
            QueryPipelineWorkflowImpl::with_deps(deps.clone(), store.clone(), manifests.clone())
                .serve(),
        )
        .bind(
            VideoPipelineWorkflowImpl::with_deps(deps.clone(), store.clone(), manifests.clone())
                .serve(),
        )
        .build();

    tracing::info!(addr = %restate_bind_addr, "Starting Restate endpoint");

    // Auto-register with Restate admin
    if let Some(admin_url) = &restate_admin_url {
        let self_url = restate_self_url
            .clone()
            .unwrap_or_else(|| format!("http://{restate_bind_addr}"));

        let client = reqwest::Client::new();
        let mut request = client
            .post(format!("{admin_url}/deployments"))
            .json(&serde_json::json!({
                "uri": self_url,
                "force": true,
            }));

        if let Some(token) = &restate_auth_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(resp) => {
                tracing::info!(status = %resp.status(), "Registered with Restate admin");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register with Restate admin");
            }
        }
    }

    restate_sdk::http_server::HttpServer::new(restate_endpoint)
        .listen_and_serve(restate_bind_addr.parse()?)
        .await;

    Ok(())
}
