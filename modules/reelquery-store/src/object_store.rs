//! S3-compatible object-store adapter. One bucket holds every query's
//! videos, transcripts, combined artifacts, and manifest under the
//! canonical layout from [`crate::naming`].

use crate::naming;
use reelquery_core::{PipelineError, PipelineResult};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct ObjectStore {
    bucket: Box<Bucket>,
}

impl ObjectStore {
    pub fn new(
        endpoint: &str,
        region: &str,
        bucket_name: &str,
        access_key: &str,
        secret_key: &str,
        path_style: bool,
    ) -> PipelineResult<Self> {
        let region = Region::Custom {
            region: region.to_string(),
            endpoint: endpoint.to_string(),
        };
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| PipelineError::fatal(format!("object store credentials: {e}")))?;

        let mut bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| PipelineError::fatal(format!("object store bucket: {e}")))?;
        if path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }

    /// Infer a content type by file extension, the same heuristic a writer
    /// applies before every `put`.
    pub fn infer_content_type(key: &str) -> &'static str {
        match key.rsplit('.').next().unwrap_or("") {
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            _ => "application/octet-stream",
        }
    }

    pub async fn exists(&self, key: &str) -> PipelineResult<bool> {
        match self.get(key).await {
            Ok(_) => Ok(true),
            Err(PipelineError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read an object by its canonical key. On `NotFound`, falls back to the
    /// key's legacy flat-layout counterpart (if one exists for this key's
    /// category) before surfacing the error — read-only compatibility with
    /// object state written under a previous layout generation.
    pub async fn get(&self, key: &str) -> PipelineResult<Vec<u8>> {
        match self.get_canonical(key).await {
            Err(PipelineError::NotFound(_)) => {
                if let Some(legacy_key) = naming::legacy_fallback_for(key) {
                    tracing::debug!(canonical = key, legacy = %legacy_key, "canonical object missing, falling back to legacy layout");
                    return self.get_canonical(&legacy_key).await;
                }
                Err(PipelineError::not_found(format!(
                    "object not found: {key}"
                )))
            }
            other => other,
        }
    }

    async fn get_canonical(&self, key: &str) -> PipelineResult<Vec<u8>> {
        self.with_retry(|| async {
            let response = self
                .bucket
                .get_object(key)
                .await
                .map_err(|e| classify_s3_error(key, e))?;
            if response.status_code() == 404 {
                return Err(PipelineError::not_found(format!(
                    "object not found: {key}"
                )));
            }
            Ok(response.bytes().to_vec())
        })
        .await
    }

    pub async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> PipelineResult<()> {
        self.with_retry(|| async {
            self.bucket
                .put_object_with_content_type(key, bytes, content_type)
                .await
                .map_err(|e| classify_s3_error(key, e))?;
            Ok(())
        })
        .await
    }

    pub async fn put_inferred(&self, key: &str, bytes: &[u8]) -> PipelineResult<()> {
        self.put(key, bytes, Self::infer_content_type(key)).await
    }

    pub async fn copy(&self, src: &str, dst: &str) -> PipelineResult<()> {
        let bytes = self.get(src).await?;
        self.put(dst, &bytes, Self::infer_content_type(dst)).await
    }

    /// List object keys under `prefix`. The real adapter streams pages; this
    /// signature collects them since manifest/index use cases here are
    /// bounded per query.
    pub async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>> {
        self.with_retry(|| async {
            let results = self
                .bucket
                .list(prefix.to_string(), None)
                .await
                .map_err(|e| classify_s3_error(prefix, e))?;
            Ok(results
                .into_iter()
                .flat_map(|page| page.contents)
                .map(|obj| obj.key)
                .collect())
        })
        .await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> PipelineResult<T> {
        let bytes = self.get(key).await?;
        serde_json::from_slice(&bytes).map_err(PipelineError::from)
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> PipelineResult<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(PipelineError::from)?;
        self.put(key, &bytes, "application/json").await
    }

    async fn with_retry<F, Fut, T>(&self, mut f: F) -> PipelineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = PipelineResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retriable() && attempt < MAX_ATTEMPTS => {
                    let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                    tracing::warn!(attempt, error = %e, "object store op failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify_s3_error(key: &str, e: s3::error::S3Error) -> PipelineError {
    PipelineError::transient(format!("object store op on {key}: {e}"))
}
