//! Google Cloud Storage client for staging consultation audio
//!
//! Uses the JSON API directly: simple media uploads, object deletes and
//! bucket creation. Audio objects are short-lived and removed by the batch
//! runner once recognition finishes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::error::VoiceResult;
use crate::providers::google_auth::GoogleAuth;
use crate::providers::{error_for_status, ObjectStore};

const STORAGE_API: &str = "https://storage.googleapis.com";

pub struct GcsObjectStore {
    client: reqwest::Client,
    auth: Arc<GoogleAuth>,
    project_id: String,
    base_url: String,
}

impl GcsObjectStore {
    pub fn new(auth: Arc<GoogleAuth>, project_id: impl Into<String>, timeout: Duration) -> VoiceResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            auth,
            project_id: project_id.into(),
            base_url: STORAGE_API.to_string(),
        })
    }

    /// Point the client at a storage emulator
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8], content_type: &str) -> VoiceResult<()> {
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        );
        let token = self.auth.bearer_token().await?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await?;
        error_for_status(response, &format!("bucket {}", bucket)).await?;

        debug!(bucket = %bucket, object = %key, size = bytes.len(), "Uploaded audio object");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> VoiceResult<()> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        );
        let token = self.auth.bearer_token().await?;

        let response = self.client.delete(&url).bearer_auth(token).send().await?;
        error_for_status(response, &format!("object gs://{}/{}", bucket, key)).await?;

        debug!(bucket = %bucket, object = %key, "Deleted audio object");
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> VoiceResult<()> {
        let url = format!(
            "{}/storage/v1/b?project={}",
            self.base_url,
            urlencoding::encode(&self.project_id)
        );
        let token = self.auth.bearer_token().await?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "name": bucket,
                "location": region,
                "iamConfiguration": { "uniformBucketLevelAccess": { "enabled": true } }
            }))
            .send()
            .await?;
        error_for_status(response, &format!("bucket {}", bucket)).await?;

        info!(bucket = %bucket, region = %region, "✅ Storage bucket created");
        Ok(())
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("gs://{}/{}", bucket, key)
    }
}

impl std::fmt::Debug for GcsObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsObjectStore")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
