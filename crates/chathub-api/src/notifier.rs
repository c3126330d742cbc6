//! Backend notifier implementations.
//!
//! The HTTP notifier posts topic lifecycle notices to the configured
//! backend. Every call is fire-and-forget for the engine: failures are
//! returned so the caller can log them, nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use chathub_core::config::BackendConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::traits::BackendNotifier;

/// Posts notices to the backend over HTTP.
#[derive(Debug)]
pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotifier {
    /// Creates a notifier from configuration.
    pub fn new(config: &BackendConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::configuration(format!("backend client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.announce_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> AppResult<()> {
        let url = format!("{}/{path}", self.base_url);
        self.client
            .post(&url)
            .form(form)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::backend(format!("notice to {url} failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl BackendNotifier for HttpNotifier {
    async fn startup(&self) -> AppResult<()> {
        self.post_form("startup", &[("startup", "1".to_string())])
            .await
    }

    async fn new_topic(&self, topic: &str) -> AppResult<()> {
        self.post_form("new_topic", &[("topic", topic.to_string())])
            .await
    }

    async fn topics_reaped(&self, topics: &[String]) -> AppResult<()> {
        self.post_form("cleanup", &[("topics", topics.join(","))])
            .await
    }
}

/// Notifier used when the backend is not configured.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl BackendNotifier for NullNotifier {
    async fn startup(&self) -> AppResult<()> {
        Ok(())
    }

    async fn new_topic(&self, _topic: &str) -> AppResult<()> {
        Ok(())
    }

    async fn topics_reaped(&self, _topics: &[String]) -> AppResult<()> {
        Ok(())
    }
}

/// Builds the notifier the configuration asks for.
pub fn build_notifier(config: &BackendConfig) -> AppResult<Arc<dyn BackendNotifier>> {
    if config.enabled && !config.announce_url.is_empty() {
        Ok(Arc::new(HttpNotifier::new(config)?))
    } else {
        Ok(Arc::new(NullNotifier))
    }
}
