//! Publishing: hands a finished report to an external site.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collaborators::CollaboratorError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Publication {
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

/// Outcome of a publish call. `id`/`url` are whatever the site assigned, for follow-up linking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub success: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, publication: &Publication) -> Result<PublishReceipt, CollaboratorError>;
}

/// Used when no publish target is configured.
pub struct DisabledPublisher;

#[async_trait]
impl Publisher for DisabledPublisher {
    async fn publish(&self, _publication: &Publication) -> Result<PublishReceipt, CollaboratorError> {
        Err(CollaboratorError::Unavailable)
    }
}

/// POSTs the publication as JSON and reads `{id, url}` back.
pub struct WebhookPublisher {
    client: Client,
    url: String,
}

impl WebhookPublisher {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl Publisher for WebhookPublisher {
    async fn publish(&self, publication: &Publication) -> Result<PublishReceipt, CollaboratorError> {
        let response = self
            .client
            .post(&self.url)
            .json(publication)
            .send()
            .await
            .map_err(|e| CollaboratorError::Publish(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Publish(format!("status {status}: {body}")));
        }

        let body = response.text().await.unwrap_or_default();
        let assigned = serde_json::from_str::<WebhookResponse>(&body).ok();

        let receipt = PublishReceipt {
            success: true,
            id: assigned.as_ref().and_then(|a| a.id.clone()),
            url: assigned.and_then(|a| a.url),
        };
        info!(
            "Published '{}' (id={:?}, url={:?})",
            publication.title, receipt.id, receipt.url
        );
        Ok(receipt)
    }
}
