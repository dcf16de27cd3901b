use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        notification::Notification,
        response::{ApiMessage, ApiResponse, ErrorBody, UnreadCount},
        session::SessionToken,
    },
};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// 通知相关的后端REST接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list(&self, token: &SessionToken, limit: usize, skip: usize) -> Result<Vec<Notification>>;

    async fn unread_count(&self, token: &SessionToken) -> Result<u64>;

    async fn mark_read(&self, token: &SessionToken, id: &str) -> Result<Notification>;

    async fn mark_all_read(&self, token: &SessionToken) -> Result<()>;

    async fn delete(&self, token: &SessionToken, id: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpNotificationApi {
    http_client: Client,
    base_url: Url,
}

impl HttpNotificationApi {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!("Invalid API_URL: {}", config.api_url)));
        }

        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .unwrap_or_default()
                .into_message();
            error!("Notification API returned {}: {}", status, message);
            return Err(AppError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    fn ensure_success(success: bool, message: Option<String>) -> Result<()> {
        if success {
            return Ok(());
        }
        Err(AppError::Api {
            status: 200,
            message: message.unwrap_or_else(|| ErrorBody::FALLBACK_MESSAGE.to_string()),
        })
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self, token: &SessionToken, limit: usize, skip: usize) -> Result<Vec<Notification>> {
        debug!("Fetching notifications limit={} skip={}", limit, skip);

        let response = self
            .http_client
            .get(self.endpoint(&["notifications"]))
            .bearer_auth(token.as_str())
            .query(&[("limit", limit), ("skip", skip)])
            .send()
            .await?;

        let body: ApiResponse<Vec<Notification>> = Self::parse(response).await?;
        Self::ensure_success(body.success, body.message)?;
        Ok(body.data)
    }

    async fn unread_count(&self, token: &SessionToken) -> Result<u64> {
        let response = self
            .http_client
            .get(self.endpoint(&["notifications", "unread-count"]))
            .bearer_auth(token.as_str())
            .send()
            .await?;

        let body: ApiResponse<UnreadCount> = Self::parse(response).await?;
        Self::ensure_success(body.success, body.message)?;
        Ok(body.data.count)
    }

    async fn mark_read(&self, token: &SessionToken, id: &str) -> Result<Notification> {
        let response = self
            .http_client
            .patch(self.endpoint(&["notifications", id, "read"]))
            .bearer_auth(token.as_str())
            .send()
            .await?;

        let body: ApiResponse<Notification> = Self::parse(response).await?;
        Self::ensure_success(body.success, body.message)?;
        Ok(body.data)
    }

    async fn mark_all_read(&self, token: &SessionToken) -> Result<()> {
        let response = self
            .http_client
            .patch(self.endpoint(&["notifications", "read-all"]))
            .bearer_auth(token.as_str())
            .send()
            .await?;

        let body: ApiMessage = Self::parse(response).await?;
        Self::ensure_success(body.success, body.message)
    }

    async fn delete(&self, token: &SessionToken, id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.endpoint(&["notifications", id]))
            .bearer_auth(token.as_str())
            .send()
            .await?;

        let body: ApiMessage = Self::parse(response).await?;
        Self::ensure_success(body.success, body.message)
    }
}
