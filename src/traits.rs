use async_trait::async_trait;
use reqwest::Client;
use tracing::error;

use crate::error::AppError;
use crate::weather::Weather;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait MessageChannel: Send + Sync {
    async fn send_msg(&self, recipient: &str, message: &str) -> Result<(), AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait ExternalFact: Send + Sync {
    /// Current weather for `query` (a city name). Bounded by the client timeout.
    async fn fetch(&self, query: &str) -> Result<Weather, AppError>;
}

pub(crate) struct SignalChannel {
    pub(crate) http: Client,
    pub(crate) api_url: String,
    pub(crate) account: String,
}

#[async_trait]
impl MessageChannel for SignalChannel {
    async fn send_msg(&self, recipient: &str, message: &str) -> Result<(), AppError> {
        let url = format!("{}/v2/send", self.api_url);
        let body = serde_json::json!({
            "message": message,
            "number": self.account,
            "recipients": [recipient],
        });

        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Signal send failed");
            return Err(AppError::Signal(format!("Send failed: {status}")));
        }
        Ok(())
    }
}
