use super::{truncate_body, Notifier, ERROR_BODY_LOG_CHARS};
use crate::error::{AppError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API notifier (`sendMessage` with Markdown).
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: String,
    api_url: String,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("Scout/0.1")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            token,
            chat_id,
            api_url: TELEGRAM_API_URL.to_string(),
        }
    }

    /// Point the notifier at another Bot API host.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!(
                "Telegram API returned {}: {}",
                status,
                truncate_body(&text, ERROR_BODY_LOG_CHARS)
            );
            return Err(AppError::Notification(format!("Telegram API error: {}", status)));
        }

        let parsed: TelegramResponse = serde_json::from_str(&text)?;
        if !parsed.ok {
            return Err(AppError::Notification(
                parsed
                    .description
                    .unwrap_or_else(|| "Telegram rejected message".to_string()),
            ));
        }

        debug!("Telegram message delivered to chat {}", self.chat_id);
        Ok(())
    }
}

impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    fn notify<'a>(&'a self, text: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.send_message(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_server::serve_once;

    #[test]
    fn test_response_parsing() {
        let ok: TelegramResponse = serde_json::from_str(r#"{"ok":true,"result":{}}"#).unwrap();
        assert!(ok.ok);

        let rejected: TelegramResponse =
            serde_json::from_str(r#"{"ok":false,"description":"Bad Request: chat not found"}"#)
                .unwrap();
        assert!(!rejected.ok);
        assert_eq!(rejected.description.as_deref(), Some("Bad Request: chat not found"));
    }

    #[tokio::test]
    async fn test_multibyte_error_body_is_not_fatal() {
        // warn! arguments are only evaluated with a subscriber installed
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let body = format!("{}é…", "x".repeat(199));
        let api_url = serve_once("500 Internal Server Error", body).await;
        let notifier = TelegramNotifier::new(
            "token".to_string(),
            "42".to_string(),
            Duration::from_secs(5),
        )
        .with_api_url(&api_url);

        let result = notifier.notify("*LONG* BTCUSDT").await;
        assert!(matches!(result, Err(AppError::Notification(_))));
    }
}
