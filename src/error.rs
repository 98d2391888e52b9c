use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Data fetch error: {0}")]
    DataFetch(String),

    #[error("Insufficient history: need {needed} candles, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the error came from the market-data side of a scan.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AppError::DataFetch(_)
                | AppError::InsufficientHistory { .. }
                | AppError::Timeout(_)
                | AppError::Reqwest(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
