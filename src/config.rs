use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Runtime
    pub environment: String,
    pub log_level: String,

    // Backend endpoints
    pub api_url: String,
    pub ws_url: String,
    pub request_timeout_secs: u64,

    // Notification session
    pub notification_page_size: usize,
    pub rollback_on_failure: bool,
    pub unread_poll_interval_secs: u64,

    // Feature flags
    pub enable_push: bool,
    pub enable_system_alerts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "rainbow_notify=info".to_string(),
            api_url: "http://localhost:3000".to_string(),
            ws_url: "ws://localhost:3000".to_string(),
            request_timeout_secs: 30,
            notification_page_size: 20,
            rollback_on_failure: true,
            unread_poll_interval_secs: 60,
            enable_push: true,
            enable_system_alerts: true,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "rainbow_notify=info".to_string()),

            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ws_url: env::var("WS_URL").unwrap_or_else(|_| "ws://localhost:3000".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,

            notification_page_size: env::var("NOTIFICATION_PAGE_SIZE")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            rollback_on_failure: env::var("ROLLBACK_ON_FAILURE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            unread_poll_interval_secs: env::var("UNREAD_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,

            enable_push: env::var("ENABLE_PUSH")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            enable_system_alerts: env::var("ENABLE_SYSTEM_ALERTS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
        };

        if config.notification_page_size == 0 {
            anyhow::bail!("NOTIFICATION_PAGE_SIZE must be greater than zero");
        }

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
