//! Outbound gateway client (OneBot-style HTTP API).

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::application::errors::ConfigError;
use crate::domain::traits::{ChatApi, REQUEST_ERR};

static POST_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^:\s]+:[0-9]+/?$").expect("valid pattern"));

/// HTTP client for the gateway's send endpoints. Failures surface as
/// status codes; nothing here raises into the router.
pub struct GatewayClient {
    base_url: String,
    access_token: String,
    client: Client,
}

impl GatewayClient {
    pub fn new(post_url: &str, access_token: &str) -> Result<Self, ConfigError> {
        if !POST_URL.is_match(post_url) {
            return Err(ConfigError::InvalidValue(format!(
                "post-url must look like http://127.0.0.1:8001/, got {post_url}"
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        Ok(Self {
            base_url: post_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            client,
        })
    }

    async fn call(&self, endpoint: &str, params: Vec<(&'static str, String)>) -> i64 {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut query = params;
        if !self.access_token.is_empty() {
            query.push(("access_token", self.access_token.clone()));
        }
        tracing::debug!("Gateway request to {url}");
        let response = match self.client.get(&url).query(&query).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Gateway request failed: {e}");
                return REQUEST_ERR;
            }
        };
        let status = response.status();
        let body: Value = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Gateway response was not JSON: {e}");
                return i64::from(status.as_u16());
            }
        };
        let retcode = body.get("retcode").and_then(Value::as_i64);
        if status.is_success() && retcode == Some(0) {
            200
        } else {
            retcode.unwrap_or_else(|| i64::from(status.as_u16()))
        }
    }
}

#[async_trait]
impl ChatApi for GatewayClient {
    async fn send_group_message(&self, group_id: i64, text: &str) -> i64 {
        self.call(
            "send_group_msg",
            vec![
                ("group_id", group_id.to_string()),
                ("message", text.to_string()),
            ],
        )
        .await
    }

    async fn send_private_message(&self, user_id: i64, text: &str) -> i64 {
        self.call(
            "send_private_msg",
            vec![
                ("user_id", user_id.to_string()),
                ("message", text.to_string()),
            ],
        )
        .await
    }

    async fn send_temporary_private_message(
        &self,
        user_id: i64,
        group_id: i64,
        text: &str,
    ) -> i64 {
        // Temporary sessions go through the private endpoint with the
        // originating group attached.
        self.call(
            "send_private_msg",
            vec![
                ("user_id", user_id.to_string()),
                ("group_id", group_id.to_string()),
                ("message", text.to_string()),
            ],
        )
        .await
    }
}
