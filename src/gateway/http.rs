//! HTTP 传输层
//!
//! POST `{"message", "agent_id"}` 到配置的端点，响应形如 `{"success": bool, "response": {...}, "error": "..."}`；
//! 非 2xx、非 JSON、success=false 都转为 Err(诊断信息)。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::AgentTransport;

#[derive(Serialize)]
struct AgentCallRequest<'a> {
    message: &'a str,
    agent_id: &'a str,
}

#[derive(Deserialize)]
struct AgentCallReply {
    success: bool,
    #[serde(default)]
    response: Value,
    #[serde(default)]
    error: Option<String>,
}

/// 基于 reqwest 的传输层：持有 Client、端点与可选 API Key
pub struct HttpAgentTransport {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAgentTransport {
    /// timeout_secs 为 0 时不在客户端层设置超时
    pub fn new(endpoint: &str, api_key: Option<&str>, timeout_secs: u64) -> anyhow::Result<Self> {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("CAREPATH_API_KEY").ok());

        let mut builder = Client::builder().user_agent(concat!("carepath/", env!("CARGO_PKG_VERSION")));
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn call(&self, message: &str, agent_id: &str) -> Result<Value, String> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&AgentCallRequest { message, agent_id });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status, preview(&body)));
        }

        let reply: AgentCallReply = serde_json::from_str(&body)
            .map_err(|e| format!("invalid agent reply ({}): {}", e, preview(&body)))?;

        if reply.success {
            Ok(reply.response)
        } else {
            Err(reply
                .error
                .unwrap_or_else(|| "agent reported failure".to_string()))
        }
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > 200 {
        format!("{}...", body.chars().take(200).collect::<String>())
    } else {
        body.to_string()
    }
}
