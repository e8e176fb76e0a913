//! 传输层抽象
//!
//! 所有后端（HTTP / Mock）实现 AgentTransport：把一条自然语言指令发给指定 Agent，返回成功载荷或错误描述。

use async_trait::async_trait;
use serde_json::Value;

/// 传输层 trait：一次原始调用，不做校验、超时或重试（由 AgentGateway 负责）
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn call(&self, message: &str, agent_id: &str) -> Result<Value, String>;
}
