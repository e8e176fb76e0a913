//! Agent 调用网关
//!
//! 持有传输层、能力注册表与可选超时；invoke(instruction, capability) 校验输入后在超时内调用传输层，
//! 任何失败都折叠为 Envelope::Failed，不向上抛出；每次调用输出结构化审计日志（JSON）。
//! 本层不做重试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::gateway::{AgentTransport, Capability, CapabilityRegistry, Envelope};

/// 统一调用原语：所有阶段与助手会话都经由它访问后端
pub struct AgentGateway {
    transport: Arc<dyn AgentTransport>,
    registry: CapabilityRegistry,
    timeout: Option<Duration>,
}

impl AgentGateway {
    /// timeout_secs 为 0 表示不限时
    pub fn new(
        transport: Arc<dyn AgentTransport>,
        registry: CapabilityRegistry,
        timeout_secs: u64,
    ) -> Self {
        Self {
            transport,
            registry,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub async fn invoke(&self, instruction: &str, capability: Capability) -> Envelope {
        let agent_id = self.registry.id(capability).to_string();
        self.dispatch(instruction, capability, &agent_id).await
    }

    /// 以原始 Agent ID 调用；ID 不在注册表中时直接返回 Failed，不触达传输层
    pub async fn invoke_by_id(&self, instruction: &str, agent_id: &str) -> Envelope {
        match self.registry.resolve(agent_id) {
            Some(capability) => self.dispatch(instruction, capability, agent_id).await,
            None => {
                audit(agent_id, "rejected", 0, instruction);
                Envelope::Failed(format!("unknown capability id: {}", agent_id))
            }
        }
    }

    async fn dispatch(&self, instruction: &str, capability: Capability, agent_id: &str) -> Envelope {
        if instruction.trim().is_empty() {
            audit(capability.as_str(), "rejected", 0, instruction);
            return Envelope::Failed("instruction must not be empty".to_string());
        }

        let start = Instant::now();
        let call = self.transport.call(instruction, agent_id);
        let result = match self.timeout {
            Some(limit) => timeout(limit, call).await.map_err(|_| limit),
            None => Ok(call.await),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(payload)) => {
                audit(capability.as_str(), "ok", duration_ms, instruction);
                Envelope::Ok(payload)
            }
            Ok(Err(message)) => {
                audit(capability.as_str(), "failed", duration_ms, instruction);
                Envelope::Failed(message)
            }
            Err(limit) => {
                audit(capability.as_str(), "timeout", duration_ms, instruction);
                Envelope::Failed(format!(
                    "{} call timed out after {}s",
                    capability,
                    limit.as_secs()
                ))
            }
        }
    }
}

fn audit(capability: &str, outcome: &str, duration_ms: u64, instruction: &str) {
    let audit = serde_json::json!({
        "event": "agent_call",
        "capability": capability,
        "ok": outcome == "ok",
        "outcome": outcome,
        "duration_ms": duration_ms,
        "instruction_preview": instruction_preview(instruction),
    });
    tracing::info!(audit = %audit.to_string(), "agent_call");
}

fn instruction_preview(instruction: &str) -> String {
    if instruction.chars().count() > 200 {
        format!("{}...", instruction.chars().take(200).collect::<String>())
    } else {
        instruction.to_string()
    }
}
