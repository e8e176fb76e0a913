//! 调用信封：成功时携带不透明载荷，失败时携带诊断信息

use serde_json::Value;

use crate::core::WorkflowError;
use crate::gateway::Capability;

/// 网关调用结果；网关边界之外不会抛出任何错误，传输/解析失败都折叠进 Failed
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Ok(Value),
    Failed(String),
}

impl Envelope {
    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Ok(_))
    }

    /// 取出成功载荷；Failed 转为 WorkflowError::Transport
    pub fn into_payload(self, capability: Capability) -> Result<Value, WorkflowError> {
        match self {
            Envelope::Ok(payload) => Ok(payload),
            Envelope::Failed(message) => Err(WorkflowError::Transport {
                capability,
                message,
            }),
        }
    }
}
