//! 工作流错误类型
//!
//! 所有错误都只影响本次尝试的阶段转换：状态机始终停留在最后一个有效阶段，不做自动重试。

use thiserror::Error;

use crate::core::WorkflowStage;
use crate::gateway::Capability;
use crate::normalize::NormalizationError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// 问诊表单不满足约束，调用前即被拒绝
    #[error("Validation error: {0}")]
    Validation(String),

    /// 网关无法到达后端或后端返回失败
    #[error("{capability} call failed: {message}")]
    Transport {
        capability: Capability,
        message: String,
    },

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// 当前阶段不允许该操作
    #[error("{operation} is not allowed from stage {stage:?}")]
    InvalidStage {
        operation: &'static str,
        stage: WorkflowStage,
    },

    /// 阶段正确但缺少前置数据（如返回到 Assessed 时尚无分诊结果）
    #[error("Missing precondition: {0}")]
    MissingPrecondition(String),
}

impl WorkflowError {
    /// 是否值得向用户提供「重试」入口（传输与归一化失败）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkflowError::Transport { .. } | WorkflowError::Normalization(_)
        )
    }
}
