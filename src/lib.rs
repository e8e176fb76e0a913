//! CarePath - 患者端分诊工作流编排器
//!
//! 模块划分：
//! - **assistant**: 助手会话（对话记录 + 经网关转发用户消息）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 工作流状态机、错误类型、指令模板、命令驱动循环、客户端构建
//! - **gateway**: Agent 调用网关（能力注册、信封、HTTP / Mock 传输层）
//! - **history**: 评估历史账本、键值存储后端、历史统计报表
//! - **normalize**: 响应信封归一化（直接结构 / ```json 包裹结构）
//! - **observability**: 日志初始化
//! - **triage**: 领域类型（问诊表单、分诊结果、设施/视频/保险结果、紧急度分级）

pub mod assistant;
pub mod config;
pub mod core;
pub mod gateway;
pub mod history;
pub mod normalize;
pub mod observability;
pub mod triage;

pub use crate::core::{CareClient, ClientBuilder, WorkflowMachine, WorkflowStage};
