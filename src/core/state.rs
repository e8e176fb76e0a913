//! 状态定义：工作流阶段、覆盖层、忙碌标志与对外快照
//!
//! 渲染层只看 WorkflowSnapshot；完整状态由 WorkflowMachine 持有，每次变更后投影并广播。

use serde::{Deserialize, Serialize};

use crate::triage::{InsuranceResult, LocationResult, TriageResult, VideoRoomResult};

/// 主阶段（同一时刻只有一个是当前阶段）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    #[default]
    Intake,
    Assessed,
    Routed,
    Consultation,
}

/// 覆盖层：叠加在当前阶段之上，不替换它
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Overlays {
    pub history_view: bool,
    pub assistant_open: bool,
}

/// 每个阶段转换各自的在途标志；不同阶段可以同时在途
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusyFlags {
    pub assessment: bool,
    pub facilities: bool,
    pub consultation: bool,
}

/// 阶段转换的结果：完成，或因同一转换在途而被忽略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Busy,
}

/// 渲染层看到的投影状态
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowSnapshot {
    pub stage: WorkflowStage,
    pub overlays: Overlays,
    pub busy: BusyFlags,
    pub triage: Option<TriageResult>,
    pub location: Option<LocationResult>,
    pub video_room: Option<VideoRoomResult>,
    pub insurance: Option<InsuranceResult>,
    /// 最近一次失败的描述；下一次成功的转换会清除
    pub last_error: Option<String>,
}
