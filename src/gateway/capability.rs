//! 能力注册：固定的后端能力集合及其不透明 Agent ID

use serde::{Deserialize, Serialize};

use crate::config::AgentIdsSection;

/// 编排器可调用的远端能力（每个对应一个后端 Agent）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// 分诊评估（症状提取、红旗检测、风险评分、专科推荐由后端编排）
    Triage,
    /// 设施查找与路线
    FacilityRouting,
    /// 视频问诊房间分配
    VideoProvisioning,
    /// 保险核验
    InsuranceVerification,
    /// 助手对话
    Assistant,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Triage,
        Capability::FacilityRouting,
        Capability::VideoProvisioning,
        Capability::InsuranceVerification,
        Capability::Assistant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Triage => "triage",
            Capability::FacilityRouting => "facility_routing",
            Capability::VideoProvisioning => "video_provisioning",
            Capability::InsuranceVerification => "insurance_verification",
            Capability::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 能力 -> Agent ID 映射；网关只接受这里登记过的 ID
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    ids: [(Capability, String); 5],
}

impl CapabilityRegistry {
    pub fn from_config(agents: &AgentIdsSection) -> Self {
        Self {
            ids: [
                (Capability::Triage, agents.triage.clone()),
                (Capability::FacilityRouting, agents.facility_routing.clone()),
                (Capability::VideoProvisioning, agents.video_provisioning.clone()),
                (
                    Capability::InsuranceVerification,
                    agents.insurance_verification.clone(),
                ),
                (Capability::Assistant, agents.assistant.clone()),
            ],
        }
    }

    pub fn id(&self, capability: Capability) -> &str {
        self.ids
            .iter()
            .find(|(c, _)| *c == capability)
            .map(|(_, id)| id.as_str())
            .unwrap_or_default()
    }

    /// 反查：ID 不在登记集合内时返回 None
    pub fn resolve(&self, agent_id: &str) -> Option<Capability> {
        self.ids
            .iter()
            .find(|(_, id)| id == agent_id)
            .map(|(c, _)| *c)
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::from_config(&AgentIdsSection::default())
    }
}
