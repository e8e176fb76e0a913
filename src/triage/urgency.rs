//! 紧急度分级与风险分段
//!
//! 后端返回的 urgency_level 是自由文本（EMERGENCY / CRITICAL / HIGH / SOON ...），这里收敛为有序的等级。

use serde::{Deserialize, Serialize};

/// 紧急度等级（按急迫程度升序，可直接比较）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Unknown,
    Low,
    Moderate,
    High,
    Emergent,
}

impl UrgencyTier {
    /// 大小写不敏感；无法识别的一律 Unknown
    pub fn parse(level: &str) -> Self {
        match level.trim().to_uppercase().as_str() {
            "EMERGENCY" | "CRITICAL" => UrgencyTier::Emergent,
            "HIGH" => UrgencyTier::High,
            "MODERATE" | "SOON" => UrgencyTier::Moderate,
            "LOW" | "ROUTINE" => UrgencyTier::Low,
            _ => UrgencyTier::Unknown,
        }
    }
}

/// 风险分（0-100）分段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Guarded,
    Elevated,
    Critical,
}

impl RiskBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => RiskBand::Critical,
            60..=79 => RiskBand::Elevated,
            40..=59 => RiskBand::Guarded,
            _ => RiskBand::Low,
        }
    }
}
