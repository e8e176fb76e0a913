//! 分诊结果：后端 triage 能力返回的结构化评估
//!
//! 只有 patient_summary 是必需的（用于区分「可识别的载荷」与任意对象），其余字段缺失时取默认值。

use serde::{Deserialize, Deserializer, Serialize};

use crate::triage::{RiskBand, UrgencyTier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    #[serde(default)]
    pub assessment_id: String,
    pub patient_summary: PatientSummary,
    #[serde(default)]
    pub professional_review_required: bool,
    #[serde(default)]
    pub review_priority: String,
    #[serde(default)]
    pub comprehensive_summary: String,
    #[serde(default)]
    pub mandatory_disclaimer: String,
}

impl TriageResult {
    /// 主推荐专科；为空时返回 None（调用方回退到 "general"）
    pub fn primary_specialty(&self) -> Option<&str> {
        let specialty = self
            .patient_summary
            .specialist_recommendations
            .primary_specialist
            .specialty
            .trim();
        (!specialty.is_empty()).then_some(specialty)
    }

    pub fn urgency_level(&self) -> &str {
        &self.patient_summary.risk_assessment.urgency_level
    }

    pub fn urgency_tier(&self) -> UrgencyTier {
        UrgencyTier::parse(self.urgency_level())
    }

    pub fn risk_score(&self) -> u8 {
        self.patient_summary.risk_assessment.risk_score
    }

    pub fn risk_band(&self) -> RiskBand {
        RiskBand::from_score(self.risk_score())
    }

    pub fn red_flag_detected(&self) -> bool {
        self.patient_summary.red_flags.red_flag_detected
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientSummary {
    pub structured_symptoms: StructuredSymptoms,
    pub red_flags: RedFlags,
    pub risk_assessment: RiskAssessment,
    pub specialist_recommendations: SpecialistRecommendations,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredSymptoms {
    pub extracted_symptoms: Vec<Symptom>,
    pub structured_summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Symptom {
    pub symptom_name: String,
    pub body_location: String,
    pub severity: String,
    pub duration: String,
    pub frequency: String,
    pub additional_details: String,
}

/// 红旗检测块
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedFlags {
    pub red_flag_detected: bool,
    pub severity: String,
    pub red_flag_patterns: Vec<RedFlagPattern>,
    pub immediate_action_required: bool,
    pub recommended_action: String,
    pub escalation_triggered: bool,
    pub safety_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedFlagPattern {
    pub pattern_name: String,
    pub matched_symptoms: Vec<String>,
    pub severity: String,
    pub reason: String,
}

/// 风险评估块
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskAssessment {
    #[serde(deserialize_with = "deserialize_score")]
    pub risk_score: u8,
    pub urgency_level: String,
    pub risk_factors: Vec<RiskFactor>,
    pub composite_assessment: String,
    pub recommended_timeframe: String,
    pub confidence_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskFactor {
    pub factor_name: String,
    pub weight: f64,
    pub contribution: String,
    pub reasoning: String,
}

/// 专科推荐块
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialistRecommendations {
    pub primary_specialist: Specialist,
    pub secondary_specialists: Vec<Specialist>,
    pub affected_systems: Vec<String>,
    pub routing_summary: String,
    pub alternative_care_options: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Specialist {
    pub specialty: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

/// 风险分可能是小数或越界值：四舍五入并截断到 0-100；null 视为 0
pub(crate) fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if raw.is_nan() {
        return Ok(0);
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_payload_fills_defaults() {
        let result: TriageResult = serde_json::from_value(json!({
            "patient_summary": {
                "risk_assessment": { "risk_score": 92, "urgency_level": "CRITICAL" }
            }
        }))
        .unwrap();
        assert_eq!(result.risk_score(), 92);
        assert_eq!(result.urgency_tier(), UrgencyTier::Emergent);
        assert_eq!(result.risk_band(), RiskBand::Critical);
        assert!(result.assessment_id.is_empty());
        assert_eq!(result.primary_specialty(), None);
    }

    #[test]
    fn test_missing_patient_summary_is_rejected() {
        let parsed = serde_json::from_value::<TriageResult>(json!({ "assessment_id": "A-1" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_score_is_rounded_and_clamped() {
        let risk: RiskAssessment =
            serde_json::from_value(json!({ "risk_score": 71.6 })).unwrap();
        assert_eq!(risk.risk_score, 72);
        let risk: RiskAssessment =
            serde_json::from_value(json!({ "risk_score": 250 })).unwrap();
        assert_eq!(risk.risk_score, 100);
        let risk: RiskAssessment =
            serde_json::from_value(json!({ "risk_score": -3 })).unwrap();
        assert_eq!(risk.risk_score, 0);
        let risk: RiskAssessment = serde_json::from_value(json!({ "risk_score": null })).unwrap();
        assert_eq!(risk.risk_score, 0);
    }

    #[test]
    fn test_primary_specialty_trims_blank() {
        let result: TriageResult = serde_json::from_value(json!({
            "patient_summary": {
                "specialist_recommendations": { "primary_specialist": { "specialty": " Neurology " } }
            }
        }))
        .unwrap();
        assert_eq!(result.primary_specialty(), Some("Neurology"));
    }
}
