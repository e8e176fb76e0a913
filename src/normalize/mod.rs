//! 响应归一化
//!
//! 成功载荷有两种形状：
//! 1. 直接结构：载荷（或其 `result` 字段）就是该能力期望的对象；
//! 2. 包裹结构：载荷含 `raw_text` 文本，其中嵌有 ```json 代码块，块内文档的 `result` 字段才是真正的载荷。
//!
//! unwrap_payload 负责剥壳，normalize / normalize_as 再做形状校验；要么整体成功，要么整体失败。

mod fence;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::assistant::AssistantReply;
use crate::gateway::Capability;
use crate::triage::{InsuranceResult, LocationResult, TriageResult, VideoRoomResult};

pub use fence::extract_fenced_json;

pub const UNRECOGNIZED_SHAPE: &str = "unrecognized envelope shape";
pub const MALFORMED_EMBEDDED: &str = "malformed embedded payload";

/// 归一化失败（形状无法识别 / 内嵌文档损坏）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("normalization failed: {reason}")]
pub struct NormalizationError {
    pub reason: String,
}

impl NormalizationError {
    pub fn unrecognized() -> Self {
        Self {
            reason: UNRECOGNIZED_SHAPE.to_string(),
        }
    }

    pub fn malformed() -> Self {
        Self {
            reason: MALFORMED_EMBEDDED.to_string(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.reason == MALFORMED_EMBEDDED
    }
}

/// 按能力类型归一化后的结果
#[derive(Debug, Clone, PartialEq)]
pub enum TypedResult {
    Triage(Box<TriageResult>),
    Location(LocationResult),
    VideoRoom(VideoRoomResult),
    Insurance(InsuranceResult),
    Assistant(AssistantReply),
}

/// 剥去信封外壳，得到待校验的规范载荷
pub fn unwrap_payload(payload: &Value) -> Result<Value, NormalizationError> {
    let candidate = match payload.get("result") {
        Some(inner) if inner.is_object() => inner,
        _ => payload,
    };

    if let Some(raw_text) = candidate.get("raw_text").and_then(Value::as_str) {
        if let Some(block) = extract_fenced_json(raw_text) {
            let document: Value =
                serde_json::from_str(block).map_err(|_| NormalizationError::malformed())?;
            return document
                .get("result")
                .cloned()
                .ok_or_else(NormalizationError::malformed);
        }
        tracing::debug!("raw_text present without a ```json block");
    }

    Ok(candidate.clone())
}

/// 剥壳并按目标类型做形状校验
pub fn normalize_as<T: DeserializeOwned>(payload: &Value) -> Result<T, NormalizationError> {
    let canonical = unwrap_payload(payload)?;
    if !canonical.is_object() {
        return Err(NormalizationError::unrecognized());
    }
    serde_json::from_value(canonical).map_err(|e| {
        tracing::debug!("payload shape mismatch: {}", e);
        NormalizationError::unrecognized()
    })
}

/// 按能力分派到对应的类型
pub fn normalize(payload: &Value, capability: Capability) -> Result<TypedResult, NormalizationError> {
    Ok(match capability {
        Capability::Triage => TypedResult::Triage(Box::new(normalize_as(payload)?)),
        Capability::FacilityRouting => TypedResult::Location(normalize_as(payload)?),
        Capability::VideoProvisioning => TypedResult::VideoRoom(normalize_as(payload)?),
        Capability::InsuranceVerification => TypedResult::Insurance(normalize_as(payload)?),
        Capability::Assistant => TypedResult::Assistant(normalize_as(payload)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn triage_value() -> Value {
        json!({
            "assessment_id": "A-42",
            "patient_summary": {
                "risk_assessment": { "risk_score": 35, "urgency_level": "LOW" }
            }
        })
    }

    #[test]
    fn test_wrapped_block_yields_exactly_inner_result() {
        let inner = json!({ "anything": [1, 2, 3], "nested": { "k": "v" } });
        let raw = format!("```json\n{}\n```", json!({ "result": inner }));
        let payload = json!({ "raw_text": raw });
        assert_eq!(unwrap_payload(&payload).unwrap(), inner);

        // 同样的包裹形式出现在 result 字段内
        let payload = json!({ "status": "success", "result": { "raw_text": raw } });
        assert_eq!(unwrap_payload(&payload).unwrap(), inner);
    }

    #[test]
    fn test_direct_shape_passes_through() {
        let payload = json!({ "status": "success", "result": triage_value() });
        match normalize(&payload, Capability::Triage).unwrap() {
            TypedResult::Triage(result) => {
                assert_eq!(result.assessment_id, "A-42");
                assert_eq!(result.risk_score(), 35);
            }
            other => panic!("Expected Triage, got {:?}", other),
        }

        // 载荷本身即对象（无 result 外壳）
        let result: TriageResult = normalize_as(&triage_value()).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap()["assessment_id"], "A-42");
    }

    #[test]
    fn test_wrapped_triage_is_typed() {
        let raw = format!(
            "Here you go:\n```json\n{}\n```\nStay safe.",
            json!({ "result": triage_value() })
        );
        let result: TriageResult = normalize_as(&json!({ "result": { "raw_text": raw } })).unwrap();
        assert_eq!(result.assessment_id, "A-42");
    }

    #[test]
    fn test_neither_shape_is_unrecognized() {
        let err = normalize(&json!({ "foo": "bar" }), Capability::Triage).unwrap_err();
        assert_eq!(err.reason, UNRECOGNIZED_SHAPE);

        let err = normalize(&json!("plain string"), Capability::FacilityRouting).unwrap_err();
        assert_eq!(err.reason, UNRECOGNIZED_SHAPE);

        // raw_text 中没有 ```json 块，也不是可识别结构
        let err = normalize(&json!({ "raw_text": "sorry, no data" }), Capability::Triage).unwrap_err();
        assert_eq!(err.reason, UNRECOGNIZED_SHAPE);
    }

    #[test]
    fn test_broken_embedded_json_is_malformed() {
        let payload = json!({ "raw_text": "```json\n{\"result\": {oops}\n```" });
        let err = normalize(&payload, Capability::Triage).unwrap_err();
        assert_eq!(err.reason, MALFORMED_EMBEDDED);
        assert!(err.is_malformed());
    }

    #[test]
    fn test_embedded_document_without_result_is_malformed() {
        let payload = json!({ "raw_text": "```json\n{\"data\": 1}\n```" });
        let err = unwrap_payload(&payload).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_each_capability_dispatches_to_its_type() {
        let video = json!({ "result": { "room_id": "r1" } });
        assert!(matches!(
            normalize(&video, Capability::VideoProvisioning),
            Ok(TypedResult::VideoRoom(room)) if room.room_id == "r1"
        ));

        let insurance = json!({ "result": { "coverage_status": "ACTIVE" } });
        assert!(matches!(
            normalize(&insurance, Capability::InsuranceVerification),
            Ok(TypedResult::Insurance(_))
        ));

        let location = json!({ "result": { "recommended_facilities": [] } });
        assert!(matches!(
            normalize(&location, Capability::FacilityRouting),
            Ok(TypedResult::Location(_))
        ));

        // 视频载荷不能冒充保险结果
        assert!(normalize(&video, Capability::InsuranceVerification).is_err());

        let chat = json!({ "result": { "message": "hello" } });
        assert!(matches!(
            normalize(&chat, Capability::Assistant),
            Ok(TypedResult::Assistant(reply)) if reply.message.as_deref() == Some("hello")
        ));
    }
}
