//! Mock 传输层（用于测试与无端点的本地演示）
//!
//! 按 Agent ID 预置回复（成功载荷 / 失败信息 / 可选延迟），并记录每次调用，便于断言调用次数与指令文本。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::gateway::{AgentTransport, Capability, CapabilityRegistry};

/// 单个 Agent 的预置回复
#[derive(Debug, Clone)]
pub struct MockReply {
    outcome: Result<Value, String>,
    delay: Option<Duration>,
}

impl MockReply {
    pub fn ok(payload: Value) -> Self {
        Self {
            outcome: Ok(payload),
            delay: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// 一次被记录的调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub agent_id: String,
    pub message: String,
}

/// Mock 传输层：未预置回复的 Agent 返回错误
#[derive(Debug, Default, Clone)]
pub struct MockAgentTransport {
    replies: Arc<Mutex<HashMap<String, MockReply>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockAgentTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为指定 Agent 设置（或替换）回复
    pub fn on(&self, agent_id: &str, reply: MockReply) -> &Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.insert(agent_id.to_string(), reply);
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, agent_id: &str) -> usize {
        self.calls().iter().filter(|c| c.agent_id == agent_id).count()
    }

    /// 演示用：为全部能力预置一组合理的回复（分诊结果以 ```json 包裹形式返回）
    pub fn demo(registry: &CapabilityRegistry) -> Self {
        let mock = Self::new();
        let triage_doc = json!({ "result": demo_triage_payload() });
        let raw_text = format!(
            "Assessment complete.\n```json\n{}\n```",
            serde_json::to_string_pretty(&triage_doc).unwrap_or_default()
        );
        mock.on(
            registry.id(Capability::Triage),
            MockReply::ok(json!({ "status": "success", "result": { "raw_text": raw_text } })),
        );
        mock.on(
            registry.id(Capability::FacilityRouting),
            MockReply::ok(json!({ "status": "success", "result": demo_location_payload() })),
        );
        mock.on(
            registry.id(Capability::VideoProvisioning),
            MockReply::ok(json!({ "status": "success", "result": {
                "room_id": "room-demo-001",
                "room_name": "Cardiology consult",
                "patient_token": "demo-token",
                "room_url": "https://video.example.org/room-demo-001",
                "expires_at": "2099-01-01T00:00:00Z",
                "session_duration_limit": "30 minutes"
            }})),
        );
        mock.on(
            registry.id(Capability::InsuranceVerification),
            MockReply::ok(json!({ "status": "success", "result": {
                "verification_id": "V-demo",
                "coverage_status": "ACTIVE",
                "insurance_details": { "payer_name": "Demo Health", "member_id": "M-1", "plan_name": "PPO" },
                "telehealth_coverage": { "covered": true, "copay_amount": 25.0, "requires_authorization": false },
                "financial_summary": { "estimated_patient_cost": 25.0 }
            }})),
        );
        mock.on(
            registry.id(Capability::Assistant),
            MockReply::ok(json!({ "status": "success", "result": {
                "message": "Start a symptom assessment from the home screen."
            }})),
        );
        mock
    }
}

#[async_trait]
impl AgentTransport for MockAgentTransport {
    async fn call(&self, message: &str, agent_id: &str) -> Result<Value, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                agent_id: agent_id.to_string(),
                message: message.to_string(),
            });
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|r| r.get(agent_id).cloned());

        match reply {
            Some(reply) => {
                if let Some(delay) = reply.delay {
                    tokio::time::sleep(delay).await;
                }
                reply.outcome
            }
            None => Err(format!("no mock reply for agent {}", agent_id)),
        }
    }
}

fn demo_triage_payload() -> Value {
    json!({
        "assessment_id": "A-DEMO-001",
        "patient_summary": {
            "structured_symptoms": {
                "extracted_symptoms": [{
                    "symptom_name": "chest pain",
                    "body_location": "chest",
                    "severity": "severe",
                    "duration": "2 hours",
                    "frequency": "constant",
                    "additional_details": "radiating to left arm"
                }],
                "structured_summary": "Acute chest pain with dyspnoea"
            },
            "red_flags": {
                "red_flag_detected": true,
                "severity": "CRITICAL",
                "red_flag_patterns": [{
                    "pattern_name": "Acute coronary syndrome",
                    "matched_symptoms": ["chest pain", "shortness of breath"],
                    "severity": "CRITICAL",
                    "reason": "Chest pain with dyspnoea"
                }],
                "immediate_action_required": true,
                "recommended_action": "Call emergency services",
                "escalation_triggered": true,
                "safety_message": "Seek emergency care now."
            },
            "risk_assessment": {
                "risk_score": 92,
                "urgency_level": "CRITICAL",
                "risk_factors": [{
                    "factor_name": "Chest pain",
                    "weight": 0.6,
                    "contribution": "high",
                    "reasoning": "Cardiac origin must be excluded"
                }],
                "composite_assessment": "High probability of cardiac event",
                "recommended_timeframe": "Immediately",
                "confidence_level": "HIGH"
            },
            "specialist_recommendations": {
                "primary_specialist": {
                    "specialty": "Cardiology",
                    "reason": "Suspected cardiac event",
                    "confidence": "HIGH"
                },
                "secondary_specialists": [],
                "affected_systems": ["cardiovascular"],
                "routing_summary": "Emergency cardiology",
                "alternative_care_options": ["Emergency department"]
            }
        },
        "professional_review_required": true,
        "review_priority": "URGENT",
        "comprehensive_summary": "Possible acute coronary syndrome",
        "mandatory_disclaimer": "This is not a diagnosis."
    })
}

fn demo_location_payload() -> Value {
    json!({
        "patient_location": { "latitude": 37.7749, "longitude": -122.4194, "address": "San Francisco, CA" },
        "recommended_facilities": [{
            "facility_name": "General Hospital ER",
            "facility_type": "Emergency Room",
            "address": "1001 Potrero Ave",
            "phone": "555-0100",
            "distance_miles": 1.8,
            "eta_minutes": 7,
            "coordinates": { "lat": 37.7557, "lng": -122.4044 },
            "services": ["Cardiology", "Trauma"],
            "accepts_insurance": true,
            "current_status": "OPEN"
        }],
        "primary_route": {
            "total_distance": "1.8 mi",
            "total_duration": "7 min",
            "traffic_conditions": "light",
            "turn_by_turn": ["Head south on Market St", "Turn left on Potrero Ave"]
        }
    })
}
