//! 发往后端的指令文本
//!
//! 后端按固定格式解析这些指令，改动措辞会破坏兼容性。

use crate::triage::IntakeForm;

/// 专科缺失时使用的占位
pub const GENERAL_SPECIALTY: &str = "general";

pub fn assessment_instruction(form: &IntakeForm) -> String {
    let gender = form.gender.map(|g| g.as_str()).unwrap_or_default();
    format!(
        "Patient age {}, gender {}.\nExisting conditions: {}.\nSymptoms: {}.\nDuration: {}.\nSeverity: {}/10.",
        form.age,
        gender,
        form.conditions_or_none(),
        form.symptoms,
        form.duration,
        form.severity
    )
}

pub fn facility_instruction(specialty: &str) -> String {
    format!(
        "Find nearest emergency room for patient with {} emergency",
        specialty
    )
}

pub fn video_room_instruction(patient_id: &str, specialty: &str) -> String {
    format!(
        "Create a video consultation room for patient ID {} with {} specialist",
        patient_id, specialty
    )
}

pub fn insurance_instruction(patient_id: &str) -> String {
    format!(
        "Verify insurance for patient {} for telemedicine consultation",
        patient_id
    )
}

/// 每次发起问诊时生成的临时患者编号：P + 0..100000
pub fn new_patient_id() -> String {
    let n = uuid::Uuid::new_v4().as_u128() % 100_000;
    format!("P{}", n)
}
