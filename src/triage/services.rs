//! 后续阶段的结果：设施路由、视频问诊房间、保险核验
//!
//! 每种结果都有一个必需字段用于形状校验，其余字段缺失时取默认值。

use serde::{Deserialize, Serialize};

/// 设施路由结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationResult {
    #[serde(default)]
    pub patient_location: PatientLocation,
    pub recommended_facilities: Vec<Facility>,
    #[serde(default)]
    pub primary_route: Route,
}

impl LocationResult {
    /// 推荐列表的第一项即首选设施
    pub fn nearest(&self) -> Option<&Facility> {
        self.recommended_facilities.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facility {
    pub facility_name: String,
    pub facility_type: String,
    pub address: String,
    pub phone: String,
    pub distance_miles: f64,
    pub eta_minutes: f64,
    pub coordinates: Coordinates,
    pub services: Vec<String>,
    pub accepts_insurance: bool,
    pub current_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    pub total_distance: String,
    pub total_duration: String,
    pub traffic_conditions: String,
    pub turn_by_turn: Vec<String>,
}

/// 视频问诊房间凭据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRoomResult {
    pub room_id: String,
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub patient_token: String,
    #[serde(default)]
    pub room_url: String,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default)]
    pub session_duration_limit: String,
}

/// 保险核验结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceResult {
    #[serde(default)]
    pub verification_id: String,
    pub coverage_status: String,
    #[serde(default)]
    pub insurance_details: InsuranceDetails,
    #[serde(default)]
    pub telehealth_coverage: TelehealthCoverage,
    #[serde(default)]
    pub financial_summary: FinancialSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceDetails {
    pub payer_name: String,
    pub member_id: String,
    pub plan_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelehealthCoverage {
    pub covered: bool,
    pub copay_amount: f64,
    pub requires_authorization: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialSummary {
    pub estimated_patient_cost: f64,
}
