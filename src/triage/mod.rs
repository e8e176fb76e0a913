//! 领域类型：问诊表单、分诊结果、设施/视频/保险结果、紧急度与风险分级

pub mod intake;
pub mod result;
pub mod services;
pub mod urgency;

pub use intake::{Gender, IntakeForm};
pub use result::{
    PatientSummary, RedFlagPattern, RedFlags, RiskAssessment, RiskFactor, Specialist,
    SpecialistRecommendations, StructuredSymptoms, Symptom, TriageResult,
};
pub use services::{
    Coordinates, Facility, FinancialSummary, InsuranceDetails, InsuranceResult, LocationResult,
    PatientLocation, Route, TelehealthCoverage, VideoRoomResult,
};
pub use urgency::{RiskBand, UrgencyTier};
