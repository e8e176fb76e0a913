//! 问诊表单：患者自述字段与提交前校验

use serde::{Deserialize, Serialize};

use crate::core::WorkflowError;

/// 性别选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::PreferNotToSay => "prefer-not-to-say",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 问诊表单（JSON 字段为 camelCase，与历史记录一致）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeForm {
    /// 年龄（数字字符串）
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub existing_conditions: String,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub duration: String,
    /// 严重程度 1-10
    #[serde(default = "default_severity")]
    pub severity: u8,
}

fn default_severity() -> u8 {
    5
}

impl Default for IntakeForm {
    fn default() -> Self {
        Self {
            age: String::new(),
            gender: None,
            existing_conditions: String::new(),
            symptoms: String::new(),
            duration: String::new(),
            severity: default_severity(),
        }
    }
}

impl IntakeForm {
    /// 提交前校验：年龄、性别、症状、持续时间必填；年龄须为数字；严重程度在 1-10
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let mut missing = Vec::new();
        if self.age.trim().is_empty() {
            missing.push("age");
        }
        if self.gender.is_none() {
            missing.push("gender");
        }
        if self.symptoms.trim().is_empty() {
            missing.push("symptoms");
        }
        if self.duration.trim().is_empty() {
            missing.push("duration");
        }
        if !missing.is_empty() {
            return Err(WorkflowError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        if self.age.trim().parse::<u16>().is_err() {
            return Err(WorkflowError::Validation(format!(
                "age must be a whole number, got {:?}",
                self.age
            )));
        }
        if !(1..=10).contains(&self.severity) {
            return Err(WorkflowError::Validation(format!(
                "severity must be between 1 and 10, got {}",
                self.severity
            )));
        }
        Ok(())
    }

    /// 既往病史为空串时按 "None" 传给后端；其余原样传递（含空白）
    pub fn conditions_or_none(&self) -> &str {
        if self.existing_conditions.is_empty() {
            "None"
        } else {
            &self.existing_conditions
        }
    }
}
