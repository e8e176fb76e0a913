//! 评估历史账本
//!
//! 每次接受分诊结果时追加一条摘要记录；整个序列以 JSON 存在固定键下，新记录在前。
//! append 为「读-改-写」而非原子追加，假定单写者（一个工作流实例）。

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::history::KvStore;
use crate::triage::result::deserialize_score;
use crate::triage::{IntakeForm, RiskBand, TriageResult, UrgencyTier};

/// 历史记录：问诊表单 + 分诊结果派生字段；创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub intake: IntakeForm,
    pub id: String,
    /// ISO-8601（UTC，毫秒精度）
    pub timestamp: String,
    pub urgency_level: String,
    /// 兼容其他客户端写入的小数或 null
    #[serde(default, deserialize_with = "deserialize_score")]
    pub risk_score: u8,
    pub summary: String,
}

impl HistoryRecord {
    /// 由表单与分诊结果派生；缺失字段使用固定兜底值
    pub fn derive(intake: &IntakeForm, triage: &TriageResult, now: DateTime<Utc>) -> Self {
        let id = if triage.assessment_id.trim().is_empty() {
            format!("A-{}", now.timestamp_millis())
        } else {
            triage.assessment_id.clone()
        };
        let urgency_level = if triage.urgency_level().trim().is_empty() {
            "UNKNOWN".to_string()
        } else {
            triage.urgency_level().to_string()
        };
        let summary = if triage.comprehensive_summary.trim().is_empty() {
            "Assessment completed".to_string()
        } else {
            triage.comprehensive_summary.clone()
        };

        Self {
            intake: intake.clone(),
            id,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            urgency_level,
            risk_score: triage.risk_score(),
            summary,
        }
    }

    pub fn urgency_tier(&self) -> UrgencyTier {
        UrgencyTier::parse(&self.urgency_level)
    }

    pub fn risk_band(&self) -> RiskBand {
        RiskBand::from_score(self.risk_score)
    }

    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// 历史账本：持有存储与集合键
pub struct HistoryLedger {
    store: Arc<dyn KvStore>,
    key: String,
}

impl HistoryLedger {
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// 读取当前序列、把新记录放到最前、整体写回
    ///
    /// 存储读失败时直接返回错误，不写入（避免用单条记录覆盖既有历史）；
    /// 内容无法解析时按空序列处理。
    pub async fn append(&self, record: HistoryRecord) -> anyhow::Result<()> {
        let current = self
            .store
            .get(&self.key)
            .await
            .context("history read before append failed")?;
        let mut records = current.map(|data| self.parse(&data)).unwrap_or_default();
        records.insert(0, record);
        let data = serde_json::to_string(&records)?;
        self.store.set(&self.key, &data).await
    }

    /// 新记录在前；无存储或内容不可读时视为空序列
    pub async fn read_all(&self) -> Vec<HistoryRecord> {
        match self.store.get(&self.key).await {
            Ok(Some(data)) => self.parse(&data),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("History store read failed ({}), treating as empty", e);
                Vec::new()
            }
        }
    }

    fn parse(&self, data: &str) -> Vec<HistoryRecord> {
        serde_json::from_str(data).unwrap_or_else(|e| {
            tracing::warn!("History under '{}' is unreadable ({}), treating as empty", self.key, e);
            Vec::new()
        })
    }
}
