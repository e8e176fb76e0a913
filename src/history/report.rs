//! 历史统计与复核队列（只读视图，全部由账本内容计算）

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::history::HistoryRecord;
use crate::triage::{RiskBand, UrgencyTier};

/// 统计窗口（天）
const VOLUME_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryReport {
    pub total: usize,
    pub by_urgency: BTreeMap<UrgencyTier, usize>,
    /// 风险分段为 Critical 的记录数
    pub high_risk: usize,
    /// 无记录时为 0
    pub mean_risk_score: f64,
    /// 截至 today（含）的最近 7 天，旧日期在前
    pub daily_volume: Vec<DailyVolume>,
}

impl HistoryReport {
    pub fn from_records(records: &[HistoryRecord], today: NaiveDate) -> Self {
        let mut by_urgency = BTreeMap::new();
        for record in records {
            *by_urgency.entry(record.urgency_tier()).or_insert(0) += 1;
        }

        let high_risk = records
            .iter()
            .filter(|r| r.risk_band() == RiskBand::Critical)
            .count();

        let mean_risk_score = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| f64::from(r.risk_score)).sum::<f64>() / records.len() as f64
        };

        let daily_volume = (0..VOLUME_WINDOW_DAYS)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                let count = records
                    .iter()
                    .filter(|r| r.recorded_at().map(|t| t.date_naive()) == Some(date))
                    .count();
                DailyVolume { date, count }
            })
            .collect();

        Self {
            total: records.len(),
            by_urgency,
            high_risk,
            mean_risk_score,
            daily_volume,
        }
    }
}

/// 复核队列：紧急度高的在前；同级保持账本顺序（新记录在前）
pub fn review_queue(records: &[HistoryRecord]) -> Vec<&HistoryRecord> {
    let mut queue: Vec<&HistoryRecord> = records.iter().collect();
    queue.sort_by(|a, b| b.urgency_tier().cmp(&a.urgency_tier()));
    queue
}
