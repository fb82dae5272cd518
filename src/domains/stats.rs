// 仪表盘统计 - 概要指标、实施日历、最近记录

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::CleaningRecord;

/// 概要指标
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub total_cleanings: usize,
    pub this_week: usize,
    pub this_month: usize,
    pub overdue_count: usize,
}

/// 计算概要指标（最近 7 天 / 30 天，以 `now` 为基准）
pub fn cleaning_stats(
    records: &[CleaningRecord],
    overdue_count: usize,
    now: NaiveDateTime,
) -> CleaningStats {
    let week_ago = now - chrono::Duration::days(7);
    let month_ago = now - chrono::Duration::days(30);

    CleaningStats {
        total_cleanings: records.len(),
        this_week: records.iter().filter(|r| r.timestamp >= week_ago).count(),
        this_month: records.iter().filter(|r| r.timestamp >= month_ago).count(),
        overdue_count,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// 实施日历（GitHub 风格的贡献图数据）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionCalendar {
    pub days: Vec<DailyCount>,
    pub total_days: usize,
    pub active_days: usize,
    pub max_per_day: usize,
}

/// 生成 [start, end] 区间内每天的掃除次数，没有记录的日期补 0
pub fn contribution_calendar(
    records: &[CleaningRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> ContributionCalendar {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in records {
        let date = record.timestamp.date();
        if date >= start && date <= end {
            *counts.entry(date).or_default() += 1;
        }
    }

    let mut days = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        days.push(DailyCount {
            date: cursor,
            count: counts.get(&cursor).copied().unwrap_or(0),
        });
        match cursor.checked_add_days(Days::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    ContributionCalendar {
        total_days: days.len(),
        active_days: days.iter().filter(|d| d.count > 0).count(),
        max_per_day: days.iter().map(|d| d.count).max().unwrap_or(0),
        days,
    }
}

/// 最近的记录（新→旧）
pub fn recent_records(records: &[CleaningRecord], limit: usize) -> Vec<CleaningRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted.truncate(limit);
    sorted
}
