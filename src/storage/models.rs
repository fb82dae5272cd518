// 表格行与数据模型之间的转换

use chrono::NaiveDateTime;
use tracing::warn;

use crate::models::{
    CleaningRecord, CleaningTypeSetting, DateCell, Priority, DEFAULT_FREQUENCY_DAYS,
    DEFAULT_RECORDER, TIMESTAMP_FORMAT,
};

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

/// 解析设置表的一行
///
/// 名称为空、频率不是正整数的行返回 None；频率为空时使用默认值，
/// 未知的优先度按「中」处理。
pub fn parse_setting_row(row: &[String]) -> Option<CleaningTypeSetting> {
    let name = cell(row, 0);
    if name.is_empty() {
        return None;
    }

    let frequency_days = match cell(row, 1) {
        "" => DEFAULT_FREQUENCY_DAYS,
        raw => match raw.parse::<u32>() {
            Ok(days) if days > 0 => days,
            _ => {
                warn!("掃除種別 {} 的推奨頻度无效: {:?}，跳过该行", name, raw);
                return None;
            }
        },
    };

    let priority = match cell(row, 4) {
        "" => Priority::Medium,
        raw => Priority::from_label(raw).unwrap_or_else(|| {
            warn!("掃除種別 {} 的优先度未知: {:?}，按「中」处理", name, raw);
            Priority::Medium
        }),
    };

    Some(CleaningTypeSetting {
        name: name.to_string(),
        frequency_days,
        last_done: DateCell::parse(cell(row, 2)),
        next_due: DateCell::parse(cell(row, 3)),
        priority,
    })
}

/// 解析记录表的一行，时间戳无法解析时返回 None
pub fn parse_record_row(row: &[String]) -> Option<CleaningRecord> {
    let raw_timestamp = cell(row, 0);
    let timestamp = NaiveDateTime::parse_from_str(raw_timestamp, TIMESTAMP_FORMAT).ok()?;

    let recorder = match cell(row, 2) {
        "" => DEFAULT_RECORDER.to_string(),
        other => other.to_string(),
    };
    let note = match cell(row, 3) {
        "" => None,
        other => Some(other.to_string()),
    };

    Some(CleaningRecord {
        timestamp,
        cleaning_type: cell(row, 1).to_string(),
        recorder,
        note,
    })
}

/// 跳过表头后解析所有设置行
pub fn decode_settings(rows: &[Vec<String>]) -> Vec<CleaningTypeSetting> {
    rows.iter()
        .skip(1)
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .filter_map(|row| parse_setting_row(row))
        .collect()
}

/// 跳过表头后解析所有记录行
pub fn decode_records(rows: &[Vec<String>]) -> Vec<CleaningRecord> {
    rows.iter()
        .skip(1)
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .filter_map(|row| {
            let parsed = parse_record_row(row);
            if parsed.is_none() {
                warn!("掃除記録的日時无法解析，跳过该行: {:?}", row);
            }
            parsed
        })
        .collect()
}
