// 数据模型模块 - 定义所有的数据结构

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 掃除記録シート名
pub const RECORDS_SHEET: &str = "掃除記録";
/// 掃除種別設定シート名
pub const SETTINGS_SHEET: &str = "掃除種別設定";

/// 掃除記録シートのヘッダー行
pub const RECORDS_HEADERS: [&str; 4] = ["日時", "掃除種別", "記録者", "備考"];
/// 掃除種別設定シートのヘッダー行
pub const SETTINGS_HEADERS: [&str; 5] = ["掃除種別", "推奨頻度（日）", "最終実施日", "次回予定日", "優先度"];

/// 默认记录者标签
pub const DEFAULT_RECORDER: &str = "Alexa音声入力";
/// 频率单元格为空时使用的默认天数
pub const DEFAULT_FREQUENCY_DAYS: u32 = 7;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 掃除の優先度
///
/// 排序使用显式的 rank 表（高=0, 中=1, 低=2），不依赖显示字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// 表格中使用的显示标签
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "高",
            Self::Medium => "中",
            Self::Low => "低",
        }
    }

    /// 解析表格标签或英文名称
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "高" => Some(Self::High),
            "中" => Some(Self::Medium),
            "低" => Some(Self::Low),
            other => match other.to_ascii_lowercase().as_str() {
                "high" => Some(Self::High),
                "medium" => Some(Self::Medium),
                "low" => Some(Self::Low),
                _ => None,
            },
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Priority::from_label(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("未知的优先度: {}", raw)))
    }
}

/// 表格中的日期单元格
///
/// 空单元格与格式错误的单元格语义不同：前者表示“从未实施”，后者会被逾期计算跳过。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DateCell {
    #[default]
    Empty,
    Date(NaiveDate),
    Malformed(String),
}

impl DateCell {
    /// 解析单元格文本
    ///
    /// 接受 `YYYY-MM-DD`、`YYYY/MM/DD` 以及旧版写入的 `YYYY-MM-DD HH:MM:SS`。
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Empty;
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            return Self::Date(date);
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y/%m/%d") {
            return Self::Date(date);
        }
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
            return Self::Date(timestamp.date());
        }

        Self::Malformed(raw.to_string())
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }

    /// 写回表格时的文本
    pub fn to_cell(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Date(date) => date.format(DATE_FORMAT).to_string(),
            Self::Malformed(raw) => raw.clone(),
        }
    }
}

impl From<NaiveDate> for DateCell {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl Serialize for DateCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            other => serializer.serialize_str(&other.to_cell()),
        }
    }
}

/// 掃除種別設定（设置表中的一行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningTypeSetting {
    pub name: String,
    pub frequency_days: u32,
    pub last_done: DateCell,
    pub next_due: DateCell,
    pub priority: Priority,
}

impl CleaningTypeSetting {
    /// 创建一个从未实施过的设置
    pub fn new(name: impl Into<String>, frequency_days: u32, priority: Priority) -> Self {
        Self {
            name: name.into(),
            frequency_days,
            last_done: DateCell::Empty,
            next_due: DateCell::Empty,
            priority,
        }
    }

    pub fn with_last_done(mut self, last_done: NaiveDate) -> Self {
        self.last_done = DateCell::Date(last_done);
        self.next_due = last_done
            .checked_add_days(chrono::Days::new(u64::from(self.frequency_days)))
            .map(DateCell::Date)
            .unwrap_or_default();
        self
    }

    /// 转换为表格行（列顺序与 SETTINGS_HEADERS 一致）
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.frequency_days.to_string(),
            self.last_done.to_cell(),
            self.next_due.to_cell(),
            self.priority.label().to_string(),
        ]
    }
}

/// 掃除記録（记录表中的一行，只追加）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningRecord {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    pub cleaning_type: String,
    pub recorder: String,
    pub note: Option<String>,
}

impl CleaningRecord {
    /// 创建语音输入的记录
    pub fn voice(cleaning_type: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            cleaning_type: cleaning_type.into(),
            recorder: DEFAULT_RECORDER.to_string(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.trim().is_empty());
        self
    }

    /// 转换为表格行（列顺序与 RECORDS_HEADERS 一致）
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.cleaning_type.clone(),
            self.recorder.clone(),
            self.note.clone().unwrap_or_default(),
        ]
    }
}

/// 逾期条目（每次查询重新计算，不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueEntry {
    pub type_name: String,
    pub priority: Priority,
    pub days_overdue: u32,
    pub frequency_days: u32,
    /// 从未实施时为 None
    pub last_done: Option<NaiveDate>,
    /// 从未实施的种别以参考日期作为期限
    pub next_due: NaiveDate,
}

/// 默认掃除種別（设置表为空时写入）
pub fn default_cleaning_settings() -> Vec<CleaningTypeSetting> {
    vec![
        CleaningTypeSetting::new("トイレ掃除", 3, Priority::High),
        CleaningTypeSetting::new("風呂掃除", 7, Priority::High),
        CleaningTypeSetting::new("キッチン掃除", 3, Priority::High),
        CleaningTypeSetting::new("床掃除", 7, Priority::Medium),
        CleaningTypeSetting::new("窓掃除", 14, Priority::Low),
        CleaningTypeSetting::new("掃除機かけ", 3, Priority::Medium),
    ]
}

fn serialize_timestamp<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
}
