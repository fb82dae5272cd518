// 逾期计算引擎
//
// 根据每个掃除種別的推荐频率和最终实施日，计算在参考日期时哪些种别已到期，
// 并按优先度和逾期天数排序。纯函数，不访问存储，也不会返回错误。

use chrono::{Days, NaiveDate};
use std::cmp::Reverse;
use tracing::debug;

use crate::models::{CleaningTypeSetting, DateCell, OverdueEntry};

/// 计算逾期列表
///
/// - 从未实施（最终实施日为空）的种别总是包含在结果中，`days_overdue = 0`
/// - 已实施的种别在 `最终实施日 + 频率 <= 参考日期` 时包含
/// - 最终实施日或次回予定日格式错误的行被跳过（不视为从未实施）
///
/// 结果按 优先度（高→低）、逾期天数（多→少）排序，其余相同时保持输入顺序。
/// 不做截断，也不去重。
pub fn compute_overdue(
    settings: &[CleaningTypeSetting],
    reference_date: NaiveDate,
) -> Vec<OverdueEntry> {
    let mut overdue: Vec<OverdueEntry> = settings
        .iter()
        .filter_map(|setting| evaluate(setting, reference_date))
        .collect();

    // sort_by_key 是稳定排序
    overdue.sort_by_key(|entry| (entry.priority.rank(), Reverse(entry.days_overdue)));
    overdue
}

fn evaluate(setting: &CleaningTypeSetting, reference_date: NaiveDate) -> Option<OverdueEntry> {
    if setting.last_done.is_malformed() || setting.next_due.is_malformed() {
        debug!("跳过日期格式错误的掃除種別: {}", setting.name);
        return None;
    }

    let last_done = match &setting.last_done {
        DateCell::Date(date) => *date,
        _ => {
            return Some(OverdueEntry {
                type_name: setting.name.clone(),
                priority: setting.priority,
                days_overdue: 0,
                frequency_days: setting.frequency_days,
                last_done: None,
                next_due: reference_date,
            });
        }
    };

    let next_due = last_done.checked_add_days(Days::new(u64::from(setting.frequency_days)))?;
    if next_due > reference_date {
        return None;
    }

    let days_overdue = u32::try_from((reference_date - next_due).num_days()).unwrap_or(u32::MAX);

    Some(OverdueEntry {
        type_name: setting.name.clone(),
        priority: setting.priority,
        days_overdue,
        frequency_days: setting.frequency_days,
        last_done: Some(last_done),
        next_due,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn days_ago(n: u64) -> NaiveDate {
        today().checked_sub_days(Days::new(n)).unwrap()
    }

    fn setting(name: &str, freq: u32, priority: Priority, last_done: Option<NaiveDate>) -> CleaningTypeSetting {
        let base = CleaningTypeSetting::new(name, freq, priority);
        match last_done {
            Some(date) => base.with_last_done(date),
            None => base,
        }
    }

    fn names(entries: &[OverdueEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.type_name.as_str()).collect()
    }

    #[test]
    fn test_done_and_overdue() {
        let settings = vec![setting("toilet", 3, Priority::High, Some(days_ago(5)))];
        let overdue = compute_overdue(&settings, today());

        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].type_name, "toilet");
        assert_eq!(overdue[0].days_overdue, 2);
        assert_eq!(overdue[0].next_due, days_ago(2));
        assert_eq!(overdue[0].last_done, Some(days_ago(5)));
    }

    #[test]
    fn test_not_yet_due() {
        let settings = vec![setting("window", 14, Priority::Low, Some(days_ago(1)))];
        assert!(compute_overdue(&settings, today()).is_empty());
    }

    #[test]
    fn test_due_exactly_today() {
        let settings = vec![setting("bath", 7, Priority::High, Some(days_ago(7)))];
        let overdue = compute_overdue(&settings, today());
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].days_overdue, 0);
    }

    #[test]
    fn test_never_done_is_due_today() {
        let settings = vec![setting("kitchen", 3, Priority::High, None)];
        for reference in [today(), days_ago(400), NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()] {
            let overdue = compute_overdue(&settings, reference);
            assert_eq!(overdue.len(), 1);
            assert_eq!(overdue[0].days_overdue, 0);
            assert_eq!(overdue[0].last_done, None);
            assert_eq!(overdue[0].next_due, reference);
        }
    }

    #[test]
    fn test_priority_beats_lateness() {
        let settings = vec![
            setting("B", 7, Priority::Medium, Some(days_ago(17))),
            setting("A", 3, Priority::High, Some(days_ago(6))),
        ];
        let overdue = compute_overdue(&settings, today());
        assert_eq!(names(&overdue), vec!["A", "B"]);
        assert_eq!(overdue[0].days_overdue, 3);
        assert_eq!(overdue[1].days_overdue, 10);
    }

    #[test]
    fn test_more_overdue_first_within_tier() {
        let settings = vec![
            setting("A", 3, Priority::High, Some(days_ago(5))),
            setting("B", 3, Priority::High, Some(days_ago(8))),
        ];
        let overdue = compute_overdue(&settings, today());
        assert_eq!(names(&overdue), vec!["B", "A"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let settings = vec![
            setting("first", 3, Priority::Medium, None),
            setting("second", 7, Priority::Medium, None),
            setting("third", 3, Priority::Medium, Some(days_ago(3))),
        ];
        let overdue = compute_overdue(&settings, today());
        assert_eq!(names(&overdue), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_malformed_dates_are_excluded() {
        let mut bad_last = setting("bad_last", 3, Priority::High, None);
        bad_last.last_done = DateCell::Malformed("昨日".to_string());

        let mut bad_next = setting("bad_next", 3, Priority::High, None);
        bad_next.next_due = DateCell::Malformed("??".to_string());

        let mut bad_next_done = setting("bad_next_done", 3, Priority::High, Some(days_ago(10)));
        bad_next_done.next_due = DateCell::Malformed("soon".to_string());

        let overdue = compute_overdue(&[bad_last, bad_next, bad_next_done], today());
        assert!(overdue.is_empty());
    }

    #[test]
    fn test_duplicate_names_are_independent() {
        let settings = vec![
            setting("floor", 7, Priority::Medium, None),
            setting("floor", 7, Priority::Medium, Some(days_ago(9))),
        ];
        let overdue = compute_overdue(&settings, today());
        assert_eq!(overdue.len(), 2);
        assert_eq!(overdue[0].days_overdue, 2);
        assert_eq!(overdue[1].days_overdue, 0);
    }

    #[test]
    fn test_empty_input() {
        assert!(compute_overdue(&[], today()).is_empty());
    }

    #[test]
    fn test_stored_next_due_is_recomputed() {
        // 表格里的次回予定日与计算值不一致时，以 最终实施日 + 频率 为准
        let mut stale = setting("vacuum", 3, Priority::Medium, Some(days_ago(4)));
        stale.next_due = DateCell::Date(today() + Days::new(30));
        let overdue = compute_overdue(&[stale], today());
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].days_overdue, 1);
    }

    #[test]
    fn test_ordering_and_idempotence_over_mixed_input() {
        let priorities = [Priority::Low, Priority::High, Priority::Medium];
        let settings: Vec<CleaningTypeSetting> = (0..30u64)
            .map(|i| {
                let priority = priorities[(i % 3) as usize];
                let last_done = if i % 5 == 0 { None } else { Some(days_ago(i)) };
                setting(&format!("type-{i}"), (i % 4 + 1) as u32, priority, last_done)
            })
            .collect();

        let first = compute_overdue(&settings, today());
        let second = compute_overdue(&settings, today());
        assert_eq!(first, second);

        for pair in first.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.priority.rank() <= b.priority.rank());
            if a.priority == b.priority {
                assert!(a.days_overdue >= b.days_overdue);
            }
        }

        for s in &settings {
            let included = first.iter().any(|e| e.type_name == s.name);
            match s.last_done.date() {
                None => assert!(included),
                Some(done) => {
                    let due = done + Days::new(u64::from(s.frequency_days));
                    assert_eq!(included, today() >= due, "{}", s.name);
                }
            }
        }
    }
}
