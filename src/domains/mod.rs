// 领域模块 - 掃除管理的业务逻辑
//
// overdue: 逾期计算；completion: 完成后更新日期；recording: 写入记录；
// report: 语音/表格展示；stats: 仪表盘统计

pub mod completion;
pub mod overdue;
pub mod recording;
pub mod report;
pub mod stats;

pub use completion::{apply_completion, complete_by_name, CompletionError};
pub use overdue::compute_overdue;
pub use recording::{record_cleaning, RecordOutcome, ScheduleUpdate};
