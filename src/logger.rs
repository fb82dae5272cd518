// 日志系统 - 控制台/文件输出，并在内存中保留最近的日志供仪表盘查看

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, RwLock};
use time::macros::format_description;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

/// 内存中保留的默认日志条数
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// 日志消息
#[derive(Clone, Debug, serde::Serialize)]
pub struct LogMessage {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// 最近日志的环形缓冲区
pub struct LogBuffer {
    capacity: usize,
    entries: RwLock<VecDeque<LogMessage>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    fn push(&self, log: LogMessage) {
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(log);
        }
    }

    /// 最近的日志（新→旧）
    pub fn recent(&self, limit: usize) -> Vec<LogMessage> {
        self.entries
            .read()
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// 把日志事件写入 LogBuffer 的层
pub struct BufferLayer {
    buffer: Arc<LogBuffer>,
}

impl BufferLayer {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

impl<S: Subscriber> Layer<S> for BufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        // 使用 visitor 提取消息，其余字段以 key=value 附在后面
        struct MessageVisitor {
            message: String,
            fields: Vec<String>,
        }

        impl tracing::field::Visit for MessageVisitor {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = value.to_string();
                } else {
                    self.fields.push(format!("{}={}", field.name(), value));
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                } else {
                    self.fields.push(format!("{}={:?}", field.name(), value));
                }
            }
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut visitor);

        let mut message = visitor.message;
        if !visitor.fields.is_empty() {
            message.push(' ');
            message.push_str(&visitor.fields.join(" "));
        }

        self.buffer.push(LogMessage {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
        });
    }
}

/// 初始化日志系统
///
/// 默认级别 info，可用 RUST_LOG 覆盖。指定 `log_dir` 时同时按天轮转写入文件，
/// 返回的 guard 需要在程序运行期间保持存活。
pub fn init(
    log_dir: Option<&Path>,
    buffer: Arc<LogBuffer>,
) -> Result<Option<WorkerGuard>, SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // 使用本地时区
    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("无法创建日志目录 {:?}: {}", dir, e);
            }
            let file_appender = tracing_appender::rolling::daily(dir, "cleaning-tracker.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_timer(timer.clone())
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(timer)
                .with_ansi(cfg!(debug_assertions)), // release 版本不使用颜色代码
        )
        .with(file_layer)
        .with(BufferLayer::new(buffer));

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(dir) = log_dir {
        eprintln!("日志文件位置: {:?}", dir);
    }
    Ok(guard)
}
