//! 掃除管理系统命令行入口

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use cleaning_tracker_lib::config::AppConfig;
use cleaning_tracker_lib::domains::report::{overdue_table, status_speech, VOICE_DISPLAY_LIMIT};
use cleaning_tracker_lib::domains::stats::cleaning_stats;
use cleaning_tracker_lib::domains::{compute_overdue, record_cleaning, ScheduleUpdate};
use cleaning_tracker_lib::logger::{self, LogBuffer};
use cleaning_tracker_lib::server::{self, AppState, Backend};
use cleaning_tracker_lib::storage::{CleaningRepository, SheetStatus};
use cleaning_tracker_lib::{build_backend, open_repository};

/// Voice-driven household cleaning tracker.
#[derive(Parser)]
#[command(name = "cleaning-tracker", version, about)]
struct Cli {
    /// Path to JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-memory store instead of Google Sheets.
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Alexa webhook and dashboard server (default).
    Serve {
        /// Override the bind address.
        #[arg(long)]
        bind: Option<String>,
    },

    #[command(flatten)]
    Store(StoreCommand),
}

/// 直接操作存储的维护命令
#[derive(Subcommand)]
enum StoreCommand {
    /// Make sure both sheets exist, seeding the settings sheet.
    Init,

    /// Print the ranked overdue list.
    Overdue,

    /// Record a cleaning event.
    Record {
        /// Cleaning type, e.g. トイレ掃除
        cleaning_type: String,

        /// Optional note.
        #[arg(long)]
        note: Option<String>,
    },

    /// Print summary statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 配置错误时 serve 仍以配置错误模式启动
    let (config, config_error) = match AppConfig::from_env(cli.config.as_deref()).await {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    let logs = Arc::new(LogBuffer::default());
    let _guard = logger::init(config.log_dir.as_deref(), logs.clone())?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            let backend = match config_error {
                Some(e) => {
                    error!("❌ 配置加载失败: {}", e);
                    Backend::Misconfigured(e.to_string())
                }
                None => build_backend(&config, cli.memory).await,
            };
            let addr = bind.unwrap_or_else(|| config.bind_addr.clone());
            server::serve(AppState::new(backend, config, logs), &addr).await
        }
        Command::Store(command) => {
            if let Some(e) = config_error {
                return Err(e.into());
            }
            let (repo, _) = open_repository(&config, cli.memory).await?;
            run_command(command, repo.as_ref(), &config).await
        }
    }
}

async fn run_command(
    command: StoreCommand,
    repo: &dyn CleaningRepository,
    config: &AppConfig,
) -> anyhow::Result<()> {
    match command {
        StoreCommand::Init => {
            let records = repo.ensure_records_sheet().await?;
            let settings = repo.ensure_settings_sheet().await?;
            println!("掃除記録: {}", describe_status(records));
            println!("掃除種別設定: {}", describe_status(settings));
        }
        StoreCommand::Overdue => {
            let settings = repo.list_settings().await?;
            let overdue = compute_overdue(&settings, config.now().date());
            println!("{}", status_speech(&overdue, VOICE_DISPLAY_LIMIT));
            for row in overdue_table(&overdue) {
                println!(
                    "  [{}] {} 前回: {} / 予定: {} / {}日遅れ",
                    row.priority, row.cleaning_type, row.last_done, row.next_due, row.days_overdue
                );
            }
        }
        StoreCommand::Record {
            cleaning_type,
            note,
        } => {
            let outcome = record_cleaning(repo, &cleaning_type, note, config.now()).await?;
            info!("记录完成: {:?}", outcome.schedule);
            match outcome.schedule {
                ScheduleUpdate::Updated { next_due, .. } => match next_due {
                    Some(next_due) => {
                        println!("{}を記録しました。次回予定日: {}", cleaning_type, next_due)
                    }
                    None => println!("{}を記録しました。", cleaning_type),
                },
                ScheduleUpdate::NotFound => println!(
                    "{}を記録しました（掃除種別設定にないため予定は更新されていません）。",
                    cleaning_type
                ),
                ScheduleUpdate::Failed { reason } => println!(
                    "{}を記録しました（予定の更新に失敗: {}）。",
                    cleaning_type, reason
                ),
            }
        }
        StoreCommand::Stats => {
            let now = config.now();
            let settings = repo.list_settings().await?;
            let records = repo.list_records().await?;
            let overdue_count = compute_overdue(&settings, now.date()).len();
            println!(
                "{}",
                serde_json::to_string_pretty(&cleaning_stats(&records, overdue_count, now))?
            );
        }
    }
    Ok(())
}

fn describe_status(status: SheetStatus) -> &'static str {
    match status {
        SheetStatus::Found => "既存",
        SheetStatus::Created => "新規作成",
    }
}
