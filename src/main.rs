//! Server Pulse 主程序入口
//!
//! HTTP目标可达性监控工具

use anyhow::{Context, Result};
use server_pulse::cli::{command_for, Args, Commands};
use server_pulse::config::{ConfigLoader, GlobalConfig, TomlConfigLoader};
use server_pulse::logging::{LogConfig, LoggingSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse_args();

    // 初始化日志系统
    let global = logging_base(&args).await;
    let log_config = LogConfig::from_global(&global, args.log_level_override());
    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Server Pulse v{} 启动", server_pulse::VERSION);

    // 执行命令
    if let Err(e) = command_for(&args).execute(&args).await {
        error!("命令执行失败: {}", e);
        eprintln!("错误: {e}");
        std::process::exit(1);
    }

    Ok(())
}

/// 日志配置来源
///
/// 只有 `start` 和 `check` 读取配置文件中的日志设置，读取失败时使用默认值，
/// 具体错误交给命令本身报告。
async fn logging_base(args: &Args) -> GlobalConfig {
    match args.command {
        Commands::Start { .. } | Commands::Check { .. } => TomlConfigLoader::new(true)
            .load_from_file(args.get_config_path())
            .await
            .map(|config| config.global)
            .unwrap_or_default(),
        _ => GlobalConfig {
            log_level: "warn".to_string(),
            ..Default::default()
        },
    }
}
