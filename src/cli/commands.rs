//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::app::{build_components, run_service};
use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, ConfigLoader, TomlConfigLoader, DEFAULT_CONFIG_TEMPLATE};
use crate::error::{Result, ServerPulseError};
use crate::health::result::ProbeResult;
use crate::health::sweep::{SweepEntry, SweepSummary};
use crate::target::MonitoredTarget;
use async_trait::async_trait;
use std::path::Path;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use uuid::Uuid;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 按命令行参数加载配置
async fn load_config(args: &Args) -> Result<Config> {
    let config_path = args.get_config_path();
    if !config_path.exists() {
        return Err(ServerPulseError::Other(anyhow::anyhow!(
            "配置文件不存在: {}\n提示：请运行 'server-pulse init' 创建默认配置文件",
            config_path.display()
        )));
    }

    TomlConfigLoader::new(true).load_from_file(&config_path).await
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, DEFAULT_CONFIG_TEMPLATE).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以添加您的监控目标");

        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        if verbose {
            println!("配置验证通过！");
            println!("全局配置:");
            println!("  巡检间隔: {}秒", config.global.sweep_interval_seconds);
            println!("  日志级别: {}", config.global.log_level);
            println!("探测配置:");
            println!("  TLS信任模式: {:?}", config.probe.tls_trust);
            println!("  定时巡检超时: {}秒", config.probe.scheduled_timeout_seconds);
            println!("  批量检测超时: {}秒", config.probe.bulk_timeout_seconds);
            println!("  批量检测策略: {:?}", config.probe.bulk_policy);
            println!("存储: {:?} ({})", config.store.backend, config.store.path.display());
            if config.web.enabled {
                println!("Web接口: {}:{}", config.web.bind_address, config.web.port);
            } else {
                println!("Web接口: 已禁用");
            }

            println!("初始目标:");
            for (i, target) in config.targets.iter().enumerate() {
                println!(
                    "  {}. {} ({}{})",
                    i + 1,
                    target.title,
                    target.url,
                    target.endpoint.as_deref().unwrap_or("")
                );
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个初始目标", config.targets.len());
        }

        Ok(())
    }
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check {
            target,
            format,
            all,
        } = &args.command
        {
            self.perform_check(args, target.as_deref(), *format, *all)
                .await
        } else {
            Ok(())
        }
    }
}

impl CheckCommand {
    /// 执行一次性检测
    async fn perform_check(
        &self,
        args: &Args,
        target_id: Option<&str>,
        format: OutputFormat,
        all: bool,
    ) -> Result<()> {
        let config = load_config(args).await?;
        let components = build_components(&config).await?;
        let orchestrator = components.scheduler.orchestrator();

        if let Some(raw_id) = target_id {
            let id = Uuid::parse_str(raw_id).map_err(|e| {
                ServerPulseError::Other(anyhow::anyhow!("无效的目标ID {}: {}", raw_id, e))
            })?;
            let target = orchestrator.check_one(&id).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&target)?),
                OutputFormat::Text => print_target(&target),
            }
            return Ok(());
        }

        let entries = if all {
            orchestrator.check_all().await?
        } else {
            orchestrator.run_scheduled_sweep().await?
        };

        if entries.is_empty() {
            eprintln!("未找到任何监控目标");
            return Ok(());
        }

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Text => print_entries(&entries),
        }

        Ok(())
    }
}

/// 状态图标
fn status_icon(online: bool) -> &'static str {
    if online {
        "✓"
    } else {
        "✗"
    }
}

/// 打印单条探测结果
fn print_result(title: &str, result: &ProbeResult) {
    println!(
        "{} {} ({}) - {} - {}ms",
        status_icon(result.status.is_online()),
        title,
        result.url,
        result.status,
        result.response_time_ms
    );
    if let Some(error) = &result.error {
        println!("  错误: {error}");
    }
}

/// 打印巡检结果
fn print_entries(entries: &[SweepEntry]) {
    for entry in entries {
        print_result(&entry.title, &entry.result);
        if !entry.persisted {
            println!("  警告: 观测未能写回存储");
        }
    }

    let summary = SweepSummary::from_entries(entries);
    println!();
    println!("共 {} 个目标，在线 {} 个", summary.total, summary.online);
}

/// 打印单个目标
fn print_target(target: &MonitoredTarget) {
    println!(
        "{} {} ({}{}) - {} - {}ms",
        status_icon(target.status.is_online()),
        target.title,
        target.url,
        target.endpoint.as_deref().unwrap_or(""),
        target.status,
        target.response_time_ms.unwrap_or(0)
    );
    if let Some(error) = &target.error {
        println!("  错误: {error}");
    }
}

/// 启动命令
pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Start { sweep_now } = &args.command {
            let mut config = load_config(args).await?;
            if *sweep_now {
                config.global.run_sweep_on_startup = true;
            }

            info!(
                "启动巡检服务，巡检间隔: {}秒",
                config.global.sweep_interval_seconds
            );

            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

            // 设置Ctrl+C信号处理
            tokio::spawn(async move {
                match signal::ctrl_c().await {
                    Ok(()) => {
                        info!("收到中断信号，正在停止服务...");
                        let _ = shutdown_tx.send(());
                    }
                    Err(err) => {
                        error!("监听中断信号失败: {}", err);
                    }
                }
            });

            run_service(config, shutdown_rx).await?;
        }
        Ok(())
    }
}

/// 根据子命令选择处理器
pub fn command_for(args: &Args) -> Box<dyn Command> {
    match &args.command {
        Commands::Start { .. } => Box::new(StartCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    }
}
