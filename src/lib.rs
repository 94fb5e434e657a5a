//! Server Pulse - HTTP目标可达性监控工具
//!
//! 这是一个用Rust编写的HTTP可达性监控工具，支持：
//! - 定时顺序巡检和按需并发检测
//! - 目标地址规范化与统一的状态分类
//! - 巡检结果的实时推送
//! - 目标管理HTTP接口
//! - 结构化日志记录

pub mod app;
pub mod broadcast;
pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod store;
pub mod target;
pub mod web;

// 重新导出主要类型
pub use config::{Config, GlobalConfig, ProbeConfig};
pub use error::ServerPulseError;
pub use health::{ProbeResult, SweepOrchestrator, SweepScheduler, TargetStatus};
pub use target::MonitoredTarget;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
