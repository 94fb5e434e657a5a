//! 健康检测模块
//!
//! 提供地址规范化、HTTP可达性探测、巡检编排和定时调度功能

pub mod checker;
pub mod result;
pub mod scheduler;
pub mod sweep;
pub mod url;

// 重新导出主要类型
pub use checker::{ClassificationPolicy, ClientOptions, HttpProber, ProbeProfile, Prober, TlsTrust};
pub use result::{ProbeResult, TargetStatus};
pub use scheduler::{OverlapPolicy, ScheduleSettings, Scheduler, SchedulerStatus, SweepScheduler};
pub use sweep::{SweepEntry, SweepMode, SweepOrchestrator, SweepSummary};
