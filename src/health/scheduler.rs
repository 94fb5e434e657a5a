//! 定时巡检调度模块
//!
//! 按固定周期触发巡检并把结果交给广播器，同时暴露按需检测入口

use crate::broadcast::{ResultBroadcaster, SweepEvent};
use crate::error::{CheckError, StoreError};
use crate::health::sweep::{SweepEntry, SweepOrchestrator, SweepSummary};
use crate::target::MonitoredTarget;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

/// 默认巡检周期：两小时
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

/// 上一次巡检尚未结束时新周期到来的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// 允许并发巡检，写入按最后写入为准
    #[default]
    Allow,
    /// 跳过本次周期
    SkipIfRunning,
}

/// 调度参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// 巡检周期
    pub interval: Duration,
    /// 启动时是否立即巡检一次
    pub run_on_startup: bool,
    /// 重叠处理方式
    pub overlap: OverlapPolicy,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
            run_on_startup: false,
            overlap: OverlapPolicy::Allow,
        }
    }
}

/// 调度器状态
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStatus {
    /// 调度器是否运行中
    pub is_running: bool,
    /// 已开始的巡检次数
    pub sweeps_started: u64,
    /// 已完成的巡检次数
    pub sweeps_completed: u64,
    /// 读取目标失败的巡检次数
    pub sweeps_failed: u64,
    /// 因重叠被跳过的次数
    pub sweeps_skipped: u64,
    /// 最近一次巡检完成时间
    pub last_sweep_at: Option<DateTime<Utc>>,
    /// 最近一次巡检的目标数量
    pub last_sweep_size: usize,
}

/// 调度器trait，定义调度接口
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// 启动调度器
    async fn start(&self) -> Result<()>;

    /// 停止调度器
    async fn stop(&self) -> Result<()>;

    /// 获取调度器状态
    async fn get_status(&self) -> SchedulerStatus;
}

/// 周期任务与按需入口共享的状态
struct SchedulerShared {
    /// 巡检编排器
    orchestrator: Arc<SweepOrchestrator>,
    /// 结果广播器
    broadcaster: ResultBroadcaster,
    /// 调度器状态
    status: RwLock<SchedulerStatus>,
    /// 正在进行的定时巡检数量
    in_flight: AtomicUsize,
    /// 重叠处理方式
    overlap: OverlapPolicy,
}

/// 离开作用域时减少进行中的巡检计数
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SchedulerShared {
    /// 占用一个巡检名额，按重叠策略可能失败
    fn acquire(&self) -> Option<InFlightGuard<'_>> {
        match self.overlap {
            OverlapPolicy::Allow => {
                self.in_flight.fetch_add(1, Ordering::SeqCst);
            }
            OverlapPolicy::SkipIfRunning => {
                self.in_flight
                    .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                    .ok()?;
            }
        }
        Some(InFlightGuard(&self.in_flight))
    }

    /// 执行一次定时巡检并广播结果
    async fn run_scheduled(&self) -> Option<Vec<SweepEntry>> {
        let Some(_guard) = self.acquire() else {
            warn!("上一次巡检尚未结束，跳过本次定时巡检");
            self.status.write().await.sweeps_skipped += 1;
            return None;
        };

        self.status.write().await.sweeps_started += 1;
        info!("开始定时巡检");

        match self.orchestrator.run_scheduled_sweep().await {
            Ok(entries) => {
                {
                    let mut status = self.status.write().await;
                    status.sweeps_completed += 1;
                    status.last_sweep_at = Some(Utc::now());
                    status.last_sweep_size = entries.len();
                }
                self.broadcaster.publish(SweepEvent::new(entries.clone()));
                Some(entries)
            }
            Err(e) => {
                error!("定时巡检失败，无法读取目标列表: {}", e);
                self.status.write().await.sweeps_failed += 1;
                None
            }
        }
    }
}

/// 巡检调度器实现
pub struct SweepScheduler {
    /// 共享状态
    shared: Arc<SchedulerShared>,
    /// 调度参数
    settings: ScheduleSettings,
    /// 周期任务句柄
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SweepScheduler {
    /// 创建新的巡检调度器
    ///
    /// # 参数
    /// * `orchestrator` - 巡检编排器
    /// * `broadcaster` - 结果广播器
    /// * `settings` - 调度参数
    ///
    /// # 返回
    /// * `Self` - 调度器实例
    pub fn new(
        orchestrator: Arc<SweepOrchestrator>,
        broadcaster: ResultBroadcaster,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                orchestrator,
                broadcaster,
                status: RwLock::new(SchedulerStatus::default()),
                in_flight: AtomicUsize::new(0),
                overlap: settings.overlap,
            }),
            settings,
            task: Mutex::new(None),
        }
    }

    /// 获取结果广播器
    pub fn broadcaster(&self) -> &ResultBroadcaster {
        &self.shared.broadcaster
    }

    /// 获取巡检编排器
    pub fn orchestrator(&self) -> &Arc<SweepOrchestrator> {
        &self.shared.orchestrator
    }

    /// 立即执行一次定时巡检（与周期触发走同一路径）
    ///
    /// 被跳过或读取目标失败时返回 `None`。
    pub async fn run_now(&self) -> Option<Vec<SweepEntry>> {
        self.shared.run_scheduled().await
    }

    /// 按需检测单个目标
    pub async fn check_one(&self, id: &Uuid) -> Result<MonitoredTarget, CheckError> {
        self.shared.orchestrator.check_one(id).await
    }

    /// 按需并发检测全部目标，所有探测结束后返回汇总
    pub async fn check_all(&self) -> Result<SweepSummary, StoreError> {
        let entries = self.shared.orchestrator.check_all().await?;
        Ok(SweepSummary::from_entries(&entries))
    }
}

#[async_trait]
impl Scheduler for SweepScheduler {
    async fn start(&self) -> Result<()> {
        {
            // 检查和登记在同一把锁内完成，并发调用只会启动一个周期任务
            let mut task = self
                .task
                .lock()
                .map_err(|_| anyhow::anyhow!("调度任务锁已损坏"))?;
            if task.as_ref().is_some_and(|h| !h.is_finished()) {
                warn!("巡检调度器已在运行");
                return Ok(());
            }

            let period = self.settings.interval;
            let first_tick = if self.settings.run_on_startup {
                Instant::now()
            } else {
                Instant::now() + period
            };

            info!(
                "启动巡检调度器，周期: {}秒，重叠策略: {:?}",
                period.as_secs(),
                self.settings.overlap
            );

            let shared = Arc::clone(&self.shared);
            *task = Some(tokio::spawn(async move {
                let mut ticker = interval_at(first_tick, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    ticker.tick().await;

                    // 每次巡检单独运行，慢巡检不会推迟下一个周期
                    let shared = Arc::clone(&shared);
                    tokio::spawn(async move {
                        shared.run_scheduled().await;
                    });
                }
            }));
        }

        self.shared.status.write().await.is_running = true;

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        info!("停止巡检调度器");

        let handle = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(handle) = handle {
            handle.abort();
        }

        self.shared.status.write().await.is_running = false;
        info!("巡检调度器已停止");
        Ok(())
    }

    async fn get_status(&self) -> SchedulerStatus {
        self.shared.status.read().await.clone()
    }
}

impl Drop for SweepScheduler {
    fn drop(&mut self) {
        // 确保在调度器被销毁时停止周期任务
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::checker::{ProbeProfile, Prober};
    use crate::health::result::{ProbeResult, TargetStatus};
    use crate::store::{MemoryTargetStore, TargetStore};

    /// 固定返回在线的假探测器
    struct SlowProber {
        delay: Duration,
    }

    #[async_trait]
    impl Prober for SlowProber {
        async fn probe(&self, target: &MonitoredTarget, _profile: &ProbeProfile) -> ProbeResult {
            tokio::time::sleep(self.delay).await;
            ProbeResult::responded(TargetStatus::Online, target.url.clone(), 200, 1)
        }
    }

    async fn create_scheduler(settings: ScheduleSettings, delay: Duration) -> SweepScheduler {
        let store = MemoryTargetStore::new();
        for name in ["a", "b"] {
            store
                .insert(MonitoredTarget::new(
                    name.to_string(),
                    format!("{name}.example.com"),
                    None,
                ))
                .await
                .unwrap();
        }
        let orchestrator = Arc::new(SweepOrchestrator::new(
            Arc::new(store),
            Arc::new(SlowProber { delay }),
            ProbeProfile::scheduled(),
            ProbeProfile::bulk(),
        ));
        SweepScheduler::new(orchestrator, ResultBroadcaster::new(), settings)
    }

    #[tokio::test]
    async fn test_run_now_broadcasts_results() {
        let scheduler = create_scheduler(ScheduleSettings::default(), Duration::ZERO).await;
        let mut receiver = scheduler.broadcaster().subscribe();

        let entries = scheduler.run_now().await.unwrap();
        assert_eq!(entries.len(), 2);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.results, entries);

        let status = scheduler.get_status().await;
        assert_eq!(status.sweeps_started, 1);
        assert_eq!(status.sweeps_completed, 1);
        assert_eq!(status.last_sweep_size, 2);
        assert!(status.last_sweep_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sweep_fires_after_one_period() {
        let settings = ScheduleSettings {
            interval: Duration::from_secs(60),
            ..Default::default()
        };
        let scheduler = create_scheduler(settings, Duration::ZERO).await;
        let mut receiver = scheduler.broadcaster().subscribe();

        scheduler.start().await.unwrap();
        assert!(scheduler.get_status().await.is_running);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(scheduler.get_status().await.sweeps_started, 0);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.results.len(), 2);

        // 第二个周期
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.results.len(), 2);
        assert!(scheduler.get_status().await.sweeps_completed >= 2);

        scheduler.stop().await.unwrap();
        assert!(!scheduler.get_status().await.is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_on_startup_sweeps_immediately() {
        let settings = ScheduleSettings {
            interval: DEFAULT_SWEEP_INTERVAL,
            run_on_startup: true,
            overlap: OverlapPolicy::Allow,
        };
        let scheduler = create_scheduler(settings, Duration::ZERO).await;
        let mut receiver = scheduler.broadcaster().subscribe();

        scheduler.start().await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.results.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_sweeps_allowed_by_default() {
        let scheduler = create_scheduler(ScheduleSettings::default(), Duration::from_secs(5)).await;

        let (first, second) = tokio::join!(scheduler.run_now(), scheduler.run_now());
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(scheduler.get_status().await.sweeps_completed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_if_running_drops_overlapping_tick() {
        let settings = ScheduleSettings {
            overlap: OverlapPolicy::SkipIfRunning,
            ..Default::default()
        };
        let scheduler = create_scheduler(settings, Duration::from_secs(5)).await;

        let (first, second) = tokio::join!(scheduler.run_now(), scheduler.run_now());
        assert!(first.is_some());
        assert!(second.is_none());

        let status = scheduler.get_status().await;
        assert_eq!(status.sweeps_completed, 1);
        assert_eq!(status.sweeps_skipped, 1);

        // 前一次结束后可以再次巡检
        assert!(scheduler.run_now().await.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_start_spawns_single_loop() {
        let settings = ScheduleSettings {
            interval: DEFAULT_SWEEP_INTERVAL,
            run_on_startup: true,
            overlap: OverlapPolicy::Allow,
        };
        let scheduler = Arc::new(create_scheduler(settings, Duration::ZERO).await);

        let starts: Vec<_> = (0..8)
            .map(|_| {
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move { scheduler.start().await.unwrap() })
            })
            .collect();
        for start in starts {
            start.await.unwrap();
        }

        // 每个周期任务启动时都会立即巡检一次
        tokio::time::sleep(Duration::from_millis(200)).await;
        let status = scheduler.get_status().await;
        assert!(status.is_running);
        assert_eq!(status.sweeps_started, 1);

        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_check_all_returns_summary() {
        let scheduler = create_scheduler(ScheduleSettings::default(), Duration::ZERO).await;
        let mut receiver = scheduler.broadcaster().subscribe();

        let summary = scheduler.check_all().await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.online, 2);

        // 按需检测不会广播
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_check_one_unknown_target() {
        let scheduler = create_scheduler(ScheduleSettings::default(), Duration::ZERO).await;
        let result = scheduler.check_one(&Uuid::new_v4()).await;
        assert!(matches!(result, Err(CheckError::NotFound(_))));
    }
}
