//! 巡检编排模块
//!
//! 读取目标快照，逐个或并发地探测并把观测写回存储

use crate::error::{CheckError, StoreError};
use crate::health::checker::{ProbeProfile, Prober};
use crate::health::result::ProbeResult;
use crate::logging::LoggingSystem;
use crate::store::TargetStore;
use crate::target::MonitoredTarget;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 巡检并发模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// 一个目标（包括写回）完成后才开始下一个
    Sequential,
    /// 所有目标同时探测，等待全部结束
    Parallel,
}

/// 巡检中单个目标的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    /// 目标ID
    pub target_id: Uuid,
    /// 目标名称
    pub title: String,
    /// 探测结果
    pub result: ProbeResult,
    /// 观测是否已写回存储
    pub persisted: bool,
}

/// 一次巡检的汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    /// 目标总数
    pub total: usize,
    /// 在线数量
    pub online: usize,
    /// 写回失败数量
    pub unpersisted: usize,
}

impl SweepSummary {
    /// 根据巡检结果计算汇总
    pub fn from_entries(entries: &[SweepEntry]) -> Self {
        Self {
            total: entries.len(),
            online: entries.iter().filter(|e| e.result.status.is_online()).count(),
            unpersisted: entries.iter().filter(|e| !e.persisted).count(),
        }
    }
}

/// 巡检编排器
pub struct SweepOrchestrator {
    /// 目标存储
    store: Arc<dyn TargetStore>,
    /// 探测器
    prober: Arc<dyn Prober>,
    /// 定时巡检和单目标检测的探测参数
    scheduled_profile: ProbeProfile,
    /// 批量检测的探测参数
    bulk_profile: ProbeProfile,
}

impl SweepOrchestrator {
    /// 创建新的巡检编排器
    ///
    /// # 参数
    /// * `store` - 目标存储
    /// * `prober` - 探测器
    /// * `scheduled_profile` - 定时巡检使用的探测参数
    /// * `bulk_profile` - 批量检测使用的探测参数
    pub fn new(
        store: Arc<dyn TargetStore>,
        prober: Arc<dyn Prober>,
        scheduled_profile: ProbeProfile,
        bulk_profile: ProbeProfile,
    ) -> Self {
        Self {
            store,
            prober,
            scheduled_profile,
            bulk_profile,
        }
    }

    /// 获取目标存储
    pub fn store(&self) -> &Arc<dyn TargetStore> {
        &self.store
    }

    /// 执行一次巡检
    ///
    /// 只有读取目标列表失败会返回错误；单个目标的探测或写回失败只会记录日志，
    /// 巡检总会把已得到的结果按目标顺序返回。
    ///
    /// # 参数
    /// * `mode` - 并发模式
    /// * `profile` - 探测参数
    ///
    /// # 返回
    /// * `Result<Vec<SweepEntry>, StoreError>` - 每个目标的结果
    pub async fn run_sweep(
        &self,
        mode: SweepMode,
        profile: &ProbeProfile,
    ) -> Result<Vec<SweepEntry>, StoreError> {
        let started = Instant::now();
        let targets = self.store.list().await?;

        info!("开始巡检，模式: {:?}，目标数量: {}", mode, targets.len());

        let entries = match mode {
            SweepMode::Sequential => {
                let mut entries = Vec::with_capacity(targets.len());
                for target in &targets {
                    entries.push(self.probe_and_record(target, profile).await);
                }
                entries
            }
            SweepMode::Parallel => {
                let probes = targets
                    .iter()
                    .map(|target| self.probe_and_record(target, profile));
                futures::future::join_all(probes).await
            }
        };

        let summary = SweepSummary::from_entries(&entries);
        info!(
            "巡检完成，耗时: {}ms，目标: {}，在线: {}，写回失败: {}",
            started.elapsed().as_millis(),
            summary.total,
            summary.online,
            summary.unpersisted
        );

        Ok(entries)
    }

    /// 定时巡检：顺序执行，使用定时探测参数
    pub async fn run_scheduled_sweep(&self) -> Result<Vec<SweepEntry>, StoreError> {
        let profile = self.scheduled_profile;
        self.run_sweep(SweepMode::Sequential, &profile).await
    }

    /// 批量检测：并发执行，使用批量探测参数
    pub async fn check_all(&self) -> Result<Vec<SweepEntry>, StoreError> {
        let profile = self.bulk_profile;
        self.run_sweep(SweepMode::Parallel, &profile).await
    }

    /// 检测单个目标并返回更新后的记录
    ///
    /// 目标不存在时返回 `CheckError::NotFound`，不会发起任何网络请求。
    pub async fn check_one(&self, id: &Uuid) -> Result<MonitoredTarget, CheckError> {
        let target = self
            .store
            .get(id)
            .await?
            .ok_or(CheckError::NotFound(*id))?;

        let result = self.prober.probe(&target, &self.scheduled_profile).await;
        log_result(&target, &result);

        match self.record(id, &result).await {
            Ok(updated) => Ok(updated),
            Err(StoreError::NotFound(_)) => Err(CheckError::NotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }

    /// 探测一个目标并写回观测
    async fn probe_and_record(&self, target: &MonitoredTarget, profile: &ProbeProfile) -> SweepEntry {
        let result = self.prober.probe(target, profile).await;
        log_result(target, &result);

        let persisted = match self.record(&target.id, &result).await {
            Ok(_) => true,
            Err(StoreError::NotFound(id)) => {
                warn!("目标在巡检期间被删除，跳过写回: {}", id);
                false
            }
            Err(e) => {
                error!("写回目标观测失败 {}: {}", target.id, e);
                false
            }
        };

        SweepEntry {
            target_id: target.id,
            title: target.title.clone(),
            result,
            persisted,
        }
    }

    /// 把观测写到存储中最新的目标记录上，返回写入后的记录
    ///
    /// 探测期间对名称或地址的修改会被保留。
    async fn record(&self, id: &Uuid, result: &ProbeResult) -> Result<MonitoredTarget, StoreError> {
        let latest = self.store.get(id).await?.ok_or(StoreError::NotFound(*id))?;
        let updated = latest.observed(result);
        self.store.save(&updated).await?;
        Ok(updated)
    }
}

/// 记录单个目标的探测结果
fn log_result(target: &MonitoredTarget, result: &ProbeResult) {
    LoggingSystem::probe_log(&target.id, &target.title, result);
    if let Some(ref error) = result.error {
        debug!("目标 {} 探测地址: {}，错误: {}", target.title, result.url, error);
    }
}
