//! 被监控目标数据结构
//!
//! 定义目标记录以及探测结果写回目标时的唯一入口

use crate::health::result::{ProbeResult, TargetStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 被监控目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredTarget {
    /// 目标ID
    pub id: Uuid,
    /// 显示名称
    pub title: String,
    /// 基础地址，可以省略协议
    pub url: String,
    /// 探测子路径
    #[serde(default)]
    pub endpoint: Option<String>,
    /// 最近一次观测的状态
    #[serde(default)]
    pub status: TargetStatus,
    /// 最近一次探测时间
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    /// 最近一次探测耗时（毫秒）
    #[serde(default)]
    pub response_time_ms: Option<u64>,
    /// 最近一次失败描述
    #[serde(default)]
    pub error: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl MonitoredTarget {
    /// 创建新目标，初始状态为 `offline` 且没有任何观测
    pub fn new(title: String, url: String, endpoint: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            url,
            endpoint,
            status: TargetStatus::Offline,
            last_checked: None,
            response_time_ms: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 写入一次观测
    ///
    /// 状态、时间、耗时和错误四个字段总是一起更新。
    pub fn apply(&mut self, result: &ProbeResult) {
        self.status = result.status;
        self.last_checked = Some(result.checked_at);
        self.response_time_ms = Some(result.response_time_ms);
        self.error = result.error.clone();
        self.updated_at = Utc::now();
    }

    /// 返回写入观测后的副本
    pub fn observed(&self, result: &ProbeResult) -> Self {
        let mut updated = self.clone();
        updated.apply(result);
        updated
    }

    /// 判断两个目标是否指向同一个探测地址
    pub fn same_address(&self, url: &str, endpoint: Option<&str>) -> bool {
        self.url == url && self.endpoint.as_deref().unwrap_or("") == endpoint.unwrap_or("")
    }
}
