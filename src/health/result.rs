//! 探测结果数据结构
//!
//! 定义目标的可达性状态和单次探测的结果

use crate::error::ProbeFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 目标可达性状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    /// 收到了HTTP响应
    Online,
    /// 尚未探测，或在严格策略下判定为不可用
    #[default]
    Offline,
    /// 配置无效或传输层失败
    Error,
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetStatus::Online => write!(f, "online"),
            TargetStatus::Offline => write!(f, "offline"),
            TargetStatus::Error => write!(f, "error"),
        }
    }
}

impl TargetStatus {
    /// 判断目标是否可达
    pub fn is_online(&self) -> bool {
        matches!(self, TargetStatus::Online)
    }
}

/// 单次探测的结果
///
/// 只是临时数据，必须经过编排器的写回路径才会落到目标记录上。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// 探测状态
    pub status: TargetStatus,
    /// 往返耗时（毫秒），失败时为0
    pub response_time_ms: u64,
    /// 失败描述，成功时为空
    pub error: Option<String>,
    /// 观测时间
    pub checked_at: DateTime<Utc>,
    /// 实际请求的URL，配置无效时为空
    pub url: String,
    /// HTTP状态码（如果收到了响应）
    pub status_code: Option<u16>,
}

impl ProbeResult {
    /// 创建收到响应时的结果
    pub fn responded(
        status: TargetStatus,
        url: String,
        status_code: u16,
        response_time_ms: u64,
    ) -> Self {
        Self {
            status,
            response_time_ms,
            error: None,
            checked_at: Utc::now(),
            url,
            status_code: Some(status_code),
        }
    }

    /// 创建失败时的结果，耗时记为0
    pub fn failed(status: TargetStatus, url: String, failure: &ProbeFailure) -> Self {
        Self {
            status,
            response_time_ms: 0,
            error: Some(failure.to_string()),
            checked_at: Utc::now(),
            url,
            status_code: None,
        }
    }

    /// 设置错误信息
    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    /// 转换为JSON字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_status_display() {
        assert_eq!(TargetStatus::Online.to_string(), "online");
        assert_eq!(TargetStatus::Offline.to_string(), "offline");
        assert_eq!(TargetStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_target_status_default_is_offline() {
        assert_eq!(TargetStatus::default(), TargetStatus::Offline);
        assert!(!TargetStatus::default().is_online());
    }

    #[test]
    fn test_failed_result_has_zero_latency() {
        let result = ProbeResult::failed(
            TargetStatus::Error,
            String::new(),
            &ProbeFailure::Configuration,
        );

        assert_eq!(result.status, TargetStatus::Error);
        assert_eq!(result.response_time_ms, 0);
        assert_eq!(result.error.as_deref(), Some("invalid configuration"));
        assert!(result.status_code.is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let result = ProbeResult::responded(
            TargetStatus::Online,
            "https://example.com/health".to_string(),
            503,
            42,
        );

        let json = result.to_json().unwrap();
        assert!(json.contains("\"online\""));
        assert!(json.contains("503"));
        assert!(json.contains("\"error\": null"));
    }
}
