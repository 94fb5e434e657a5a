//! Web接口模块
//!
//! 提供目标管理API、按需检测API和巡检结果的WebSocket推送

use crate::config::WebConfig;
use crate::error::{CheckError, StoreError};
use crate::health::scheduler::SweepScheduler;
use crate::store::TargetStore;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{build_router, WebServer};

/// 目标不存在时的响应消息
pub const SERVER_NOT_FOUND: &str = "Server not found";

/// Web服务器状态
#[derive(Clone)]
pub struct AppState {
    /// 巡检调度器
    pub scheduler: Arc<SweepScheduler>,
    /// Web配置
    pub config: WebConfig,
    /// 启动时间
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// 创建新的Web服务器状态
    pub fn new(scheduler: Arc<SweepScheduler>, config: WebConfig) -> Self {
        Self {
            scheduler,
            config,
            start_time: chrono::Utc::now(),
        }
    }

    /// 目标存储
    pub fn store(&self) -> &Arc<dyn TargetStore> {
        self.scheduler.orchestrator().store()
    }
}

/// API错误类型
///
/// 统一渲染为 `{"message": ...}`。
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "message": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound(SERVER_NOT_FOUND.to_string()),
            other => {
                error!("目标存储访问失败: {}", other);
                AppError::Internal(other.to_string())
            }
        }
    }
}

impl From<CheckError> for AppError {
    fn from(err: CheckError) -> Self {
        match err {
            CheckError::NotFound(_) => AppError::NotFound(SERVER_NOT_FOUND.to_string()),
            CheckError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_check_not_found_maps_to_404() {
        let error: AppError = CheckError::NotFound(Uuid::new_v4()).into();
        assert!(matches!(error, AppError::NotFound(ref msg) if msg == SERVER_NOT_FOUND));
    }

    #[test]
    fn test_store_failure_maps_to_500() {
        let error: AppError = StoreError::Unavailable("disk gone".to_string()).into();
        assert_eq!(error.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
