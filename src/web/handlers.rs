//! Web 路由处理函数
//!
//! 目标的增删改查、按需检测以及自身存活检查

use super::{AppError, AppState, SERVER_NOT_FOUND};
use crate::health::scheduler::{Scheduler, SchedulerStatus};
use crate::logging::LoggingSystem;
use crate::target::MonitoredTarget;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 删除目标成功时的响应消息
pub const SERVER_DELETED_MESSAGE: &str = "Server deleted successfully";

/// 批量检测完成时的响应消息
pub const CHECK_ALL_MESSAGE: &str = "All servers checked successfully";

/// 创建目标请求
#[derive(Debug, Deserialize)]
pub struct CreateServerRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub endpoint: Option<String>,
}

/// 更新目标请求，未提供的字段保持不变
#[derive(Debug, Deserialize)]
pub struct UpdateServerRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    /// 空字符串表示清除子路径
    pub endpoint: Option<String>,
}

/// 简单消息响应
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// 批量检测响应
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckAllResponse {
    pub message: String,
    /// 检测的目标数量
    pub checked: usize,
    /// 在线的目标数量
    pub online: usize,
}

/// 存活检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 版本信息
    pub version: String,
    /// 运行时间
    pub uptime_seconds: u64,
    /// 调度器状态
    pub scheduler: SchedulerStatus,
}

/// 解析路径中的目标ID，格式不合法视为目标不存在
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(SERVER_NOT_FOUND.to_string()))
}

/// 必填字段去除首尾空白后不能为空
fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::BadRequest(format!("{field} is required"))),
    }
}

/// 子路径为空时视为未设置
fn optional_endpoint(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 列出所有目标
pub async fn list_servers(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonitoredTarget>>, AppError> {
    Ok(Json(state.store().list().await?))
}

/// 获取单个目标
pub async fn get_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MonitoredTarget>, AppError> {
    let id = parse_id(&id)?;
    state
        .store()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(SERVER_NOT_FOUND.to_string()))
}

/// 创建目标
pub async fn create_server(
    State(state): State<AppState>,
    Json(payload): Json<CreateServerRequest>,
) -> Result<(StatusCode, Json<MonitoredTarget>), AppError> {
    let title = required("title", payload.title)?;
    let url = required("url", payload.url)?;

    let target = MonitoredTarget::new(title, url, optional_endpoint(payload.endpoint));
    let target = state.store().insert(target).await?;

    LoggingSystem::audit_log("create", &target.id, Some(&target.title));
    Ok((StatusCode::CREATED, Json(target)))
}

/// 更新目标的名称或地址
pub async fn update_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateServerRequest>,
) -> Result<Json<MonitoredTarget>, AppError> {
    let id = parse_id(&id)?;
    let mut target = state
        .store()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(SERVER_NOT_FOUND.to_string()))?;

    if payload.title.is_some() {
        target.title = required("title", payload.title)?;
    }
    if payload.url.is_some() {
        target.url = required("url", payload.url)?;
    }
    if payload.endpoint.is_some() {
        target.endpoint = optional_endpoint(payload.endpoint);
    }
    target.updated_at = chrono::Utc::now();

    state.store().save(&target).await?;

    LoggingSystem::audit_log("update", &target.id, Some(&target.title));
    Ok(Json(target))
}

/// 删除目标
pub async fn delete_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    if !state.store().delete(&id).await? {
        return Err(AppError::NotFound(SERVER_NOT_FOUND.to_string()));
    }

    LoggingSystem::audit_log("delete", &id, None);
    Ok(Json(MessageResponse {
        message: SERVER_DELETED_MESSAGE.to_string(),
    }))
}

/// 立即检测单个目标并返回更新后的记录
pub async fn check_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MonitoredTarget>, AppError> {
    let id = parse_id(&id)?;
    let target = state.scheduler.check_one(&id).await?;
    Ok(Json(target))
}

/// 并发检测全部目标，所有探测结束后才返回
pub async fn check_all_servers(
    State(state): State<AppState>,
) -> Result<Json<CheckAllResponse>, AppError> {
    let summary = state.scheduler.check_all().await?;
    Ok(Json(CheckAllResponse {
        message: CHECK_ALL_MESSAGE.to_string(),
        checked: summary.total,
        online: summary.online,
    }))
}

/// 监控程序自身的存活检查
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now() - state.start_time;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        scheduler: state.scheduler.get_status().await,
    })
}
