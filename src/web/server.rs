//! Web服务器实现
//!
//! 提供HTTP服务器和路由管理

use super::{auth, handlers, ws, AppState};
use crate::config::WebConfig;
use crate::error::{Result, ServerPulseError};
use crate::health::scheduler::SweepScheduler;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// 创建路由
///
/// `/health` 不需要认证，其余路由在配置了API密钥时需要认证。
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/servers",
            get(handlers::list_servers).post(handlers::create_server),
        )
        .route("/api/servers/check-all", post(handlers::check_all_servers))
        .route(
            "/api/servers/{id}",
            get(handlers::get_server)
                .put(handlers::update_server)
                .delete(handlers::delete_server),
        )
        .route("/api/servers/{id}/check", post(handlers::check_server))
        .route("/ws", get(ws::ws_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http());

    if state.config.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

/// Web服务器
pub struct WebServer {
    /// 配置
    config: WebConfig,
    /// 巡检调度器
    scheduler: Arc<SweepScheduler>,
    /// 关闭信号接收器
    shutdown_rx: Option<broadcast::Receiver<()>>,
}

impl WebServer {
    /// 创建新的Web服务器
    pub fn new(
        config: WebConfig,
        scheduler: Arc<SweepScheduler>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            scheduler,
            shutdown_rx: Some(shutdown_rx),
        }
    }

    /// 监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| {
                ServerPulseError::Other(anyhow::anyhow!(
                    "无效的监听地址 {}:{}: {}",
                    self.config.bind_address,
                    self.config.port,
                    e
                ))
            })
    }

    /// 启动Web服务器，收到关闭信号后优雅退出
    pub async fn start(&mut self) -> Result<()> {
        if !self.config.enabled {
            info!("Web服务器已禁用");
            return Ok(());
        }

        let addr = self.socket_addr()?;
        let mut shutdown_rx = self.shutdown_rx.take().ok_or_else(|| {
            ServerPulseError::Other(anyhow::anyhow!("关闭信号接收器已被使用"))
        })?;

        let state = AppState::new(Arc::clone(&self.scheduler), self.config.clone());
        let router = build_router(state);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Web服务器已启动: http://{}", addr);
        info!("实时推送地址: ws://{}/ws", addr);
        if self.config.api_key.is_some() {
            info!("API密钥认证已启用");
        }

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("接收到关闭信号，正在关闭Web服务器...");
            })
            .await?;

        info!("Web服务器已关闭");
        Ok(())
    }
}
