//! 应用程序组装
//!
//! 组装存储、探测器、编排器和调度器，并管理服务的启动与关闭

use crate::broadcast::ResultBroadcaster;
use crate::config::{Config, StoreBackend, StoreConfig, TargetSeed};
use crate::health::checker::{HttpProber, TlsTrust};
use crate::health::scheduler::{Scheduler, SweepScheduler};
use crate::health::sweep::SweepOrchestrator;
use crate::store::{FileTargetStore, MemoryTargetStore, TargetStore};
use crate::target::MonitoredTarget;
use crate::web::WebServer;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// 服务组件集合
pub struct ServiceComponents {
    /// 目标存储
    pub store: Arc<dyn TargetStore>,
    /// 巡检调度器
    pub scheduler: Arc<SweepScheduler>,
}

/// 按配置打开目标存储
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn TargetStore>> {
    match config.backend {
        StoreBackend::File => {
            let store = FileTargetStore::open(&config.path)
                .await
                .with_context(|| format!("打开目标存储失败: {}", config.path.display()))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("使用内存目标存储，进程退出后数据将丢失");
            Ok(Arc::new(MemoryTargetStore::new()))
        }
    }
}

/// 写入配置文件中声明的初始目标
///
/// 已存在相同地址的目标会被跳过，返回新写入的数量。
pub async fn seed_targets(store: &dyn TargetStore, seeds: &[TargetSeed]) -> Result<usize> {
    let existing = store.list().await.context("读取目标列表失败")?;
    let mut inserted = 0;

    for seed in seeds {
        let endpoint = seed.endpoint.as_deref();
        if existing
            .iter()
            .any(|target| target.same_address(&seed.url, endpoint))
        {
            continue;
        }

        let target = MonitoredTarget::new(
            seed.title.clone(),
            seed.url.clone(),
            seed.endpoint.clone(),
        );
        store
            .insert(target)
            .await
            .with_context(|| format!("写入初始目标失败: {}", seed.title))?;
        inserted += 1;
    }

    if inserted > 0 {
        info!("已写入 {} 个初始目标", inserted);
    }
    Ok(inserted)
}

/// 初始化核心服务组件
pub async fn build_components(config: &Config) -> Result<ServiceComponents> {
    let store = open_store(&config.store).await?;
    seed_targets(store.as_ref(), &config.targets).await?;

    if config.probe.tls_trust == TlsTrust::AcceptInvalidCerts {
        warn!("TLS证书校验已关闭，探测将接受任何证书");
    }

    let prober = Arc::new(HttpProber::new(config.probe.client_options())?);
    let orchestrator = Arc::new(SweepOrchestrator::new(
        Arc::clone(&store),
        prober,
        config.probe.scheduled_profile(),
        config.probe.bulk_profile(),
    ));

    let scheduler = Arc::new(SweepScheduler::new(
        orchestrator,
        ResultBroadcaster::new(),
        config.global.schedule_settings(),
    ));

    Ok(ServiceComponents { store, scheduler })
}

/// 服务主逻辑
///
/// 启动调度器和Web服务器，收到关闭信号后依次停止。
pub async fn run_service(config: Config, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let components = build_components(&config).await?;
    let target_count = components.store.list().await.map(|t| t.len()).unwrap_or(0);
    info!("服务组件初始化完成，目标数量: {}", target_count);

    let web_server_handle = if config.web.enabled {
        let mut web_server = WebServer::new(
            config.web.clone(),
            Arc::clone(&components.scheduler),
            shutdown_rx.resubscribe(),
        );
        Some(tokio::spawn(async move {
            if let Err(e) = web_server.start().await {
                error!("Web 服务器运行失败: {}", e);
            }
        }))
    } else {
        info!("Web 接口已禁用");
        None
    };

    components
        .scheduler
        .start()
        .await
        .context("启动巡检调度器失败")?;

    info!("巡检服务已启动");

    // 等待关闭信号
    if let Err(err) = shutdown_rx.recv().await {
        error!("等待关闭信号失败: {}", err);
    }
    info!("收到关闭信号，正在停止服务...");

    components
        .scheduler
        .stop()
        .await
        .context("停止巡检调度器失败")?;

    if let Some(handle) = web_server_handle {
        if let Err(e) = handle.await {
            warn!("等待Web服务器退出失败: {}", e);
        }
    }

    info!("服务已停止");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed(title: &str, url: &str, endpoint: Option<&str>) -> TargetSeed {
        TargetSeed {
            title: title.to_string(),
            url: url.to_string(),
            endpoint: endpoint.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_seed_targets_skips_existing_addresses() {
        let store = MemoryTargetStore::new();
        let seeds = vec![
            seed("API", "api.internal", Some("/health")),
            seed("Docs", "docs.internal", None),
        ];

        assert_eq!(seed_targets(&store, &seeds).await.unwrap(), 2);
        // 第二次启动不会重复写入
        assert_eq!(seed_targets(&store, &seeds).await.unwrap(), 0);

        // 同一地址不同子路径视为不同目标
        let more = vec![seed("API v2", "api.internal", Some("/v2/health"))];
        assert_eq!(seed_targets(&store, &more).await.unwrap(), 1);
        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_build_components_with_file_store() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.store.path = dir.path().join("targets.json");
        config.targets = vec![seed("API", "api.internal", None)];

        let components = build_components(&config).await.unwrap();
        assert_eq!(components.store.list().await.unwrap().len(), 1);
        assert!(config.store.path.exists());
        assert!(!components.scheduler.get_status().await.is_running);
    }

    #[tokio::test]
    async fn test_run_service_stops_on_shutdown() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Memory;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_service(config, shutdown_rx));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
