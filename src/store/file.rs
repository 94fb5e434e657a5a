//! 文件目标存储
//!
//! 在内存存储之上，每次写操作先把全部目标以JSON形式落盘，成功后才对读取可见

use super::{MemoryTargetStore, StoreResult, TargetStore};
use crate::error::StoreError;
use crate::target::MonitoredTarget;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 文件目标存储
#[derive(Debug)]
pub struct FileTargetStore {
    /// 存储文件路径
    path: PathBuf,
    /// 内存中的目标
    inner: MemoryTargetStore,
    /// 串行化落盘操作
    write_lock: Mutex<()>,
}

impl FileTargetStore {
    /// 打开存储文件，文件不存在时视为空存储
    ///
    /// # 参数
    /// * `path` - 存储文件路径
    ///
    /// # 返回
    /// * `StoreResult<Self>` - 存储实例
    pub async fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let targets: Vec<MonitoredTarget> = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!("加载目标存储: {}，目标数量: {}", path.display(), targets.len());

        Ok(Self {
            path,
            inner: MemoryTargetStore::with_targets(targets),
            write_lock: Mutex::new(()),
        })
    }

    /// 获取存储文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 把目标列表写入文件（先写临时文件再重命名）
    ///
    /// 调用方需持有 `write_lock`。
    async fn write_file(&self, targets: &[MonitoredTarget]) -> StoreResult<()> {
        let json_data = serde_json::to_string_pretty(targets)?;

        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json_data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!("目标存储已写入: {}", self.path.display());
        Ok(())
    }

    /// 落盘成功后再替换内存中的目标，失败时内存保持原状
    async fn commit(&self, targets: Vec<MonitoredTarget>) -> StoreResult<()> {
        if let Err(e) = self.write_file(&targets).await {
            warn!("目标存储写入失败，保留原有数据 {}: {}", self.path.display(), e);
            return Err(e);
        }
        self.inner.replace(targets).await;
        Ok(())
    }
}

#[async_trait]
impl TargetStore for FileTargetStore {
    async fn list(&self) -> StoreResult<Vec<MonitoredTarget>> {
        self.inner.list().await
    }

    async fn get(&self, id: &Uuid) -> StoreResult<Option<MonitoredTarget>> {
        self.inner.get(id).await
    }

    async fn insert(&self, target: MonitoredTarget) -> StoreResult<MonitoredTarget> {
        let _guard = self.write_lock.lock().await;
        let mut targets = self.inner.snapshot().await;
        targets.push(target.clone());
        self.commit(targets).await?;
        Ok(target)
    }

    async fn save(&self, target: &MonitoredTarget) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut targets = self.inner.snapshot().await;
        let existing = targets
            .iter_mut()
            .find(|t| t.id == target.id)
            .ok_or(StoreError::NotFound(target.id))?;
        *existing = target.clone();
        self.commit(targets).await
    }

    async fn delete(&self, id: &Uuid) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut targets = self.inner.snapshot().await;
        let before = targets.len();
        targets.retain(|t| t.id != *id);
        if targets.len() == before {
            return Ok(false);
        }
        self.commit(targets).await?;
        Ok(true)
    }
}
