//! 内存目标存储

use super::{StoreResult, TargetStore};
use crate::error::StoreError;
use crate::target::MonitoredTarget;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 内存目标存储，保持登记顺序
#[derive(Debug, Clone, Default)]
pub struct MemoryTargetStore {
    /// 目标列表
    targets: Arc<RwLock<Vec<MonitoredTarget>>>,
}

impl MemoryTargetStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有目标创建存储
    pub fn with_targets(targets: Vec<MonitoredTarget>) -> Self {
        Self {
            targets: Arc::new(RwLock::new(targets)),
        }
    }

    /// 获取当前全部目标的快照（不经过异步trait）
    pub(crate) async fn snapshot(&self) -> Vec<MonitoredTarget> {
        self.targets.read().await.clone()
    }

    /// 整体替换全部目标
    pub(crate) async fn replace(&self, targets: Vec<MonitoredTarget>) {
        *self.targets.write().await = targets;
    }
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn list(&self) -> StoreResult<Vec<MonitoredTarget>> {
        Ok(self.snapshot().await)
    }

    async fn get(&self, id: &Uuid) -> StoreResult<Option<MonitoredTarget>> {
        let targets = self.targets.read().await;
        Ok(targets.iter().find(|t| t.id == *id).cloned())
    }

    async fn insert(&self, target: MonitoredTarget) -> StoreResult<MonitoredTarget> {
        let mut targets = self.targets.write().await;
        targets.push(target.clone());
        Ok(target)
    }

    async fn save(&self, target: &MonitoredTarget) -> StoreResult<()> {
        let mut targets = self.targets.write().await;
        match targets.iter_mut().find(|t| t.id == target.id) {
            Some(existing) => {
                *existing = target.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(target.id)),
        }
    }

    async fn delete(&self, id: &Uuid) -> StoreResult<bool> {
        let mut targets = self.targets.write().await;
        let before = targets.len();
        targets.retain(|t| t.id != *id);
        Ok(targets.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::result::TargetStatus;

    fn target(title: &str) -> MonitoredTarget {
        MonitoredTarget::new(title.to_string(), format!("{title}.example.com"), None)
    }

    #[tokio::test]
    async fn test_insert_preserves_order() {
        let store = MemoryTargetStore::new();
        store.insert(target("a")).await.unwrap();
        store.insert(target("b")).await.unwrap();
        store.insert(target("c")).await.unwrap();

        let titles: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_save_replaces_full_record() {
        let store = MemoryTargetStore::new();
        let mut stored = store.insert(target("a")).await.unwrap();

        stored.status = TargetStatus::Online;
        stored.response_time_ms = Some(8);
        store.save(&stored).await.unwrap();

        let loaded = store.get(&stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TargetStatus::Online);
        assert_eq!(loaded.response_time_ms, Some(8));
    }

    #[tokio::test]
    async fn test_save_after_delete_is_not_found() {
        let store = MemoryTargetStore::new();
        let stored = store.insert(target("a")).await.unwrap();

        assert!(store.delete(&stored.id).await.unwrap());
        assert!(!store.delete(&stored.id).await.unwrap());

        let result = store.save(&stored).await;
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == stored.id));
        assert!(store.get(&stored.id).await.unwrap().is_none());
    }
}
