//! 目标存储模块
//!
//! 定义目标存储接口以及内存、文件两种实现

pub mod file;
pub mod memory;

use crate::error::StoreError;
use crate::target::MonitoredTarget;
use async_trait::async_trait;
use uuid::Uuid;

// 重新导出主要类型
pub use file::FileTargetStore;
pub use memory::MemoryTargetStore;

/// 存储操作结果类型
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 目标存储trait
///
/// 引擎把存储视为唯一可信来源，不做任何缓存。
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// 列出全部目标（按登记顺序）
    async fn list(&self) -> StoreResult<Vec<MonitoredTarget>>;

    /// 按ID获取目标
    async fn get(&self, id: &Uuid) -> StoreResult<Option<MonitoredTarget>>;

    /// 登记新目标
    async fn insert(&self, target: MonitoredTarget) -> StoreResult<MonitoredTarget>;

    /// 整条记录写回已存在的目标
    ///
    /// 目标已被删除时返回 `StoreError::NotFound`。
    async fn save(&self, target: &MonitoredTarget) -> StoreResult<()>;

    /// 删除目标，返回是否确实删除
    async fn delete(&self, id: &Uuid) -> StoreResult<bool>;
}
