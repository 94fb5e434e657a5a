//! 巡检结果广播
//!
//! 把每次定时巡检的结果批次推送给实时订阅者

use crate::health::sweep::SweepEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// 巡检结果事件名称
pub const HEALTH_CHECK_RESULTS_EVENT: &str = "healthCheckResults";

/// 默认的广播缓冲区大小
const DEFAULT_CAPACITY: usize = 16;

/// 一次定时巡检完成后推送的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    /// 事件名称
    pub event: String,
    /// 巡检完成时间
    pub completed_at: DateTime<Utc>,
    /// 按目标顺序排列的观测
    pub results: Vec<SweepEntry>,
}

impl SweepEvent {
    /// 用巡检结果创建事件
    pub fn new(results: Vec<SweepEntry>) -> Self {
        Self {
            event: HEALTH_CHECK_RESULTS_EVENT.to_string(),
            completed_at: Utc::now(),
            results,
        }
    }
}

/// 结果广播器
///
/// 至多一次投递：没有订阅者时事件直接丢弃。
#[derive(Debug, Clone)]
pub struct ResultBroadcaster {
    /// 广播发送端
    sender: broadcast::Sender<SweepEvent>,
}

impl ResultBroadcaster {
    /// 创建默认容量的广播器
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// 创建指定容量的广播器
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 订阅巡检结果
    pub fn subscribe(&self) -> broadcast::Receiver<SweepEvent> {
        self.sender.subscribe()
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// 推送一次巡检结果，返回收到事件的订阅者数量
    pub fn publish(&self, event: SweepEvent) -> usize {
        let size = event.results.len();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!("巡检结果已推送给 {} 个订阅者，目标数量: {}", receivers, size);
                receivers
            }
            Err(_) => {
                debug!("没有订阅者，跳过巡检结果推送");
                0
            }
        }
    }
}

impl Default for ResultBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let broadcaster = ResultBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(broadcaster.publish(SweepEvent::new(Vec::new())), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let broadcaster = ResultBroadcaster::new();
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        assert_eq!(broadcaster.publish(SweepEvent::new(Vec::new())), 2);

        let a = first.recv().await.unwrap();
        let b = second.recv().await.unwrap();
        assert_eq!(a.event, HEALTH_CHECK_RESULTS_EVENT);
        assert_eq!(a, b);
    }

    #[test]
    fn test_lagging_subscriber_skips_old_events() {
        let broadcaster = ResultBroadcaster::with_capacity(1);
        let mut receiver = broadcaster.subscribe();

        broadcaster.publish(SweepEvent::new(Vec::new()));
        let latest = SweepEvent::new(Vec::new());
        broadcaster.publish(latest.clone());

        tokio_test::block_on(async {
            assert!(matches!(
                receiver.recv().await,
                Err(broadcast::error::RecvError::Lagged(1))
            ));
            assert_eq!(receiver.recv().await.unwrap(), latest);
        });
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&SweepEvent::new(Vec::new())).unwrap();
        assert!(json.contains("\"event\":\"healthCheckResults\""));
        assert!(json.contains("\"results\":[]"));
    }
}
