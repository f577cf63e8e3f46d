//! Event Publisher Implementation
//!
//! 流水线进度事件推送（WebSocket 转发）

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::domain::book::BookStatus;

const CHANNEL_CAPACITY: usize = 256;

/// 流水线事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum BookEvent {
    /// Book 状态变更
    BookStatusChanged {
        book_id: String,
        status: BookStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// 片段合成完成
    SegmentSynthesized {
        book_id: String,
        segment_id: String,
        duration: f64,
    },
    /// 片段合成失败（重试耗尽）
    SegmentFailed {
        book_id: String,
        segment_id: String,
        error: String,
    },
}

impl BookEvent {
    pub fn book_id(&self) -> &str {
        match self {
            BookEvent::BookStatusChanged { book_id, .. }
            | BookEvent::SegmentSynthesized { book_id, .. }
            | BookEvent::SegmentFailed { book_id, .. } => book_id,
        }
    }
}

/// 事件发布器
///
/// 每个事件同时发往全局通道和该书的专属通道（若有人订阅）
pub struct EventPublisher {
    /// book_id -> broadcast sender
    book_channels: DashMap<String, broadcast::Sender<BookEvent>>,
    global_channel: broadcast::Sender<BookEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            book_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅所有书的事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<BookEvent> {
        self.global_channel.subscribe()
    }

    /// 订阅单本书的事件
    pub fn subscribe_book(&self, book_id: &str) -> broadcast::Receiver<BookEvent> {
        self.book_channels
            .entry(book_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// 清理没有订阅者的书通道
    pub fn prune(&self) {
        self.book_channels
            .retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn publish_status_changed(&self, book_id: &str, status: BookStatus, error: Option<&str>) {
        self.publish(BookEvent::BookStatusChanged {
            book_id: book_id.to_string(),
            status,
            error: error.map(str::to_string),
        });
    }

    pub fn publish_segment_synthesized(&self, book_id: &str, segment_id: &str, duration: f64) {
        self.publish(BookEvent::SegmentSynthesized {
            book_id: book_id.to_string(),
            segment_id: segment_id.to_string(),
            duration,
        });
    }

    pub fn publish_segment_failed(&self, book_id: &str, segment_id: &str, error: &str) {
        self.publish(BookEvent::SegmentFailed {
            book_id: book_id.to_string(),
            segment_id: segment_id.to_string(),
            error: error.to_string(),
        });
    }

    fn publish(&self, event: BookEvent) {
        if let Some(sender) = self.book_channels.get(event.book_id()) {
            if let Err(e) = sender.send(event.clone()) {
                tracing::debug!(
                    book_id = %event.book_id(),
                    error = %e,
                    "Failed to publish book event (no receivers)"
                );
            }
        }
        if let Err(e) = self.global_channel.send(event) {
            tracing::trace!(error = %e, "Failed to publish global event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_global_and_book_subscribers() {
        let publisher = EventPublisher::new();
        let mut global = publisher.subscribe_global();
        let mut book = publisher.subscribe_book("b1");
        let mut other = publisher.subscribe_book("b2");

        publisher.publish_segment_synthesized("b1", "0001-000000", 1.5);

        let expected = BookEvent::SegmentSynthesized {
            book_id: "b1".to_string(),
            segment_id: "0001-000000".to_string(),
            duration: 1.5,
        };
        assert_eq!(global.recv().await.unwrap(), expected);
        assert_eq!(book.recv().await.unwrap(), expected);
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_event_serialization() {
        let event = BookEvent::BookStatusChanged {
            book_id: "b1".to_string(),
            status: BookStatus::Synthesizing,
            error: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "BookStatusChanged");
        assert_eq!(json["data"]["status"], "synthesizing");
        assert!(json["data"].get("error").is_none());
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let publisher = EventPublisher::new();
        publisher.publish_segment_failed("b1", "s1", "boom");

        let rx = publisher.subscribe_book("b1");
        drop(rx);
        publisher.prune();
        publisher.publish_status_changed("b1", BookStatus::Error, Some("boom"));
    }
}
