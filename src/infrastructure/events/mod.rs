//! Events - 流水线进度事件

mod publisher;

pub use publisher::{BookEvent, EventPublisher};
