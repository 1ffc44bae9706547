//! # Dispatcher
//!
//! 消息分发模块。
//!
//! 负责：
//! - 按 URI scheme 构造目标 (`Registry`)
//! - Fan-out 到多个目标 (`MultiBroadcaster`)
//! - 汇总每个目标的失败，支持取消
//!
//! ## 使用示例
//!
//! ```ignore
//! let registry = Registry::with_defaults()?;
//! let multi = MultiBroadcaster::from_uris(&registry, &["null://", "log://"]).await?;
//! let id = multi.broadcast_message(&CancelToken::new(), &message).await?;
//! ```

pub mod metrics;
pub mod multi;
pub mod registry;
pub mod targets;

pub use contracts::{
    AggregateError, BroadcastConfig, BroadcastError, Broadcaster, CancelToken, DeliveryId,
    DispatchMode, Logger, Message,
};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use multi::{MultiBroadcaster, MultiBroadcasterBuilder};
pub use registry::{Constructor, Registry};
pub use targets::{
    register_defaults, FileBroadcaster, FileBroadcasterConfig, LogBroadcaster, NullBroadcaster,
    UdpBroadcaster, UdpBroadcasterConfig, WireFormat,
};
