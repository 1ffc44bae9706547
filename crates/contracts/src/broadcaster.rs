//! Broadcaster trait - delivery target interface
//!
//! Defines the abstract interface every delivery target implements.

use async_trait::async_trait;

use crate::{BroadcastError, CancelToken, DeliveryId, Logger, Message};

/// Delivery target trait
///
/// All target implementations, and the multi-target dispatcher itself,
/// implement this trait. Implementations are shared across tasks, so both
/// operations take `&self`; mutable state lives behind interior locks.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Target name (used to attribute failures in logs and aggregate errors)
    fn name(&self) -> &str;

    /// Deliver `message` to this target
    ///
    /// Long-running work must observe `cancel` and return promptly once it fires.
    ///
    /// # Errors
    /// Returns the underlying cause; the dispatcher tags it with [`Broadcaster::name`].
    async fn broadcast_message(
        &self,
        cancel: &CancelToken,
        message: &Message,
    ) -> Result<DeliveryId, BroadcastError>;

    /// Replace the logging sink used by this target
    ///
    /// Calls already in flight may keep the previous logger.
    async fn set_logger(&self, cancel: &CancelToken, logger: Logger) -> Result<(), BroadcastError>;
}
