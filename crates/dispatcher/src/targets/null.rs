//! NullBroadcaster - accepts every message and delivers nowhere

use std::sync::Arc;

use async_trait::async_trait;
use contracts::{BroadcastError, Broadcaster, CancelToken, DeliveryId, Logger, Message};
use url::Url;

pub(crate) const SCHEME: &str = "null";

pub(crate) async fn construct(_uri: Url) -> Result<Arc<dyn Broadcaster>, BroadcastError> {
    Ok(Arc::new(NullBroadcaster::new()))
}

/// Target that discards messages, returning a `Null` identifier
#[derive(Debug, Default)]
pub struct NullBroadcaster;

impl NullBroadcaster {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Broadcaster for NullBroadcaster {
    fn name(&self) -> &str {
        SCHEME
    }

    async fn broadcast_message(
        &self,
        _cancel: &CancelToken,
        _message: &Message,
    ) -> Result<DeliveryId, BroadcastError> {
        Ok(DeliveryId::Null)
    }

    async fn set_logger(&self, _cancel: &CancelToken, _logger: Logger) -> Result<(), BroadcastError> {
        // Nothing is ever logged
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_broadcaster_returns_null() {
        let broadcaster = NullBroadcaster::new();
        let id = broadcaster
            .broadcast_message(&CancelToken::new(), &Message::new("t", "b"))
            .await
            .unwrap();
        assert!(id.is_null());
        assert_eq!(broadcaster.name(), "null");
    }
}
