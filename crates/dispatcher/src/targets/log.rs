//! LogBroadcaster - logs message summaries via tracing

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use contracts::{BroadcastError, Broadcaster, CancelToken, DeliveryId, Logger, Message};
use parking_lot::RwLock;
use tracing::{info, instrument};
use url::Url;

pub(crate) const SCHEME: &str = "log";

pub(crate) async fn construct(uri: Url) -> Result<Arc<dyn Broadcaster>, BroadcastError> {
    Ok(Arc::new(LogBroadcaster::from_uri(&uri)))
}

/// Target that writes each message to its logger
///
/// Returns the delivery time in unix seconds as the identifier.
pub struct LogBroadcaster {
    name: String,
    logger: RwLock<Logger>,
}

impl LogBroadcaster {
    /// Create a new LogBroadcaster with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logger: RwLock::new(Logger::default()),
        }
    }

    /// Create from `log://[?name=<label>]`
    pub fn from_uri(uri: &Url) -> Self {
        let name = uri
            .query_pairs()
            .find(|(key, _)| key == "name")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_else(|| SCHEME.to_string());
        Self::new(name)
    }

    /// Name of the logger currently in use
    pub fn logger_name(&self) -> String {
        self.logger.read().name().to_string()
    }

    fn log_message_summary(&self, message: &Message) {
        let logger = self.logger.read().clone();
        logger.in_scope(|| {
            info!(
                target: "broadcast",
                broadcaster = %self.name,
                title = message.title(),
                images = message.images().len(),
                "{}",
                message.body()
            );
        });
    }
}

#[async_trait]
impl Broadcaster for LogBroadcaster {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_broadcaster_broadcast", skip_all, fields(broadcaster = %self.name))]
    async fn broadcast_message(
        &self,
        _cancel: &CancelToken,
        message: &Message,
    ) -> Result<DeliveryId, BroadcastError> {
        self.log_message_summary(message);
        Ok(DeliveryId::int(Utc::now().timestamp()))
    }

    async fn set_logger(&self, _cancel: &CancelToken, logger: Logger) -> Result<(), BroadcastError> {
        *self.logger.write() = logger;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ScalarId;

    #[tokio::test]
    async fn test_log_broadcaster_returns_timestamp() {
        let before = Utc::now().timestamp();
        let broadcaster = LogBroadcaster::new("test_log");

        let id = broadcaster
            .broadcast_message(&CancelToken::new(), &Message::new("title", "hello"))
            .await
            .unwrap();

        let DeliveryId::Scalar(ScalarId::Int(ts)) = id else {
            panic!("expected integer id, got {id:?}");
        };
        assert!(ts >= before);
    }

    #[tokio::test]
    async fn test_log_broadcaster_name_from_query() {
        let uri = Url::parse("log://?name=audit").unwrap();
        assert_eq!(LogBroadcaster::from_uri(&uri).name(), "audit");

        let uri = Url::parse("log://").unwrap();
        assert_eq!(LogBroadcaster::from_uri(&uri).name(), "log");
    }

    #[tokio::test]
    async fn test_set_logger_replaces_sink() {
        let broadcaster = LogBroadcaster::new("test_log");
        broadcaster
            .set_logger(&CancelToken::new(), Logger::none("quiet"))
            .await
            .unwrap();

        assert_eq!(broadcaster.logger_name(), "quiet");
        broadcaster
            .broadcast_message(&CancelToken::new(), &Message::new("t", "discarded"))
            .await
            .unwrap();
    }
}
