//! FileBroadcaster - appends messages to a local spool directory

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use contracts::{BroadcastError, Broadcaster, CancelToken, DeliveryId, Logger, Message};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, instrument};
use url::Url;

pub(crate) const SCHEME: &str = "file";

const MESSAGES_FILE: &str = "messages.jsonl";
const IMAGES_DIR: &str = "images";

pub(crate) async fn construct(uri: Url) -> Result<Arc<dyn Broadcaster>, BroadcastError> {
    Ok(Arc::new(FileBroadcaster::from_uri(&uri)?))
}

/// Configuration for FileBroadcaster
#[derive(Debug, Clone)]
pub struct FileBroadcasterConfig {
    /// Spool directory
    pub base_path: PathBuf,
}

impl FileBroadcasterConfig {
    /// Create config from `file:///<dir>`
    pub fn from_uri(uri: &Url) -> Result<Self, String> {
        let base_path = uri
            .to_file_path()
            .map_err(|_| "expected an absolute local path".to_string())?;
        Ok(Self { base_path })
    }
}

/// One line of `messages.jsonl`
#[derive(Serialize)]
struct MessageRecord<'a> {
    id: &'a str,
    delivered_at: String,
    title: &'a str,
    body: &'a str,
    images: Vec<String>,
}

/// Target that stores each message as a JSON line plus PNG attachments
pub struct FileBroadcaster {
    name: String,
    config: FileBroadcasterConfig,
    sequence: AtomicU64,
    /// Serializes appends to the messages file
    write_lock: Mutex<()>,
    logger: RwLock<Logger>,
}

impl FileBroadcaster {
    /// Create a new FileBroadcaster, creating the spool directory
    pub fn new(name: impl Into<String>, config: FileBroadcasterConfig) -> std::io::Result<Self> {
        fs::create_dir_all(config.base_path.join(IMAGES_DIR))?;

        Ok(Self {
            name: name.into(),
            config,
            sequence: AtomicU64::new(0),
            write_lock: Mutex::new(()),
            logger: RwLock::new(Logger::default()),
        })
    }

    /// Create from URI (for registry)
    pub fn from_uri(uri: &Url) -> Result<Self, BroadcastError> {
        let config = FileBroadcasterConfig::from_uri(uri)
            .map_err(|e| BroadcastError::construction(uri.as_str(), e))?;

        Self::new(SCHEME, config).map_err(|e| {
            BroadcastError::construction_with(uri.as_str(), "cannot create spool directory", e)
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    fn next_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", Utc::now().timestamp_millis(), seq)
    }

    fn save_images(&self, id: &str, message: &Message) -> std::io::Result<Vec<String>> {
        let mut names = Vec::with_capacity(message.images().len());
        for (idx, image) in message.images().iter().enumerate() {
            let filename = format!("{id}-{idx}.png");
            let path = self.config.base_path.join(IMAGES_DIR).join(&filename);
            image.save(&path).map_err(std::io::Error::other)?;
            names.push(filename);
        }
        Ok(names)
    }

    fn append_record(&self, record: &MessageRecord<'_>) -> std::io::Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let _guard = self.write_lock.lock();
        let mut file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.config.base_path.join(MESSAGES_FILE))?;
        writeln!(file, "{line}")
    }

    fn persist_message(&self, message: &Message) -> Result<String, BroadcastError> {
        let id = self.next_id();
        let images = self.save_images(&id, message)?;

        let record = MessageRecord {
            id: &id,
            delivered_at: Utc::now().to_rfc3339(),
            title: message.title(),
            body: message.body(),
            images,
        };
        self.append_record(&record)?;
        Ok(id)
    }
}

#[async_trait]
impl Broadcaster for FileBroadcaster {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_broadcaster_broadcast",
        skip_all,
        fields(path = %self.config.base_path.display())
    )]
    async fn broadcast_message(
        &self,
        cancel: &CancelToken,
        message: &Message,
    ) -> Result<DeliveryId, BroadcastError> {
        if cancel.is_cancelled() {
            return Err(BroadcastError::Other("broadcast cancelled".to_string()));
        }

        let logger = self.logger.read().clone();
        match self.persist_message(message) {
            Ok(id) => {
                logger.in_scope(|| debug!(broadcaster = %self.name, id = %id, "Message stored"));
                Ok(DeliveryId::text(id))
            }
            Err(e) => {
                logger.in_scope(|| error!(broadcaster = %self.name, error = %e, "Write failed"));
                Err(e)
            }
        }
    }

    async fn set_logger(&self, _cancel: &CancelToken, logger: Logger) -> Result<(), BroadcastError> {
        *self.logger.write() = logger;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_broadcaster_write() {
        let dir = tempdir().unwrap();
        let config = FileBroadcasterConfig {
            base_path: dir.path().to_path_buf(),
        };
        let broadcaster = FileBroadcaster::new("test_file", config).unwrap();

        let message = Message::new("title", "body")
            .with_image(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        let id = broadcaster
            .broadcast_message(&CancelToken::new(), &message)
            .await
            .unwrap();

        let content = fs::read_to_string(dir.path().join(MESSAGES_FILE)).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 1);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["id"], id.render());
        assert_eq!(record["body"], "body");

        let images: Vec<_> = fs::read_dir(dir.path().join(IMAGES_DIR)).unwrap().collect();
        assert_eq!(images.len(), 1);
    }

    #[tokio::test]
    async fn test_file_broadcaster_ids_are_unique() {
        let dir = tempdir().unwrap();
        let uri = Url::from_directory_path(dir.path()).unwrap();
        let broadcaster = FileBroadcaster::from_uri(&uri).unwrap();

        let first = broadcaster
            .broadcast_message(&CancelToken::new(), &Message::new("a", "1"))
            .await
            .unwrap();
        let second = broadcaster
            .broadcast_message(&CancelToken::new(), &Message::new("b", "2"))
            .await
            .unwrap();

        assert_ne!(first, second);
        let content = fs::read_to_string(dir.path().join(MESSAGES_FILE)).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_file_broadcaster_skips_when_cancelled() {
        let dir = tempdir().unwrap();
        let config = FileBroadcasterConfig {
            base_path: dir.path().to_path_buf(),
        };
        let broadcaster = FileBroadcaster::new("test_file", config).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let result = broadcaster
            .broadcast_message(&cancel, &Message::new("t", "b"))
            .await;

        assert!(result.is_err());
        assert!(!dir.path().join(MESSAGES_FILE).exists());
    }
}
