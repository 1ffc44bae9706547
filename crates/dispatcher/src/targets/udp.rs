//! UdpBroadcaster - fire-and-forget datagram per message

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use contracts::{BroadcastError, Broadcaster, CancelToken, DeliveryId, Logger, Message};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};
use url::Url;

pub(crate) const SCHEME: &str = "udp";

pub(crate) async fn construct(uri: Url) -> Result<Arc<dyn Broadcaster>, BroadcastError> {
    Ok(Arc::new(UdpBroadcaster::from_uri(&uri).await?))
}

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Configuration for UdpBroadcaster
#[derive(Debug, Clone)]
pub struct UdpBroadcasterConfig {
    /// Target `host:port`
    pub addr: String,
    /// Serialization format
    pub format: WireFormat,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl UdpBroadcasterConfig {
    /// Create config from `udp://<host>:<port>[?format=json|bincode][&max_packet_size=N]`
    pub fn from_uri(uri: &Url) -> Result<Self, String> {
        let host = uri
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| "missing host".to_string())?;
        let port = uri.port().ok_or_else(|| "missing port".to_string())?;

        let mut format = WireFormat::default();
        let mut max_packet_size = 65000;
        for (key, value) in uri.query_pairs() {
            match (key.as_ref(), value.as_ref()) {
                ("format", "json") => format = WireFormat::Json,
                ("format", "bincode") => format = WireFormat::Bincode,
                ("format", other) => return Err(format!("unknown format '{other}'")),
                ("max_packet_size", size) => {
                    max_packet_size = size
                        .parse()
                        .map_err(|e| format!("invalid max_packet_size '{size}': {e}"))?;
                }
                _ => {}
            }
        }

        Ok(Self {
            addr: format!("{host}:{port}"),
            format,
            max_packet_size,
        })
    }
}

/// Datagram payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    pub sent_at_ms: i64,
    pub title: String,
    pub body: String,
    pub image_count: u32,
}

/// Target that sends each message as one UDP datagram
pub struct UdpBroadcaster {
    name: String,
    config: UdpBroadcasterConfig,
    socket: UdpSocket,
    sequence: AtomicU64,
    logger: RwLock<Logger>,
}

impl UdpBroadcaster {
    /// Create a new UdpBroadcaster connected to `config.addr`
    #[instrument(name = "udp_broadcaster_new", skip(name, config), fields(addr = %config.addr))]
    pub async fn new(name: impl Into<String>, config: UdpBroadcasterConfig) -> std::io::Result<Self> {
        let name = name.into();
        let target = tokio::net::lookup_host(&config.addr)
            .await?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no address for {}", config.addr)))?;

        // Local socket must share the target's address family
        let socket = UdpSocket::bind(unspecified_for(&target)).await?;
        socket.connect(target).await?;

        debug!(broadcaster = %name, target_addr = %config.addr, "UdpBroadcaster connected");

        Ok(Self {
            name,
            config,
            socket,
            sequence: AtomicU64::new(0),
            logger: RwLock::new(Logger::default()),
        })
    }

    /// Create from URI (for registry)
    pub async fn from_uri(uri: &Url) -> Result<Self, BroadcastError> {
        let config = UdpBroadcasterConfig::from_uri(uri)
            .map_err(|e| BroadcastError::construction(uri.as_str(), e))?;

        Self::new(SCHEME, config)
            .await
            .map_err(|e| BroadcastError::construction_with(uri.as_str(), "cannot open socket", e))
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, BroadcastError> {
        let data = match self.config.format {
            WireFormat::Json => {
                serde_json::to_vec(envelope).map_err(|e| BroadcastError::Other(format!("json error: {e}")))?
            }
            WireFormat::Bincode => bincode::serialize(envelope)
                .map_err(|e| BroadcastError::Other(format!("bincode error: {e}")))?,
        };

        if data.len() > self.config.max_packet_size {
            return Err(BroadcastError::Other(format!(
                "datagram of {} bytes exceeds max_packet_size {}",
                data.len(),
                self.config.max_packet_size
            )));
        }
        Ok(data)
    }
}

fn unspecified_for(target: &SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

#[async_trait]
impl Broadcaster for UdpBroadcaster {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "udp_broadcaster_broadcast", skip_all, fields(addr = %self.config.addr))]
    async fn broadcast_message(
        &self,
        cancel: &CancelToken,
        message: &Message,
    ) -> Result<DeliveryId, BroadcastError> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let envelope = Envelope {
            seq,
            sent_at_ms: Utc::now().timestamp_millis(),
            title: message.title().to_string(),
            body: message.body().to_string(),
            image_count: message.images().len() as u32,
        };
        let data = self.encode(&envelope)?;

        let sent = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(BroadcastError::Other("broadcast cancelled".to_string()));
            }
            sent = self.socket.send(&data) => sent?,
        };

        let logger = self.logger.read().clone();
        logger.in_scope(|| {
            if sent < data.len() {
                warn!(broadcaster = %self.name, seq, sent, len = data.len(), "Datagram truncated");
            } else {
                debug!(broadcaster = %self.name, seq, bytes = sent, "Sent");
            }
        });

        Ok(DeliveryId::int(seq as i64))
    }

    async fn set_logger(&self, _cancel: &CancelToken, logger: Logger) -> Result<(), BroadcastError> {
        *self.logger.write() = logger;
        Ok(())
    }
}
