//! Built-in delivery targets
//!
//! Contains NullBroadcaster, LogBroadcaster, FileBroadcaster and UdpBroadcaster.

mod file;
mod log;
mod null;
mod udp;

pub use self::file::{FileBroadcaster, FileBroadcasterConfig};
pub use self::log::LogBroadcaster;
pub use self::null::NullBroadcaster;
pub use self::udp::{UdpBroadcaster, UdpBroadcasterConfig, WireFormat};

use contracts::BroadcastError;

use crate::registry::Registry;

/// Register every built-in target under its scheme
pub fn register_defaults(registry: &Registry) -> Result<(), BroadcastError> {
    registry.register(null::SCHEME, null::construct)?;
    registry.register(log::SCHEME, log::construct)?;
    registry.register(file::SCHEME, file::construct)?;
    registry.register(udp::SCHEME, udp::construct)?;
    Ok(())
}
