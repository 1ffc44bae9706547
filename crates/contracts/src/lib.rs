//! # Contracts
//!
//! Frozen interface contracts shared by every broadcast crate: the message
//! payload, delivery identifiers, the `Broadcaster` capability and its errors.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Cancellation Model
//! - Every broadcast runs under a [`CancelToken`]
//! - Cancelling a token cancels all of its children, never its parent

mod broadcaster;
mod cancel;
mod config;
mod delivery_id;
mod error;
mod logger;
mod message;

pub use broadcaster::*;
pub use cancel::{CancelGuard, CancelToken};
pub use config::*;
pub use delivery_id::{DeliveryId, ScalarId, COMPOSITE_SEPARATOR};
pub use error::*;
pub use logger::Logger;
pub use message::Message;
