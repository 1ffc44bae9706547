//! Logger - replaceable logging sink handed to targets
//!
//! Wraps a `tracing::Dispatch` so a target's events can be routed to a
//! subscriber other than the process default.

use std::fmt;
use std::sync::Arc;

use tracing::Dispatch;

/// Named logging sink
///
/// Cheap to clone; clones share the same subscriber.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    dispatch: Dispatch,
}

impl Logger {
    pub fn new(name: impl Into<Arc<str>>, dispatch: Dispatch) -> Self {
        Self {
            name: name.into(),
            dispatch,
        }
    }

    /// Capture the subscriber that is current on this thread
    pub fn current(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, tracing::dispatcher::get_default(Dispatch::clone))
    }

    /// Logger that discards every event
    pub fn none(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Dispatch::none())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this logger's subscriber as the default
    ///
    /// `f` must not await; the override only lasts for the synchronous call.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::current("default")
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}
