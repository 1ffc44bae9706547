//! Command implementations.

mod schemes;
mod send;
mod validate;

pub use schemes::run_schemes;
pub use send::run_send;
pub use validate::run_validate;
