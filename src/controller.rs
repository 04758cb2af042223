//! Process wiring.
//!
//! - `controller_handler`: the [`Controller`] building and running every component.
//! - `shutdown`: signal handling feeding the shared cancellation token.

pub mod controller_handler;
pub mod shutdown;

pub use controller_handler::{Controller, RunningDecoy};
pub use shutdown::create_shutdown_token;
