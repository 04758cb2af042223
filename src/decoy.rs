//! Decoy services.
//!
//! - `port_selection`: random bind attempts within a configured port range.
//! - `decoy_listener`: the [`DecoyListener`] accept loop and its per-connection handler.

pub mod decoy_listener;
pub mod port_selection;

pub use decoy_listener::DecoyListener;
pub use port_selection::{bind_in_range, MAX_PORT_ATTEMPTS};
