//! Network identity management.
//!
//! - `pool`: the fixed [`IdentityPool`] and uniform candidate selection.
//! - `executor`: the [`InterfaceExecutor`] capability and its script/simulated strategies.
//! - `rotator`: the [`IdentityRotator`] with flush/assign/rollback semantics.

pub mod executor;
pub mod pool;
pub mod rotator;

pub use executor::{
    ExecutionReport, InterfaceExecutor, InterfaceOperation, ScriptExecutor, SimulatedExecutor,
};
pub use pool::IdentityPool;
pub use rotator::{IdentityRotator, RotationFailure, RotationStage, RotationSuccess, Severity};
