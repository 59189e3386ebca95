#![doc = " Thread-level synchronization: the cyclic barrier and the thread group coordinator."]

pub mod barrier;
pub mod config;
pub mod error;
pub mod group;
pub mod worker;

// Re-export key types for easier usage
pub use barrier::{Barrier, BarrierWaitResult};
pub use config::{Joinability, ThreadOptions};
pub use error::{BarrierError, DriverError, JoinError, SpawnError};
pub use group::{GroupId, GroupState, ThreadGroupCoordinator};
pub use worker::{Worker, WorkerState};
