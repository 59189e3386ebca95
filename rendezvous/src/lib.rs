// Rendezvous
//
// A reusable cyclic barrier and a coordinator that spawns, tracks and joins
// fixed-size groups of worker threads, plus the driver that exercises them
// together.

pub mod driver;
pub mod logging;
pub mod thread;

// Re-export commonly used types
pub use thread::{
    Barrier, BarrierWaitResult, GroupId, JoinError, SpawnError, ThreadGroupCoordinator,
    ThreadOptions,
};
