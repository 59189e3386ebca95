use std::io;
use thiserror::Error;

use crate::thread::group::GroupId;

/// Errors raised when constructing a barrier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BarrierError {
    #[error("Invalid barrier capacity: {capacity} (must be at least 1)")]
    InvalidCapacity { capacity: usize },
}

/// Errors related to spawning a thread group.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("Invalid spawn request: thread count must be at least 1")]
    InvalidCount,
    #[error("Invalid thread options: {0}")]
    InvalidOptions(String),
    /// Some threads started before the platform refused another one.
    ///
    /// The `started` threads are still running and remain registered under
    /// `group`, so the caller decides whether to join them or carry on.
    #[error("Spawned only {started} of {requested} threads in group {group}: {source}")]
    Partial {
        requested: usize,
        started: usize,
        group: GroupId,
        #[source]
        source: io::Error,
    },
}

impl SpawnError {
    /// Number of threads that are running despite the failure.
    pub fn started(&self) -> usize {
        match self {
            SpawnError::Partial { started, .. } => *started,
            _ => 0,
        }
    }

    /// Group holding the partially started threads, if any were started.
    pub fn group(&self) -> Option<GroupId> {
        match self {
            SpawnError::Partial { group, started, .. } if *started > 0 => Some(*group),
            _ => None,
        }
    }
}

/// Errors related to joining a thread group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("Thread group not found: {0}")]
    UnknownGroup(GroupId),
    /// Joining the same group twice is a contract violation.
    #[error("Thread group already joined: {0}")]
    AlreadyJoined(GroupId),
    /// Every member was joined, but at least one did not return normally.
    #[error("{failed} thread(s) in group {group} terminated abnormally: {first}")]
    Panicked {
        group: GroupId,
        failed: usize,
        first: String,
    },
}

/// Errors surfaced by the barrier test driver.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Barrier setup error: {0}")]
    Barrier(#[from] BarrierError),
    #[error("spawn_n failed: {0}")]
    Spawn(#[from] SpawnError),
    #[error("join failed: {0}")]
    Join(#[from] JoinError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal driver error: {0}")]
    Other(#[from] anyhow::Error),
}
