//! # Cyclic Barrier
//!
//! A barrier blocks a fixed number of participants until all of them have
//! arrived, releases them together and then resets itself for the next
//! cycle.
//!
//! ## Contract
//! - Exactly `capacity` participants call [`Barrier::wait`] exactly once per
//!   cycle, for every cycle. A missing participant is indistinguishable from
//!   a slow one, so a violation shows up as a hang rather than an error.
//! - The barrier must outlive every participant blocked in `wait`. Share it
//!   through an `Arc` so ownership enforces this.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use rendezvous::thread::Barrier;
//!
//! let barrier = Arc::new(Barrier::new(3).unwrap());
//! let handles: Vec<_> = (0..3)
//!     .map(|_| {
//!         let barrier = Arc::clone(&barrier);
//!         thread::spawn(move || barrier.wait().is_leader())
//!     })
//!     .collect();
//!
//! let leaders = handles
//!     .into_iter()
//!     .map(|h| h.join().unwrap())
//!     .filter(|is_leader| *is_leader)
//!     .count();
//! assert_eq!(leaders, 1);
//! ```

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::thread::error::BarrierError;

/// Counters shared by all participants, guarded by the barrier lock.
#[derive(Debug)]
struct BarrierState {
    /// Participants waiting in the current cycle.
    arrived: usize,
    /// Cycle epoch, advanced by every release.
    generation: u64,
}

/// A reusable rendezvous point for a fixed number of threads.
pub struct Barrier {
    state: Mutex<BarrierState>,
    released: Condvar,
    capacity: usize,
}

/// Outcome of [`Barrier::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    is_leader: bool,
    generation: u64,
}

impl BarrierWaitResult {
    /// True for exactly one participant per cycle: the last arriver.
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    /// Generation the participant was released from.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Barrier {
    /// Create a barrier for `capacity` participants.
    ///
    /// # Errors
    /// Returns [`BarrierError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, BarrierError> {
        if capacity < 1 {
            return Err(BarrierError::InvalidCapacity { capacity });
        }

        Ok(Self {
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            released: Condvar::new(),
            capacity,
        })
    }

    /// Block until `capacity` participants have called `wait` in this cycle.
    ///
    /// The last arriver resets the count, advances the generation and wakes
    /// everyone else without blocking itself. Every other caller sleeps until
    /// the generation moves past the one it observed on entry, which also
    /// filters out spurious wakeups.
    pub fn wait(&self) -> BarrierWaitResult {
        let mut state = self.lock();
        let local_generation = state.generation;
        state.arrived += 1;

        if state.arrived == self.capacity {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            drop(state);
            self.released.notify_all();
            tracing::trace!(generation = local_generation, "generation advanced");
            return BarrierWaitResult {
                is_leader: true,
                generation: local_generation,
            };
        }

        // The lock is released while parked and only held again to re-check.
        while state.generation == local_generation {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        BarrierWaitResult {
            is_leader: false,
            generation: local_generation,
        }
    }

    /// Number of participants required per cycle.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of completed cycles.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Participants currently blocked in the active cycle.
    pub fn arrived(&self) -> usize {
        self.lock().arrived
    }

    // The guarded counters are never left half-updated, so a poisoned lock
    // still holds a consistent state.
    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Barrier")
            .field("capacity", &self.capacity)
            .field("arrived", &state.arrived)
            .field("generation", &state.generation)
            .finish()
    }
}
