//! # Thread Group Coordinator
//!
//! Spawns fixed-size groups of worker threads that all run the same entry
//! routine against a shared context, and waits for each group to finish.
//!
//! ## Key Concepts
//! - Group: the `count` workers created by one `spawn` call, named by a [`GroupId`]
//! - Ownership: the coordinator owns every worker handle; callers only hold ids
//! - Reuse: one coordinator drives any number of spawn/join rounds, and
//!   several groups may be live at the same time; joined groups are dropped
//!   from the coordinator
//!
//! The coordinator is an ordinary value. It is only mutated by the thread
//! that spawns and joins, never by the workers, so it needs no locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::thread::config::ThreadOptions;
use crate::thread::error::{JoinError, SpawnError};
use crate::thread::worker::{Worker, WorkerState};

/// Identifier of a spawned thread group
///
/// Ids are issued in sequence by one coordinator and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId {
    coordinator: Uuid,
    seq: u64,
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.coordinator, self.seq)
    }
}

/// Lifecycle of a whole group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Members are spawned or running
    Active,
    /// `join_all` completed; the group no longer holds any worker
    Joined,
}

/// Owner of spawned worker groups
#[derive(Debug)]
pub struct ThreadGroupCoordinator {
    /// Options used by `spawn`
    options: ThreadOptions,

    /// Distinguishes ids issued here from those of other coordinators
    id: Uuid,

    /// Sequence number of the next group; every lower one was issued
    next_seq: u64,

    /// Groups that have not been joined yet
    groups: HashMap<GroupId, Vec<Worker>>,
}

impl Default for ThreadGroupCoordinator {
    fn default() -> Self {
        Self::with_options(ThreadOptions::default())
    }
}

impl ThreadGroupCoordinator {
    /// Create a coordinator using default thread options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a coordinator that applies `options` to every `spawn`
    pub fn with_options(options: ThreadOptions) -> Self {
        Self {
            options,
            id: Uuid::new_v4(),
            next_seq: 0,
            groups: HashMap::new(),
        }
    }

    /// Options applied by `spawn`
    pub fn options(&self) -> &ThreadOptions {
        &self.options
    }

    /// Spawn `count` threads, each calling `entry(&context)`, using the
    /// coordinator's options.
    pub fn spawn<C, F>(&mut self, count: usize, entry: F, context: Arc<C>) -> Result<GroupId, SpawnError>
    where
        C: Send + Sync + 'static,
        F: Fn(&C) + Send + Sync + 'static,
    {
        let options = self.options.clone();
        self.spawn_with_options(count, entry, context, &options)
    }

    /// Spawn `count` threads, each calling `entry(&context)`.
    ///
    /// # Errors
    /// - [`SpawnError::InvalidCount`] if `count` is zero
    /// - [`SpawnError::InvalidOptions`] if `options` do not fit the request
    /// - [`SpawnError::Partial`] if the platform refused a thread; the ones
    ///   already started are registered under the returned group id and must
    ///   still be joined by the caller
    pub fn spawn_with_options<C, F>(
        &mut self,
        count: usize,
        entry: F,
        context: Arc<C>,
        options: &ThreadOptions,
    ) -> Result<GroupId, SpawnError>
    where
        C: Send + Sync + 'static,
        F: Fn(&C) + Send + Sync + 'static,
    {
        if count == 0 {
            return Err(SpawnError::InvalidCount);
        }
        options.validate(count).map_err(SpawnError::InvalidOptions)?;

        if let Some(priority) = options.priority {
            tracing::debug!(priority, "thread priority hint is not applied by std threads");
        }

        let id = GroupId {
            coordinator: self.id,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        let entry = Arc::new(entry);
        let mut members = Vec::with_capacity(count);

        for index in 0..count {
            let entry = Arc::clone(&entry);
            let context = Arc::clone(&context);
            let stack_size = options.stack_size_for(index);

            let spawned = Worker::spawn(index, options.name_for(index), stack_size, move || {
                tracing::debug!(index, stack_size = ?stack_size, "worker started");
                (*entry)(context.as_ref());
            });

            match spawned {
                Ok(worker) => members.push(worker),
                Err(source) => {
                    let started = members.len();
                    tracing::error!(group = %id, started, requested = count, error = %source, "spawn failed");
                    if started > 0 {
                        self.register(id, members);
                    }
                    return Err(SpawnError::Partial {
                        requested: count,
                        started,
                        group: id,
                        source,
                    });
                }
            }
        }

        tracing::debug!(group = %id, count, "thread group spawned");
        self.register(id, members);
        Ok(id)
    }

    fn register(&mut self, id: GroupId, members: Vec<Worker>) {
        self.groups.insert(id, members);
    }

    fn was_issued(&self, group: GroupId) -> bool {
        group.coordinator == self.id && group.seq < self.next_seq
    }

    /// Block until every thread of `group` has terminated.
    ///
    /// All members are joined even if some of them panicked; the failures
    /// are then reported together as [`JoinError::Panicked`].
    ///
    /// # Errors
    /// - [`JoinError::UnknownGroup`] if `group` was never spawned here
    /// - [`JoinError::AlreadyJoined`] on a second join of the same group
    pub fn join_all(&mut self, group: GroupId) -> Result<(), JoinError> {
        let Some(mut members) = self.groups.remove(&group) else {
            return Err(if self.was_issued(group) {
                JoinError::AlreadyJoined(group)
            } else {
                JoinError::UnknownGroup(group)
            });
        };

        let mut failures: Vec<String> = members
            .iter_mut()
            .filter_map(|worker| worker.join().err())
            .collect();

        if failures.is_empty() {
            tracing::debug!(group = %group, "thread group joined");
            return Ok(());
        }

        let failed = failures.len();
        let first = failures.swap_remove(0);
        tracing::error!(group = %group, failed, panic = %first, "thread group terminated abnormally");
        Err(JoinError::Panicked { group, failed, first })
    }

    /// Ids of groups that have not been joined yet
    pub fn live_groups(&self) -> Vec<GroupId> {
        self.groups.keys().copied().collect()
    }

    /// Number of groups holding workers
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Workers of a group that has not been joined yet
    pub fn members(&self, group: GroupId) -> Option<&[Worker]> {
        self.groups.get(&group).map(Vec::as_slice)
    }

    /// Lifecycle state of a group issued by this coordinator
    pub fn state_of(&self, group: GroupId) -> Option<GroupState> {
        if self.groups.contains_key(&group) {
            Some(GroupState::Active)
        } else if self.was_issued(group) {
            Some(GroupState::Joined)
        } else {
            None
        }
    }

    /// States of the workers of a group that has not been joined yet
    pub fn member_states(&self, group: GroupId) -> Option<Vec<WorkerState>> {
        self.members(group)
            .map(|members| members.iter().map(Worker::state).collect())
    }
}

// Joining here could hang forever on a partially spawned group whose members
// are parked in a barrier, so leftover threads are detached instead.
impl Drop for ThreadGroupCoordinator {
    fn drop(&mut self) {
        for group in self.live_groups() {
            tracing::warn!(group = %group, "detaching thread group that was never joined");
        }
    }
}
