//! # Worker Handle
//!
//! A worker wraps one spawned thread of a group. Workers are created and
//! joined only by the [`ThreadGroupCoordinator`](crate::thread::ThreadGroupCoordinator);
//! callers observe them through read-only accessors.

use std::any::Any;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// States a worker can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Thread has been created but has not entered its routine yet
    Spawned,
    /// Thread is executing its routine (or has returned but not been joined)
    Running,
    /// Thread has been joined; terminal
    Joined,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Spawned,
            1 => WorkerState::Running,
            _ => WorkerState::Joined,
        }
    }
}

/// Handle to one spawned thread of a group
pub struct Worker {
    /// Position of the worker inside its group
    index: usize,

    /// Thread name, if one was configured
    name: Option<String>,

    /// Shared with the thread so it can report that it started running
    state: Arc<AtomicU8>,

    /// Taken exactly once, by `join`
    thread_handle: Option<JoinHandle<()>>,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("has_thread", &self.thread_handle.is_some())
            .finish()
    }
}

impl Worker {
    /// Spawn a thread running `routine`.
    ///
    /// The thread moves itself to `Running` before calling `routine`.
    pub(crate) fn spawn<F>(
        index: usize,
        name: Option<String>,
        stack_size: Option<usize>,
        routine: F,
    ) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(WorkerState::Spawned as u8));
        let thread_state = Arc::clone(&state);

        let mut builder = thread::Builder::new();
        if let Some(name) = &name {
            builder = builder.name(name.clone());
        }
        if let Some(bytes) = stack_size {
            builder = builder.stack_size(bytes);
        }

        let thread_handle = builder.spawn(move || {
            thread_state.store(WorkerState::Running as u8, Ordering::Release);
            routine();
        })?;

        Ok(Self {
            index,
            name,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// Wait for the thread to terminate.
    ///
    /// Returns the panic message if the routine did not return normally.
    /// Joining an already joined worker is a no-op.
    pub(crate) fn join(&mut self) -> Result<(), String> {
        let Some(handle) = self.thread_handle.take() else {
            return Ok(());
        };

        let result = handle.join().map_err(|payload| panic_message(&*payload));
        self.state.store(WorkerState::Joined as u8, Ordering::Release);
        result
    }

    /// Current state of the worker
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Index of the worker inside its group
    pub fn index(&self) -> usize {
        self.index
    }

    /// Configured thread name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}
