// --- Spawn Options ---

/// Whether spawned threads can be joined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Joinability {
    /// Threads are kept and waited on by `join_all`.
    #[default]
    Joinable,
    /// Threads run unattended. Not supported by the coordinator, since
    /// `join_all` has to be able to wait on every member.
    Detached,
}

/// Options applied to every thread of a spawned group.
///
/// All fields are optional; unset fields fall back to the platform defaults.
/// Per-thread lists, when present, must have exactly one entry per thread.
#[derive(Clone, Debug, Default)]
pub struct ThreadOptions {
    /// Stack size in bytes for every thread.
    pub stack_size: Option<usize>,

    /// Stack size in bytes for each thread, overriding `stack_size`.
    pub stack_sizes: Option<Vec<usize>>,

    /// Scheduling priority hint. Standard threads expose no priority knob,
    /// so the value is only carried into diagnostics.
    pub priority: Option<i32>,

    /// Threads are named `{prefix}{index}`.
    pub name_prefix: Option<String>,

    /// Explicit name for each thread, overriding `name_prefix`.
    pub names: Option<Vec<String>>,

    /// Must be `Joinable`.
    pub joinability: Joinability,
}

impl ThreadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn with_stack_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.stack_sizes = Some(sizes);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn with_joinability(mut self, joinability: Joinability) -> Self {
        self.joinability = joinability;
        self
    }

    /// Check the options against a spawn request of `count` threads.
    pub fn validate(&self, count: usize) -> Result<(), String> {
        if self.joinability == Joinability::Detached {
            return Err("detached threads cannot be joined by the coordinator".to_string());
        }
        if let Some(sizes) = &self.stack_sizes {
            if sizes.len() != count {
                return Err(format!(
                    "expected {} stack sizes, got {}",
                    count,
                    sizes.len()
                ));
            }
        }
        if let Some(names) = &self.names {
            if names.len() != count {
                return Err(format!("expected {} thread names, got {}", count, names.len()));
            }
        }
        if self.stack_size == Some(0) || self.stack_sizes.iter().flatten().any(|s| *s == 0) {
            return Err("stack size must be non-zero".to_string());
        }
        Ok(())
    }

    /// Stack size for the thread at `index`, if any was configured.
    pub fn stack_size_for(&self, index: usize) -> Option<usize> {
        self.stack_sizes
            .as_ref()
            .and_then(|sizes| sizes.get(index).copied())
            .or(self.stack_size)
    }

    /// Name for the thread at `index`, if any was configured.
    pub fn name_for(&self, index: usize) -> Option<String> {
        if let Some(names) = &self.names {
            return names.get(index).cloned();
        }
        self.name_prefix
            .as_ref()
            .map(|prefix| format!("{}{}", prefix, index))
    }
}
