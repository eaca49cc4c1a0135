use std::error::Error;
use std::fmt;

use strata_types::AnyKey;

use crate::snapshot::SnapShot;

/// An unexpected error raised by a task, as opposed to a reported failure.
pub type TaskFault = Box<dyn Error + Send + Sync>;

/// The snapshot a task produced and whether the task succeeded.
///
/// A failed outcome is an expected result (a compile error, say); its
/// snapshot still becomes part of the history.
pub struct TaskOutcome {
    pub snapshot: SnapShot,
    pub success: bool,
}

impl TaskOutcome {
    pub fn succeeded(snapshot: SnapShot) -> Self {
        Self {
            snapshot,
            success: true,
        }
    }

    pub fn failed(snapshot: SnapShot) -> Self {
        Self {
            snapshot,
            success: false,
        }
    }
}

/// A unit of build work: a function from one snapshot to the next.
pub trait Task {
    /// The artifact this task produces.
    fn key(&self) -> &AnyKey;

    /// Declared inputs. Recorded for traceability only.
    fn sources(&self) -> &[AnyKey] {
        &[]
    }

    fn apply(&self, snapshot: &SnapShot) -> Result<TaskOutcome, TaskFault>;
}

/// A [`Task`] built from a closure.
pub struct FnTask<F> {
    key: AnyKey,
    sources: Vec<AnyKey>,
    run: F,
}

impl<F> FnTask<F>
where
    F: Fn(&SnapShot) -> Result<TaskOutcome, TaskFault>,
{
    pub fn new(key: impl Into<AnyKey>, run: F) -> Self {
        Self {
            key: key.into(),
            sources: Vec::new(),
            run,
        }
    }

    pub fn with_sources(mut self, sources: Vec<AnyKey>) -> Self {
        self.sources = sources;
        self
    }
}

impl<F> Task for FnTask<F>
where
    F: Fn(&SnapShot) -> Result<TaskOutcome, TaskFault>,
{
    fn key(&self) -> &AnyKey {
        &self.key
    }

    fn sources(&self) -> &[AnyKey] {
        &self.sources
    }

    fn apply(&self, snapshot: &SnapShot) -> Result<TaskOutcome, TaskFault> {
        (self.run)(snapshot)
    }
}

/// An ordered sequence of tasks. Each task sees the snapshot produced by
/// the one before it.
#[derive(Default)]
pub struct Transaction {
    tasks: Vec<Box<dyn Task>>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: impl Task + 'static) {
        self.tasks.push(Box::new(task));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, task: impl Task + 'static) -> Self {
        self.push(task);
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Task> {
        self.tasks.get(index).map(|t| t.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Task> {
        self.tasks.iter().map(|t| t.as_ref())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tasks.iter().map(|t| t.key()))
            .finish()
    }
}
