use strata_store::StoreError;

use crate::transaction::TaskFault;

/// Errors produced by repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("snapshot index {index} out of range: repository holds {len} snapshots")]
    OutOfRange { index: usize, len: usize },

    /// A task raised an error. The snapshot it started from has already
    /// been appended to the history.
    #[error("task {task} faulted: {source}")]
    TaskFault {
        task: String,
        #[source]
        source: TaskFault,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type RepoResult<T> = Result<T, RepoError>;
