//! Execution state registry (§4.8) — the process-singleton observability
//! snapshot fed by the queue, mutex, and worker, and read by the status and
//! health endpoints.

mod execution_state;

pub use execution_state::{
    ExecutionStateRegistry, ExecutionStateSnapshot, LastResult, MutexStatus, WorkerStatus,
};
