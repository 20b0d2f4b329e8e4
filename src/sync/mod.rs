//! Concurrency primitives backing the scheduling pipeline (§4.2, §4.3).

mod fifo_mutex;
mod priority_queue;

pub use fifo_mutex::{FifoGuard, FifoMutex};
pub use priority_queue::PriorityQueue;
