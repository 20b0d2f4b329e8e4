//! Priority queue (§4.3).
//!
//! Ordering key `(priority asc, timestamp asc)`, realized as a `BinaryHeap`
//! of a wrapper type with a reversed `Ord` — directly in the shape of the
//! teacher's `kernel::lifecycle::PriorityItem` (min-heap via reversed
//! comparison, FIFO tiebreak on timestamp).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::command::ScheduledCommand;

struct PriorityItem(ScheduledCommand);

impl PartialEq for PriorityItem {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority == other.0.priority && self.0.timestamp_ms == other.0.timestamp_ms
    }
}
impl Eq for PriorityItem {}

impl Ord for PriorityItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse priority so smaller numbers
        // (higher priority) surface first, then break ties by earlier
        // timestamp (FIFO within a class, I3/G1).
        other
            .0
            .priority
            .cmp(&self.0.priority)
            .then_with(|| other.0.timestamp_ms.cmp(&self.0.timestamp_ms))
    }
}

impl PartialOrd for PriorityItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Thread-safe ordered multiset of `ScheduledCommand`. `enqueue`/`dequeue`
/// publish the new length via `on_size_change` (the ExecutionState registry
/// hookup, §4.3's "must publish the new length").
pub struct PriorityQueue {
    heap: Mutex<BinaryHeap<PriorityItem>>,
    on_size_change: Arc<dyn Fn(usize) + Send + Sync>,
}

impl std::fmt::Debug for PriorityQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityQueue").finish_non_exhaustive()
    }
}

impl PriorityQueue {
    pub fn new(on_size_change: Arc<dyn Fn(usize) + Send + Sync>) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            on_size_change,
        }
    }

    /// Inserts `cmd` preserving order. Returns the command's 1-based
    /// position in dequeue order at the moment of insertion (used for the
    /// EXECUTE acceptance payload's `queuePosition`, §6.1).
    pub async fn enqueue(&self, cmd: ScheduledCommand) -> usize {
        let key = (cmd.priority, cmd.timestamp_ms);
        let mut heap = self.heap.lock().await;
        heap.push(PriorityItem(cmd));
        let position = heap
            .iter()
            .filter(|item| (item.0.priority, item.0.timestamp_ms) <= key)
            .count();
        let len = heap.len();
        drop(heap);
        (self.on_size_change)(len);
        position
    }

    /// Removes and returns the minimum element, or `None` when empty.
    pub async fn dequeue(&self) -> Option<ScheduledCommand> {
        let mut heap = self.heap.lock().await;
        let item = heap.pop();
        let len = heap.len();
        drop(heap);
        (self.on_size_change)(len);
        item.map(|i| i.0)
    }

    pub async fn size(&self) -> usize {
        self.heap.lock().await.len()
    }
}
