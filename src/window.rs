//! Bounded sliding window of aggregate records.
//!
//! A thread-safe FIFO shared between the ingestion loop (writer) and the
//! analysis/command paths (readers). Readers only ever take a snapshot copy;
//! the buffer is mutated exclusively by `append`.
//!
//! The lock is scoped per call and is never held across an external-process
//! invocation, so a slow analyzer cannot stall ingestion.

use crate::aggregate::AggregateRecord;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Bounded FIFO of the most recent [`AggregateRecord`]s.
#[derive(Debug)]
pub struct WindowBuffer {
    records: Mutex<VecDeque<AggregateRecord>>,
    capacity: usize,
}

impl WindowBuffer {
    /// Create an empty window holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append one record, evicting the oldest when at capacity.
    pub async fn append(&self, record: AggregateRecord) {
        let mut records = self.records.lock().await;
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Copy the full current sequence in arrival order, without mutating it.
    pub async fn snapshot(&self) -> Vec<AggregateRecord> {
        self.records.lock().await.iter().cloned().collect()
    }

    /// Whether the window has reached capacity.
    pub async fn is_full(&self) -> bool {
        self.records.lock().await.len() == self.capacity
    }

    /// Current number of records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether the window holds no records yet.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
