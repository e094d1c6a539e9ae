use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::PoolError;

/// Pending payloads waiting to be sealed, oldest first.
pub struct PayloadPool {
    queue: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl PayloadPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Queue a payload; returns the new pool size.
    pub fn push(&self, payload: String) -> Result<usize, PoolError> {
        let mut queue = self.queue.lock().expect("mutex poisoned");
        if queue.len() >= self.capacity {
            return Err(PoolError::Full {
                capacity: self.capacity,
            });
        }
        queue.push_back(payload);
        Ok(queue.len())
    }

    pub fn pop(&self) -> Option<String> {
        self.queue.lock().expect("mutex poisoned").pop_front()
    }

    /// Put a payload whose block went stale back at the head of the queue.
    /// Refused once the pool has refilled to capacity in the meantime.
    pub fn requeue(&self, payload: String) -> Result<usize, PoolError> {
        let mut queue = self.queue.lock().expect("mutex poisoned");
        if queue.len() >= self.capacity {
            return Err(PoolError::Full {
                capacity: self.capacity,
            });
        }
        queue.push_front(payload);
        Ok(queue.len())
    }

    pub fn pending(&self) -> Vec<String> {
        self.queue.lock().expect("mutex poisoned").iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().expect("mutex poisoned").len()
    }
}
