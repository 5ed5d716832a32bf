mod event_buffer;
mod executor;

use std::sync::atomic::{AtomicI32, Ordering};

pub(crate) use self::{
    event_buffer::EventBuffer,
    executor::InMemoryExecutor,
};
use crate::{bson::Bson, id::IdGenerator};

/// Hands out consecutive `Int32` ids.
#[derive(Debug)]
pub(crate) struct SequentialIdGenerator {
    start: i32,
    next: AtomicI32,
}

impl SequentialIdGenerator {
    pub(crate) fn starting_at(start: i32) -> Self {
        Self {
            start,
            next: AtomicI32::new(start),
        }
    }

    /// The number of ids generated so far.
    pub(crate) fn generated(&self) -> usize {
        (self.next.load(Ordering::SeqCst) - self.start) as usize
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Bson {
        Bson::Int32(self.next.fetch_add(1, Ordering::SeqCst))
    }
}
