//! Serialized event queue.
//!
//! Events are produced by:
//! - the scheduler (a timer deadline passed)
//! - the cloud transport (twin writes, accepted direct methods)
//! - the update agent (an update is pending)
//!
//! Events are consumed by the event loop, which dispatches them to the
//! [`AppService`](crate::app::service::AppService) one at a time in FIFO
//! order.  A remote write queued before a timer event is therefore always
//! applied before that timer's handler runs.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Scheduler   │────▶│              │     │              │
//! │ Cloud       │────▶│  EventQueue  │────▶│  Event loop  │
//! │ Update agent│────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use heapless::Deque;

use crate::app::commands::AppCommand;
use crate::scheduler::TimerId;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 32;

/// One unit of work for the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A scheduler deadline passed.
    Timer(TimerId),
    /// An inbound command from the cloud or the platform.
    Command(AppCommand),
}

/// Bounded FIFO of pending events.  Single producer side (the loop
/// itself), single consumer; no locking.
#[derive(Default)]
pub struct EventQueue {
    inner: Deque<Event, EVENT_QUEUE_CAP>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { inner: Deque::new() }
    }

    /// Append an event.  Returns `false` if the queue is full (event
    /// dropped).
    pub fn push(&mut self, event: Event) -> bool {
        self.inner.push_back(event).is_ok()
    }

    /// Take the oldest event.
    pub fn pop(&mut self) -> Option<Event> {
        self.inner.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Slots still available before pushes start failing.
    pub fn free_slots(&self) -> usize {
        EVENT_QUEUE_CAP - self.inner.len()
    }
}
