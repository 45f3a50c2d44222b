//! Timer event storage
//!
//! Events are caller-owned, fixed-lifetime records. The queue only
//! manipulates the intrusive link; it never allocates or frees, so the
//! storage must stay valid (and unmoved) for as long as it is linked.

use core::ptr::NonNull;

use crate::types::Tick;

/// Handler invoked when an event fires
///
/// Runs in interrupt context with the event already unlinked, so it may
/// immediately re-register the same storage for a repeating timer.
pub type TimerHandleFn = fn(&mut TimerEvent);

/// Caller-owned deferred-call record
///
/// Membership is decided by identity: the same storage must not be
/// linked into a queue twice.
pub struct TimerEvent {
    /// Intrusive queue link
    pub next: Option<NonNull<TimerEvent>>,
    /// Absolute tick at which the event fires (32-bit modular)
    pub deadline: Tick,
    /// Callback, set when the event is linked
    pub handler: Option<TimerHandleFn>,
}

impl TimerEvent {
    /// Create unlinked event storage
    pub const fn new() -> Self {
        TimerEvent {
            next: None,
            deadline: 0,
            handler: None,
        }
    }
}

impl Default for TimerEvent {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: events are only reached through the queue, and the queue is
// only touched inside critical sections.
unsafe impl Send for TimerEvent {}
unsafe impl Sync for TimerEvent {}
