//! Timer queue - intrusive singly linked list of pending events
//!
//! Kept sorted by ascending wraparound-safe time-to-fire. Insertion
//! stops before the first entry whose delta exceeds the new entry's,
//! which preserves FIFO order among equal deadlines. The queue holds
//! non-owning links into caller-supplied storage.

use core::ptr::NonNull;

use crate::time::tick_delta;
use crate::types::Tick;

use super::event::{TimerEvent, TimerHandleFn};

/// Sorted queue of pending timer events
pub struct TimerQueue {
    head: Option<NonNull<TimerEvent>>,
}

impl TimerQueue {
    /// Create a new empty queue
    pub const fn new() -> Self {
        TimerQueue { head: None }
    }

    /// Drop all links
    pub fn init(&mut self) {
        self.head = None;
    }

    /// Check if the queue is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Get head of queue (next to fire)
    #[inline]
    pub fn head(&self) -> Option<NonNull<TimerEvent>> {
        self.head
    }

    /// Identity scan: is this storage already linked?
    pub fn contains(&self, ev: NonNull<TimerEvent>) -> bool {
        let mut current = self.head;

        while let Some(cur) = current {
            if cur == ev {
                return true;
            }
            current = unsafe { cur.as_ref() }.next;
        }

        false
    }

    /// Link an event at `time + interval`, keeping the queue sorted
    ///
    /// Entries already due stay in front; among equal deadlines the new
    /// entry goes last.
    ///
    /// # Safety
    /// Caller must ensure `ev` is valid, not already linked, and that
    /// the storage outlives its linked state. Must run inside a critical
    /// section.
    pub fn link(
        &mut self,
        time: Tick,
        mut ev: NonNull<TimerEvent>,
        interval: Tick,
        handler: TimerHandleFn,
    ) {
        let deadline = time.wrapping_add(interval);
        let new_diff = tick_delta(deadline, time);

        // SAFETY: exclusive access via critical section
        let ev_ref = unsafe { ev.as_mut() };
        ev_ref.deadline = deadline;
        ev_ref.handler = Some(handler);
        ev_ref.next = None;

        let mut prev: Option<NonNull<TimerEvent>> = None;
        let mut current = self.head;

        while let Some(cur) = current {
            let cur_ref = unsafe { cur.as_ref() };
            let diff = tick_delta(cur_ref.deadline, time);

            if diff > 0 && new_diff < diff {
                break;
            }

            prev = current;
            current = cur_ref.next;
        }

        unsafe { ev.as_mut() }.next = current;

        match prev {
            Some(p) => {
                unsafe { (*p.as_ptr()).next = Some(ev) };
            }
            None => {
                self.head = Some(ev);
            }
        }
    }

    /// Unlink by identity scan; no-op if the event is not present
    pub fn unlink(&mut self, ev: NonNull<TimerEvent>) {
        let mut prev: Option<NonNull<TimerEvent>> = None;
        let mut current = self.head;

        while let Some(cur) = current {
            let next = unsafe { cur.as_ref() }.next;

            if cur == ev {
                match prev {
                    Some(p) => {
                        unsafe { (*p.as_ptr()).next = next };
                    }
                    None => {
                        self.head = next;
                    }
                }
                unsafe { (*cur.as_ptr()).next = None };
                return;
            }

            prev = current;
            current = next;
        }
    }

    /// Pop the head if it is due at `time`
    ///
    /// The returned event is already unlinked, so its handler may
    /// re-register the same storage.
    pub fn pop_due(&mut self, time: Tick) -> Option<NonNull<TimerEvent>> {
        let head = self.head?;

        if tick_delta(unsafe { head.as_ref() }.deadline, time) > 0 {
            return None;
        }

        self.head = unsafe { head.as_ref() }.next;
        unsafe { (*head.as_ptr()).next = None };

        Some(head)
    }

    /// Delta from `time` to the head's deadline, if any
    pub fn next_delta(&self, time: Tick) -> Option<i32> {
        self.head
            .map(|head| tick_delta(unsafe { head.as_ref() }.deadline, time))
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: TimerQueue is only modified within critical sections
unsafe impl Send for TimerQueue {}
unsafe impl Sync for TimerQueue {}
