//! Timer scheduling
//!
//! [`Dispatcher`] owns the hardware counter capability, the tick base
//! and the sorted queue. [`Timer`] is the shareable facade: every
//! operation runs inside a critical section, so foreground callers and
//! the interrupt entry points can use the same instance.

mod event;
mod queue;

pub use event::{TimerEvent, TimerHandleFn};
pub use queue::TimerQueue;

use core::ptr::NonNull;

use portable_atomic::{AtomicBool, Ordering};

use crate::config::{CFG_COMPARE_MIN_LEAD, CFG_COUNTER_PERIOD};
use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::hal::TickHw;
use crate::time::TimeBase;
use crate::types::Tick;

/// Timer core: counter capability, tick base and pending queue
///
/// Methods take `&mut self` and expect to run inside a critical
/// section; [`Timer`] provides that wrapping.
pub struct Dispatcher<H: TickHw> {
    hw: H,
    base: TimeBase,
    queue: TimerQueue,
}

impl<H: TickHw> Dispatcher<H> {
    pub const fn new(hw: H) -> Self {
        Dispatcher {
            hw,
            base: TimeBase::new(),
            queue: TimerQueue::new(),
        }
    }

    /// Arm the hardware counter and reset to tick zero
    pub fn start(&mut self) {
        self.queue.init();
        self.base.reset();
        self.hw.start();
    }

    /// Current 32-bit tick count
    pub fn now(&self) -> Tick {
        self.base.now(&self.hw)
    }

    /// Overflow interrupt entry
    pub fn on_overflow(&mut self) {
        self.base.on_overflow();
    }

    /// Link caller-owned storage to fire `interval` ticks from now
    ///
    /// Re-linking storage that is still queued corrupts the list, so it
    /// is checked by identity scan and treated as fatal.
    pub fn set(&mut self, ev: NonNull<TimerEvent>, interval: Tick, handler: TimerHandleFn) {
        let time = self.now();

        assert!(!self.queue.contains(ev), "timer event already linked");
        self.queue.link(time, ev, interval, handler);

        if self.queue.head() == Some(ev) {
            let count = self.hw.count();
            self.hw.set_compare(count.wrapping_add(CFG_COMPARE_MIN_LEAD));
        }
    }

    /// Unlink storage; no-op if it is not queued
    pub fn clear(&mut self, ev: NonNull<TimerEvent>) {
        self.queue.unlink(ev);
    }

    /// Pop the head of the queue if it is due
    pub fn pop_due(&mut self) -> Option<NonNull<TimerEvent>> {
        let time = self.now();
        self.queue.pop_due(time)
    }

    /// Reprogram the compare register toward the head of the queue
    ///
    /// Deadlines a full counter lap or more away keep the stale compare
    /// value; the dispatcher re-evaluates when it fires. An empty queue
    /// leaves the compare register alone.
    pub fn rearm(&mut self) {
        let time = self.now();

        if let Some(diff) = self.queue.next_delta(time) {
            if diff < (CFG_COUNTER_PERIOD - 1) as i32 {
                let lead = diff.max(CFG_COMPARE_MIN_LEAD as i32) as u8;
                let count = self.hw.count();
                self.hw.set_compare(count.wrapping_add(lead));
            }
        }
    }

    /// Read access to the pending queue
    pub fn queue(&self) -> &TimerQueue {
        &self.queue
    }
}

/// Shareable timer instance
///
/// Owns a [`Dispatcher`] behind a [`CsCell`]; safe to place in a
/// `static` and touch from both foreground code and the two interrupt
/// entry points ([`on_overflow`](Timer::on_overflow),
/// [`on_compare_match`](Timer::on_compare_match)).
pub struct Timer<H: TickHw> {
    inner: CsCell<Dispatcher<H>>,
    running: AtomicBool,
}

impl<H: TickHw> Timer<H> {
    /// Create a timer over a hardware counter capability
    ///
    /// Taking the capability by value ties this instance to the
    /// peripheral; a second instance would need a second capability.
    pub const fn new(hw: H) -> Self {
        Timer {
            inner: CsCell::new(Dispatcher::new(hw)),
            running: AtomicBool::new(false),
        }
    }

    /// Arm the underlying counter and start the tick base from zero
    pub fn start(&self) {
        critical_section(|cs| {
            self.inner.get(cs).start();
        });
        self.running.store(true, Ordering::Release);
        crate::debug!("timer started");
    }

    /// Has `start` been called?
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current 32-bit tick count
    pub fn now(&self) -> Tick {
        critical_section(|cs| self.inner.get(cs).now())
    }

    /// Arm a one-shot deferred callback `interval` ticks from now
    ///
    /// The storage must stay valid and unmoved until the event fires or
    /// is cleared. Re-`set`-ing storage that is still linked is a fatal
    /// usage error. Periodic behavior is built by the handler
    /// re-`set`-ing its own storage.
    pub fn set(&self, ev: &mut TimerEvent, interval: Tick, handler: TimerHandleFn) {
        let ptr = NonNull::from(ev);
        critical_section(|cs| {
            self.inner.get(cs).set(ptr, interval, handler);
        });
    }

    /// Cancel a pending event; no-op if it is not linked
    pub fn clear(&self, ev: &mut TimerEvent) {
        let ptr = NonNull::from(ev);
        critical_section(|cs| {
            self.inner.get(cs).clear(ptr);
        });
    }

    /// Overflow interrupt entry point
    pub fn on_overflow(&self) {
        critical_section(|cs| {
            self.inner.get(cs).on_overflow();
        });
    }

    /// Compare-match interrupt entry point
    ///
    /// Pops and fires every due event in deadline order, then reprograms
    /// the compare register toward the next head. Handlers run with the
    /// event already unlinked and may re-`set` the same storage.
    pub fn on_compare_match(&self) {
        loop {
            let due = critical_section(|cs| self.inner.get(cs).pop_due());

            match due {
                Some(mut ev) => {
                    // SAFETY: linked storage outlives its linked state;
                    // the event was unlinked above and no queue link to
                    // it remains.
                    let ev = unsafe { ev.as_mut() };
                    if let Some(handler) = ev.handler {
                        handler(ev);
                    }
                }
                None => break,
            }
        }

        critical_section(|cs| {
            self.inner.get(cs).rearm();
        });
    }

    /// Access the hardware capability
    ///
    /// For platform glue and simulation; runs inside a critical section.
    pub fn with_hw<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut H) -> R,
    {
        critical_section(|cs| f(&mut self.inner.get(cs).hw))
    }
}
