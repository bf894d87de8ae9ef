//! Single-threaded cooperative scheduler (C2): multiplexes the one UDP
//! socket a [`crate::transport::Transport`] owns together with the due
//! timers [`crate::timer::Timer`] registers on it.
//!
//! Built on `mio::Poll`/`mio::Events`/`mio::Token`, the same API
//! `neutronium::net::endpoint::Endpoint::sync` drives its three polls
//! with, generalized here into a single reusable reactor instead of being
//! inlined into the owning struct.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use mio::{Events, Poll, PollOpt, Ready, Token};

type TimerCallback = Box<dyn FnMut()>;

struct TimerSlot {
    deadline: Instant,
    interval: Duration,
    repeating: bool,
    active: bool,
    seq: u64,
    callback: Option<TimerCallback>,
}

/// Opaque handle to a scheduled timer slot. Stable across `Timer::start`
/// restarts; only invalidated by `EventLoop::timer_remove` (called from
/// `Timer::drop`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TimerId(usize);

struct Inner {
    poll: Poll,
    timers: Vec<Option<TimerSlot>>,
    free_list: Vec<usize>,
    next_seq: u64,
    stopped: bool,
}

/// Cheap, cloneable handle to the reactor. Cloning shares the same
/// underlying `mio::Poll` and timer table (an `Rc`, not a new loop).
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<RefCell<Inner>>,
}

impl EventLoop {
    pub fn new() -> io::Result<EventLoop> {
        Ok(EventLoop {
            inner: Rc::new(RefCell::new(Inner {
                poll: Poll::new()?,
                timers: Vec::new(),
                free_list: Vec::new(),
                next_seq: 0,
                stopped: false,
            })),
        })
    }

    /// Registers an I/O source (the `Transport`'s single UDP socket) for
    /// edge-triggered readiness notifications.
    pub fn register_io<E: ?Sized>(&self, source: &E, token: Token, interest: Ready) -> io::Result<()>
    where
        E: mio::Evented,
    {
        self.inner.borrow().poll.register(source, token, interest, PollOpt::edge())
    }

    pub fn stop(&self) {
        self.inner.borrow_mut().stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.borrow().stopped
    }

    /// Blocks until `stop()` is called, repeatedly calling [`Self::run_once`].
    pub fn run(&self) -> io::Result<()> {
        while !self.is_stopped() {
            self.run_once(None)?;
        }
        Ok(())
    }

    /// One iteration: waits up to `max_wait` (or until the earliest due
    /// timer, whichever is sooner) for I/O readiness, fires every timer
    /// whose deadline has passed, and returns the I/O events that fired.
    ///
    /// No-ops immediately once `stop()` has been called: no further timer
    /// callback fires and no further I/O is polled.
    pub fn run_once(&self, max_wait: Option<Duration>) -> io::Result<Vec<(Token, Ready)>> {
        if self.is_stopped() {
            return Ok(Vec::new());
        }

        let wait = self.clamp_wait(max_wait);
        let mut events = Events::with_capacity(64);
        {
            let inner = self.inner.borrow();
            inner.poll.poll(&mut events, wait)?;
        }

        self.fire_due_timers();

        if self.is_stopped() {
            return Ok(Vec::new());
        }

        Ok(events.iter().map(|e| (e.token(), e.readiness())).collect())
    }

    fn clamp_wait(&self, max_wait: Option<Duration>) -> Option<Duration> {
        let now = Instant::now();
        let inner = self.inner.borrow();
        let next_deadline = inner
            .timers
            .iter()
            .flatten()
            .filter(|slot| slot.active)
            .map(|slot| slot.deadline)
            .min();

        match (max_wait, next_deadline) {
            (None, None) => None,
            (Some(w), None) => Some(w),
            (None, Some(d)) => Some(d.saturating_duration_since(now)),
            (Some(w), Some(d)) => Some(w.min(d.saturating_duration_since(now))),
        }
    }

    fn fire_due_timers(&self) {
        loop {
            if self.is_stopped() {
                return;
            }
            let now = Instant::now();
            let due = {
                let inner = self.inner.borrow();
                let mut due: Vec<(usize, Instant, u64)> = inner
                    .timers
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, slot)| match slot {
                        Some(s) if s.active && s.deadline <= now => Some((idx, s.deadline, s.seq)),
                        _ => None,
                    })
                    .collect();
                due.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)));
                due
            };

            if due.is_empty() {
                return;
            }

            for (idx, deadline, _) in due {
                if self.is_stopped() {
                    return;
                }
                let callback = {
                    let mut inner = self.inner.borrow_mut();
                    match inner.timers.get_mut(idx).and_then(|s| s.as_mut()) {
                        Some(slot) if slot.active && slot.deadline == deadline => slot.callback.take(),
                        _ => None,
                    }
                };
                let mut callback = match callback {
                    Some(cb) => cb,
                    None => continue,
                };
                callback();
                let mut inner = self.inner.borrow_mut();
                if let Some(Some(slot)) = inner.timers.get_mut(idx) {
                    if slot.repeating {
                        slot.deadline = deadline + slot.interval;
                        slot.callback = Some(callback);
                    } else {
                        slot.active = false;
                        slot.callback = Some(callback);
                    }
                }
            }
        }
    }

    pub(crate) fn timer_start(
        &self,
        existing: Option<TimerId>,
        interval: Duration,
        repeating: bool,
        callback: TimerCallback,
    ) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let deadline = Instant::now() + interval;

        if let Some(TimerId(idx)) = existing {
            if let Some(slot) = inner.timers.get_mut(idx).and_then(|s| s.as_mut()) {
                slot.deadline = deadline;
                slot.interval = interval;
                slot.repeating = repeating;
                slot.active = true;
                slot.seq = seq;
                slot.callback = Some(callback);
                return TimerId(idx);
            }
        }

        let slot = TimerSlot {
            deadline,
            interval,
            repeating,
            active: true,
            seq,
            callback: Some(callback),
        };

        if let Some(idx) = inner.free_list.pop() {
            inner.timers[idx] = Some(slot);
            TimerId(idx)
        } else {
            inner.timers.push(Some(slot));
            TimerId(inner.timers.len() - 1)
        }
    }

    pub(crate) fn timer_stop(&self, id: TimerId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(Some(slot)) = inner.timers.get_mut(id.0) {
            slot.active = false;
        }
    }

    pub(crate) fn timer_is_active(&self, id: TimerId) -> bool {
        let inner = self.inner.borrow();
        matches!(inner.timers.get(id.0), Some(Some(slot)) if slot.active)
    }

    pub(crate) fn timer_remove(&self, id: TimerId) {
        let mut inner = self.inner.borrow_mut();
        if id.0 < inner.timers.len() {
            inner.timers[id.0] = None;
            inner.free_list.push(id.0);
        }
    }
}
