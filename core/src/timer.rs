//! One-shot / auto-repeating deadline primitive (C3), built on [`EventLoop`].
//!
//! Restarting an active timer resets its deadline and discards any
//! pending fire; dropping a `Timer` cancels it and removes its slot from
//! the owning `EventLoop` so a freed timer can never fire into dropped
//! state.

use std::time::Duration;

use crate::event_loop::{EventLoop, TimerId};

pub struct Timer {
    event_loop: EventLoop,
    id: Option<TimerId>,
}

impl Timer {
    pub fn new(event_loop: &EventLoop) -> Timer {
        Timer {
            event_loop: event_loop.clone(),
            id: None,
        }
    }

    /// Arms the timer to fire after `interval`. If `repeating`, it
    /// re-arms itself for `interval` again measured from the instant it
    /// was due to fire (not from when the callback returned), avoiding
    /// cumulative drift from slow callbacks.
    pub fn start<F>(&mut self, interval: Duration, repeating: bool, callback: F)
    where
        F: FnMut() + 'static,
    {
        let id = self.event_loop.timer_start(self.id, interval, repeating, Box::new(callback));
        self.id = Some(id);
    }

    pub fn stop(&mut self) {
        if let Some(id) = self.id {
            self.event_loop.timer_stop(id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.id.map_or(false, |id| self.event_loop.timer_is_active(id))
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.event_loop.timer_remove(id);
        }
    }
}
