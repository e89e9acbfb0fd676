// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Counting wait for vertical blanking interrupts.
//!
//! Disabling a CRTC must not return while the hardware may still latch the
//! plane configuration of the frame being scanned out. The disabling thread
//! arms a counter with the number of blanking interrupts to wait for, and
//! the interrupt handler counts it down.
//!
//! Arming and counting both run under the same lock as the status read that
//! decides the count. An interrupt can therefore never fall between reading
//! the status and arming the counter.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::TimeoutError;

/// Counter of outstanding vertical blanking interrupts.
#[derive(Debug, Default)]
pub struct VblankWait {
    count: Mutex<u32>,
    cond: Condvar,
    armed: AtomicU32,
}

impl VblankWait {
    /// An idle counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, u32> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm the counter with the value returned by `decide`.
    ///
    /// `decide` runs with the counter locked, so an interrupt counting the
    /// counter down waits until it returns.
    pub fn arm_with(&self, decide: impl FnOnce() -> u32) -> u32 {
        let mut count = self.lock();
        let wanted = decide();
        *count = wanted;
        self.armed.store(wanted, Ordering::Relaxed);
        wanted
    }

    /// Interrupt side: run `observe` with the counter locked and count one
    /// blanking interrupt down if it returns `true`.
    ///
    /// Returns what `observe` returned.
    pub fn irq_with(&self, observe: impl FnOnce() -> bool) -> bool {
        let mut count = self.lock();
        let vblank = observe();
        if vblank && *count > 0 {
            *count -= 1;
            if *count == 0 {
                self.cond.notify_all();
            }
        }
        vblank
    }

    /// Wait until the counter reaches zero or `timeout` expires.
    ///
    /// The counter is cleared either way.
    pub fn wait(&self, timeout: Duration) -> Result<(), TimeoutError> {
        let count = self.lock();
        let (mut count, result) = self
            .cond
            .wait_timeout_while(count, timeout, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);

        if result.timed_out() && *count > 0 {
            *count = 0;
            return Err(TimeoutError {
                what: "vertical blanking",
                timeout,
            });
        }
        Ok(())
    }

    /// Interrupts still awaited.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        *self.lock()
    }

    /// Value of the last arming.
    #[must_use]
    pub fn last_armed(&self) -> u32 {
        self.armed.load(Ordering::Relaxed)
    }
}
