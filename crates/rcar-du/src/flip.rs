// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Page flip completion and user-visible events.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Completion token of a page flip, handed back to the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipEvent {
    /// Opaque value chosen by the requester.
    pub cookie: u64,
}

/// Receiver of CRTC events.
///
/// Called from interrupt context; implementations must not block.
pub trait EventSink: Send + Sync {
    /// A page flip completed on `crtc` at vertical blank `sequence`.
    fn flip_done(&self, crtc: usize, event: FlipEvent, sequence: u64);

    /// A vertical blanking period started on `crtc`.
    fn vblank(&self, crtc: usize, sequence: u64) {
        let _ = (crtc, sequence);
    }

    /// A writeback frame finished on `crtc`.
    fn writeback_done(&self, crtc: usize) {
        let _ = crtc;
    }
}

/// The single outstanding page flip of a CRTC.
#[derive(Debug, Default)]
pub struct PageFlip {
    event: Mutex<Option<FlipEvent>>,
    cond: Condvar,
}

impl PageFlip {
    /// No flip pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<FlipEvent>> {
        self.event.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a pending flip.
    ///
    /// Returns the event back if another flip is still pending.
    pub fn queue(&self, event: FlipEvent) -> Result<(), FlipEvent> {
        let mut pending = self.lock();
        if pending.is_some() {
            return Err(event);
        }
        *pending = Some(event);
        Ok(())
    }

    /// Complete the pending flip, waking waiters.
    pub fn take(&self) -> Option<FlipEvent> {
        let event = self.lock().take();
        if event.is_some() {
            self.cond.notify_all();
        }
        event
    }

    /// Whether a flip is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Wait until no flip is pending.
    ///
    /// Returns `false` if a flip is still pending after `timeout`.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> bool {
        let pending = self.lock();
        let (pending, _) = self
            .cond
            .wait_timeout_while(pending, timeout, |pending| pending.is_some())
            .unwrap_or_else(PoisonError::into_inner);
        pending.is_none()
    }
}
