// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Host-side models of the DU and of the event consumers.

use std::sync::Arc;

use vsp_abi::du;
use vsp_dl::platform::{MockRegisters, WriteMode};

use crate::flip::{EventSink, FlipEvent};
use crate::pipe::{DuStatus, FrameCompleteHandler};

/// Device-side model of the DU status registers.
///
/// Writing `DSRCR` clears the written bits of `DSSR`, like the hardware.
/// Status bits are raised by the test.
pub struct MockDu {
    regs: Arc<MockRegisters>,
    channels: usize,
}

impl MockDu {
    /// Model a DU with `channels` channels.
    #[must_use]
    pub fn new(channels: usize) -> Self {
        let regs = Arc::new(MockRegisters::new());
        for index in 0..channels {
            let base = du::channel_base(index);
            regs.set_mode(base + du::DSRCR, WriteMode::Strobe);
            regs.on_write(base + du::DSRCR, move |file, value| {
                file.clear_bits(base + du::DSSR, value & du::DSRCR_MASK);
            });
        }
        Self { regs, channels }
    }

    /// The register window, for handing to the driver.
    #[must_use]
    pub const fn regs(&self) -> &Arc<MockRegisters> {
        &self.regs
    }

    /// Number of modelled channels.
    #[must_use]
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Channel register `reg` of channel `index`.
    #[must_use]
    pub fn reg(&self, index: usize, reg: u32) -> u32 {
        self.regs.get(du::channel_base(index) + reg)
    }

    /// Group register `reg` of the group owning channel `index`.
    #[must_use]
    pub fn group_reg(&self, index: usize, reg: u32) -> u32 {
        self.regs.get(du::group_base(index) + reg)
    }

    /// Raise status bits of channel `index`.
    pub fn raise(&self, index: usize, bits: u32) {
        self.regs.set_bits(du::channel_base(index) + du::DSSR, bits);
    }

    /// A vertical blanking period started on channel `index`.
    pub fn raise_vblank(&self, index: usize) {
        self.raise(index, du::DSSR_VBK);
    }

    /// Status bits of channel `index`.
    #[must_use]
    pub fn status(&self, index: usize) -> u32 {
        self.reg(index, du::DSSR)
    }
}

/// One event delivered to a [`RecordingSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    /// A page flip completed.
    FlipDone {
        /// Channel index.
        crtc: usize,
        /// The flip's event.
        event: FlipEvent,
        /// Blanking sequence at completion.
        sequence: u64,
    },
    /// A blanking period started.
    Vblank {
        /// Channel index.
        crtc: usize,
        /// Blanking sequence.
        sequence: u64,
    },
    /// A writeback frame finished.
    WritebackDone {
        /// Channel index.
        crtc: usize,
    },
}

/// Event sink that records everything it is given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: spin::Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Completed page flips, in order.
    #[must_use]
    pub fn flips(&self) -> Vec<FlipEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::FlipDone { event, .. } => Some(*event),
                _ => None,
            })
            .collect()
    }

    /// Number of writeback completions.
    #[must_use]
    pub fn writebacks(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, SinkEvent::WritebackDone { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn flip_done(&self, crtc: usize, event: FlipEvent, sequence: u64) {
        self.events.lock().push(SinkEvent::FlipDone {
            crtc,
            event,
            sequence,
        });
    }

    fn vblank(&self, crtc: usize, sequence: u64) {
        self.events.lock().push(SinkEvent::Vblank { crtc, sequence });
    }

    fn writeback_done(&self, crtc: usize) {
        self.events.lock().push(SinkEvent::WritebackDone { crtc });
    }
}

/// Frame completion handler that records every status it is given.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    statuses: spin::Mutex<Vec<DuStatus>>,
}

impl RecordingHandler {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn statuses(&self) -> Vec<DuStatus> {
        self.statuses.lock().clone()
    }

    /// Number of frame ends that completed a commit.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.statuses
            .lock()
            .iter()
            .filter(|status| status.complete)
            .count()
    }
}

impl FrameCompleteHandler for RecordingHandler {
    fn frame_complete(&self, status: DuStatus) {
        self.statuses.lock().push(status);
    }
}
