// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! DU channel (CRTC) control.
//!
//! # Lifecycle
//!
//! ```text
//!   Disabled --enable--> Enabling --> Running --disable--> Disabling --> Disabled
//! ```
//!
//! Enabling programs the dot clock and timings, starts the VSP pipe (when
//! planes come from the VSP) and finally the timing generator. Disabling
//! removes all planes, waits until the hardware can no longer latch the old
//! plane configuration, completes any outstanding page flip and stops the
//! pipe and the timing generator.
//!
//! # Vertical blanking wait on disable
//!
//! Plane changes are latched at the start of vertical blanking. After the
//! planes are removed one blanking period must pass. If a blanking
//! interrupt is already pending when the planes are removed, that interrupt
//! belongs to a period that started before the change, so two interrupts
//! are awaited instead.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info, warn};
use vsp_abi::{DeviceInfo, Generation, du};
use vsp_dl::Mmio;

use crate::clock::ClockPlan;
use crate::error::{CrtcError, PipeError, TimeoutError};
use crate::flip::{EventSink, FlipEvent, PageFlip};
use crate::irq::IrqReturn;
use crate::mode::DisplayMode;
use crate::ops::{GenerationOps, ops_for};
use crate::pipe::{DuStatus, FrameCompleteHandler, LifConfig, VspDrmPipe};
use crate::vblank::VblankWait;

/// Default bound on the vertical blanking wait of a disable.
pub const VBLANK_TIMEOUT: Duration = Duration::from_millis(100);

/// Default bound on the page flip wait of a disable.
pub const FLIP_TIMEOUT: Duration = Duration::from_millis(50);

/// CRTC lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrtcState {
    /// Timing generator stopped.
    Disabled,
    /// An enable is in progress.
    Enabling,
    /// Scanning out.
    Running,
    /// A disable is in progress.
    Disabling,
}

/// Static configuration of one CRTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrtcConfig {
    /// DU channel index.
    pub index: usize,
    /// Functional clock rate in Hz.
    pub clock_rate: u64,
    /// DCLKIN rate in Hz, if an external clock is wired.
    pub ext_clock_rate: Option<u64>,
    /// The channel's dot clock can come from a display PLL.
    pub has_dpll: bool,
    /// Bound on the vertical blanking wait.
    pub vblank_timeout: Duration,
    /// Bound on the page flip wait.
    pub flip_timeout: Duration,
}

impl CrtcConfig {
    /// Configuration of channel `index` on `info` hardware.
    #[must_use]
    pub const fn new(info: &DeviceInfo, index: usize, clock_rate: u64) -> Self {
        Self {
            index,
            clock_rate,
            ext_clock_rate: None,
            has_dpll: info.has_dpll(index),
            vblank_timeout: VBLANK_TIMEOUT,
            flip_timeout: FLIP_TIMEOUT,
        }
    }

    /// Wire an external clock of `rate` Hz.
    #[must_use]
    pub const fn with_ext_clock(mut self, rate: u64) -> Self {
        self.ext_clock_rate = Some(rate);
        self
    }

    /// Override the disable timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, vblank: Duration, flip: Duration) -> Self {
        self.vblank_timeout = vblank;
        self.flip_timeout = flip;
        self
    }
}

/// What happened while disabling a CRTC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Blanking interrupts the disable waited for (1 or 2).
    pub vblank_waits: u32,
    /// The blanking wait expired.
    pub vblank_timeout: bool,
    /// A page flip was force-completed.
    pub flip_timeout: bool,
    /// Stopping the VSP pipe failed.
    pub pipe_error: Option<PipeError>,
}

/// Event state shared with the interrupt handlers.
struct CrtcEvents {
    index: usize,
    vblank: VblankWait,
    flip: PageFlip,
    sequence: AtomicU64,
    sink: Arc<dyn EventSink>,
}

impl CrtcEvents {
    fn finish_page_flip(&self) {
        if let Some(event) = self.flip.take() {
            let sequence = self.sequence.load(Ordering::Relaxed);
            self.sink.flip_done(self.index, event, sequence);
        }
    }
}

impl FrameCompleteHandler for CrtcEvents {
    fn frame_complete(&self, status: DuStatus) {
        if status.complete {
            self.finish_page_flip();
        }
        if status.writeback {
            self.sink.writeback_done(self.index);
        }
    }
}

struct CrtcInner {
    state: CrtcState,
    mode: Option<DisplayMode>,
    clock: Option<ClockPlan>,
}

/// One DU channel.
pub struct Crtc<M: Mmio> {
    config: CrtcConfig,
    regs: Arc<M>,
    ops: &'static dyn GenerationOps,
    pipe: Option<Arc<VspDrmPipe<M>>>,
    inner: Mutex<CrtcInner>,
    events: Arc<CrtcEvents>,
}

impl<M: Mmio> Crtc<M> {
    /// A disabled CRTC on the DU register window `regs`.
    #[must_use]
    pub fn new(
        generation: Generation,
        regs: Arc<M>,
        config: CrtcConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            regs,
            ops: ops_for(generation),
            pipe: None,
            inner: Mutex::new(CrtcInner {
                state: CrtcState::Disabled,
                mode: None,
                clock: None,
            }),
            events: Arc::new(CrtcEvents {
                index: config.index,
                vblank: VblankWait::new(),
                flip: PageFlip::new(),
                sequence: AtomicU64::new(0),
                sink,
            }),
            config,
        }
    }

    /// Feed the planes of this CRTC from `pipe`.
    #[must_use]
    pub fn with_pipe(mut self, pipe: Arc<VspDrmPipe<M>>) -> Self {
        self.pipe = Some(pipe);
        self
    }

    fn lock(&self) -> MutexGuard<'_, CrtcInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// DU channel index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.config.index
    }

    /// Static configuration.
    #[must_use]
    pub const fn config(&self) -> &CrtcConfig {
        &self.config
    }

    /// Generation-specific behavior.
    #[must_use]
    pub fn ops(&self) -> &'static dyn GenerationOps {
        self.ops
    }

    /// The VSP pipe feeding this CRTC.
    #[must_use]
    pub const fn pipe(&self) -> Option<&Arc<VspDrmPipe<M>>> {
        self.pipe.as_ref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CrtcState {
        self.lock().state
    }

    /// Mode being scanned out.
    #[must_use]
    pub fn mode(&self) -> Option<DisplayMode> {
        self.lock().mode
    }

    /// Dot clock in use.
    #[must_use]
    pub fn clock_plan(&self) -> Option<ClockPlan> {
        self.lock().clock
    }

    /// Vertical blanking periods seen so far.
    #[must_use]
    pub fn vblank_sequence(&self) -> u64 {
        self.events.sequence.load(Ordering::Relaxed)
    }

    /// Blanking interrupts a disable is still waiting for.
    #[must_use]
    pub fn vblank_remaining(&self) -> u32 {
        self.events.vblank.remaining()
    }

    /// Blanking interrupts the last disable decided to wait for.
    #[must_use]
    pub fn last_vblank_arm(&self) -> u32 {
        self.events.vblank.last_armed()
    }

    // =========================================================================
    // Register access
    // =========================================================================

    fn read(&self, reg: u32) -> u32 {
        self.regs.read(du::channel_base(self.config.index) + reg)
    }

    fn write(&self, reg: u32, value: u32) {
        self.regs
            .write(du::channel_base(self.config.index) + reg, value);
    }

    fn modify(&self, reg: u32, clear: u32, set: u32) {
        self.regs
            .modify(du::channel_base(self.config.index) + reg, clear, set);
    }

    fn group_write(&self, reg: u32, value: u32) {
        self.regs
            .write(du::group_base(self.config.index) + reg, value);
    }

    // =========================================================================
    // Enable
    // =========================================================================

    /// Start scanning out `mode`.
    ///
    /// Enabling a running CRTC does nothing. On failure the CRTC is left
    /// disabled.
    pub fn enable(&self, mode: &DisplayMode) -> Result<(), CrtcError> {
        let index = self.config.index;
        {
            let mut inner = self.lock();
            match inner.state {
                CrtcState::Running => return Ok(()),
                CrtcState::Disabled => inner.state = CrtcState::Enabling,
                state => return Err(CrtcError::Busy { index, state }),
            }
        }

        let result = self.start(mode);

        let mut inner = self.lock();
        match result {
            Ok(plan) => {
                inner.state = CrtcState::Running;
                inner.mode = Some(*mode);
                inner.clock = Some(plan);
                info!(
                    crtc = index,
                    width = mode.hdisplay,
                    height = mode.vdisplay,
                    rate = plan.rate,
                    "crtc enabled"
                );
                Ok(())
            }
            Err(err) => {
                inner.state = CrtcState::Disabled;
                error!(crtc = index, %err, "crtc enable failed");
                Err(err)
            }
        }
    }

    fn start(&self, mode: &DisplayMode) -> Result<ClockPlan, CrtcError> {
        let index = self.config.index;
        let timing = self.ops.timing(mode)?;
        let plan = self.ops.plan_clock(&self.config, mode.clock)?;
        debug!(crtc = index, source = ?plan.source, rate = plan.rate, "dot clock planned");

        if let Some(dpllcr) = plan.dpllcr() {
            self.group_write(du::DPLLCR, dpllcr);
        }
        self.group_write(du::escr(index), plan.escr());

        self.write(du::DSMR, mode.dsmr());
        for (reg, value) in timing.writes() {
            self.write(reg, value);
        }

        match &self.pipe {
            Some(pipe) => {
                let handler: Arc<dyn FrameCompleteHandler> = self.events.clone();
                let mut lif = LifConfig::new(mode.hdisplay, mode.vdisplay).with_handler(handler);
                if mode.interlaced {
                    lif = lif.interlaced();
                }
                pipe.setup_lif(Some(lif))?;
                self.group_write(du::dspr(index), du::DSPR_VSP);
            }
            None => self.group_write(du::dspr(index), 0),
        }

        self.write(du::DSRCR, du::DSRCR_MASK);
        self.modify(du::DIER, 0, du::DIER_VBE);

        let mut dsysr = du::DSYSR_TVM_MASTER | du::DSYSR_DEN;
        if mode.interlaced {
            dsysr |= du::DSYSR_ILTS;
        }
        self.modify(
            du::DSYSR,
            du::DSYSR_TVM_MASK | du::DSYSR_DRES | du::DSYSR_ILTS,
            dsysr,
        );
        Ok(plan)
    }

    // =========================================================================
    // Disable
    // =========================================================================

    /// Stop scanning out.
    ///
    /// Timeouts do not fail the disable; they are logged and recorded in
    /// the report. Disabling a disabled CRTC returns an empty report.
    pub fn disable(&self) -> Result<TeardownReport, CrtcError> {
        let index = self.config.index;
        {
            let mut inner = self.lock();
            match inner.state {
                CrtcState::Disabled => return Ok(TeardownReport::default()),
                CrtcState::Running => inner.state = CrtcState::Disabling,
                state => return Err(CrtcError::Busy { index, state }),
            }
        }

        let report = self.stop();

        let mut inner = self.lock();
        inner.state = CrtcState::Disabled;
        inner.mode = None;
        inner.clock = None;
        info!(crtc = index, vblank_waits = report.vblank_waits, "crtc disabled");
        Ok(report)
    }

    fn stop(&self) -> TeardownReport {
        let index = self.config.index;
        let mut report = TeardownReport::default();

        report.vblank_waits = self.events.vblank.arm_with(|| {
            self.group_write(du::dspr(index), 0);
            if self.read(du::DSSR) & du::DSSR_VBK != 0 {
                2
            } else {
                1
            }
        });
        if self.events.vblank.wait(self.config.vblank_timeout).is_err() {
            warn!(crtc = index, "vertical blanking timeout");
            report.vblank_timeout = true;
        }

        report.flip_timeout = self.wait_page_flip().is_err();

        self.modify(du::DIER, du::DIER_VBE, 0);

        if let Some(pipe) = &self.pipe {
            if let Err(err) = pipe.setup_lif(None) {
                report.pipe_error = Some(err);
            }
        }

        self.modify(
            du::DSYSR,
            du::DSYSR_TVM_MASK | du::DSYSR_DEN,
            du::DSYSR_TVM_SWITCH | du::DSYSR_DRES,
        );
        report
    }

    // =========================================================================
    // Page flips
    // =========================================================================

    /// Deliver `event` when the next committed frame reaches the screen.
    pub fn queue_page_flip(&self, event: FlipEvent) -> Result<(), CrtcError> {
        self.events
            .flip
            .queue(event)
            .map_err(|_| CrtcError::FlipPending {
                index: self.config.index,
            })
    }

    /// Complete the pending page flip, if any.
    pub fn finish_page_flip(&self) {
        self.events.finish_page_flip();
    }

    /// Whether a page flip is pending.
    #[must_use]
    pub fn flip_pending(&self) -> bool {
        self.events.flip.is_pending()
    }

    /// Wait for the pending page flip.
    ///
    /// On timeout the flip is completed anyway so its event is not lost.
    pub fn wait_page_flip(&self) -> Result<(), TimeoutError> {
        let timeout = self.config.flip_timeout;
        if self.events.flip.wait(timeout) {
            return Ok(());
        }

        warn!(crtc = self.config.index, "page flip timeout");
        self.finish_page_flip();
        Err(TimeoutError {
            what: "page flip",
            timeout,
        })
    }

    // =========================================================================
    // Interrupt
    // =========================================================================

    /// DU channel interrupt.
    ///
    /// Clears exactly the status bits it read; bits raised after the read
    /// stay set for the next interrupt.
    pub fn irq(&self) -> IrqReturn {
        let mut status = 0;
        let vblank = self.events.vblank.irq_with(|| {
            status = self.read(du::DSSR);
            self.write(du::DSRCR, status & du::DSRCR_MASK);
            status & du::DSSR_VBK != 0
        });

        if vblank {
            let sequence = self.events.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            self.events.sink.vblank(self.config.index, sequence);
            if self.ops.completes_flip_on_vblank() {
                self.finish_page_flip();
            }
        }

        if status & du::DSRCR_MASK == 0 {
            IrqReturn::None
        } else {
            IrqReturn::Handled
        }
    }
}

impl<M: Mmio> fmt::Debug for Crtc<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Crtc")
            .field("index", &self.config.index)
            .field("generation", &self.ops.generation())
            .field("state", &inner.state)
            .field("mode", &inner.mode)
            .finish_non_exhaustive()
    }
}
