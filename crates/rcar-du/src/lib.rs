// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # R-Car display pipeline controller
//!
//! Drives one display output from mode set to teardown:
//!
//! - [`VspDrmPipe`]: the VSP composition pipe feeding a DU channel. Builds
//!   one display list per atomic update and commits it to the
//!   [`DlManager`](vsp_dl::DlManager).
//! - [`Crtc`]: a DU channel. Plans the dot clock, programs the timings,
//!   and tears the output down in step with vertical blanking.
//! - [`irq`]: the VSP and DU interrupt handlers, the only places where
//!   frame completion is observed.
//!
//! There is no global state. Each device is described by a
//! [`DeviceContext`] that owns its register window, its generation table
//! and its counters.

pub mod clock;
pub mod context;
pub mod crtc;
pub mod error;
pub mod flip;
pub mod irq;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod mode;
pub mod ops;
pub mod pipe;
pub mod vblank;

pub use clock::{ClockPlan, ClockSource, DpllConfig};
pub use context::DeviceContext;
pub use crtc::{Crtc, CrtcConfig, CrtcState, TeardownReport};
pub use error::{CrtcError, PipeError, TimeoutError};
pub use flip::{EventSink, FlipEvent, PageFlip};
pub use irq::{DuIrqHandler, IrqReturn, VspIrqHandler};
pub use mode::{DisplayMode, TimingRegs};
pub use ops::{GenerationOps, ops_for};
pub use pipe::{
    AtomicCommit, DuStatus, FlushConfig, FrameCompleteHandler, LifConfig, PixelFormat,
    PlaneConfig, Rect, VspDrmPipe, WritebackConfig,
};
pub use vblank::VblankWait;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod crtc_test;
#[cfg(test)]
mod flip_test;
#[cfg(test)]
mod irq_test;
