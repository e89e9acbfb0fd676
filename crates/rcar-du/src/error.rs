// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Error types for the pipeline controller.

use std::time::Duration;

use thiserror::Error;
use vsp_dl::{AllocError, BodyError, HeaderError, ModeError};

use crate::crtc::CrtcState;

/// A bounded hardware wait expired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("{what} timed out after {timeout:?}")]
pub struct TimeoutError {
    /// What was being waited for.
    pub what: &'static str,
    /// How long the wait lasted.
    pub timeout: Duration,
}

/// VSP pipe errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PipeError {
    /// The pipe has not been started with a LIF configuration.
    #[error("pipe {index} is not running")]
    NotRunning {
        /// WPF index of the pipe.
        index: usize,
    },
    /// The pipe is already running.
    #[error("pipe {index} is already running")]
    AlreadyRunning {
        /// WPF index of the pipe.
        index: usize,
    },
    /// The device has no such output.
    #[error("output {index} out of range ({count} outputs)")]
    InvalidOutput {
        /// Requested WPF index.
        index: usize,
        /// Outputs of this device.
        count: usize,
    },
    /// No such input.
    #[error("input {input} out of range ({count} inputs)")]
    InputOutOfRange {
        /// Requested input.
        input: usize,
        /// Inputs of this device.
        count: usize,
    },
    /// The plane configuration cannot be displayed.
    #[error("invalid plane configuration: {0}")]
    InvalidPlane(&'static str),
    /// All display lists are in flight; retry after the next frame end.
    #[error("no free display list")]
    Saturated,
    /// A register write did not fit into the display list.
    #[error(transparent)]
    Body(#[from] BodyError),
    /// The display list mode does not support the operation.
    #[error(transparent)]
    Mode(#[from] ModeError),
    /// Extended command data was rejected.
    #[error(transparent)]
    Header(#[from] HeaderError),
    /// Display list memory could not be allocated.
    #[error(transparent)]
    Alloc(#[from] AllocError),
    /// The device did not respond in time.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}

/// CRTC errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CrtcError {
    /// Another enable or disable is in progress.
    #[error("crtc {index} is busy ({state:?})")]
    Busy {
        /// Channel index.
        index: usize,
        /// State at the time of the call.
        state: CrtcState,
    },
    /// The display mode timings are inconsistent.
    #[error("invalid display mode: {0}")]
    InvalidMode(&'static str),
    /// No clock configuration can produce the pixel clock.
    #[error("no dot clock configuration for {target} Hz")]
    ClockUnavailable {
        /// Requested pixel clock.
        target: u64,
    },
    /// A page flip is already queued.
    #[error("page flip already pending on crtc {index}")]
    FlipPending {
        /// Channel index.
        index: usize,
    },
    /// Starting or stopping the VSP pipe failed.
    #[error(transparent)]
    Pipe(#[from] PipeError),
}
