// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # VSP display list engine
//!
//! Builds and queues the display lists the VSP executes once per frame.
//!
//! This crate provides:
//! - [`BodyPool`]: fixed-size command buffers sliced from one DMA region
//! - [`DisplayList`]: a primary body plus extra bodies, optionally chained
//! - [`CmdPool`]: extended commands executed before a list (auto-field)
//! - [`DlManager`]: the pending / queued / active commit protocol that is
//!   advanced from the frame end interrupt
//!
//! Hardware access goes through the [`platform`] traits so the whole engine
//! runs against mock registers on the host.
//!
//! ## `no_std` Support
//!
//! The engine is `no_std` + `alloc`. The `std` feature (default) adds the
//! mock platform used by tests and host tools.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod body;
pub mod cmd;
pub mod error;
pub mod list;
pub mod manager;
pub mod platform;

pub use body::{Body, BodyPool};
pub use cmd::{CmdPool, ExtCmd, FieldAddresses};
pub use error::{AllocError, BodyError, DestroyError, HeaderError, ModeError};
pub use list::{DisplayList, HeaderView};
pub use manager::{DlManager, DlMode, DlmConfig, FrameEndFlags};
pub use platform::{DmaAllocator, DmaRegion, Mmio};
pub use vsp_abi::DmaAddr;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod manager_test;
