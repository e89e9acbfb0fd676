// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Platform abstraction for the display list engine.
//!
//! This module provides abstractions over register access and
//! device-visible memory, allowing the engine to be tested on the host.

#[cfg(test)]
mod mock_test;


// Mock requires std, only available with std or test
#[cfg(any(test, feature = "std"))]
mod mock;
mod mmio;
mod traits;

#[cfg(any(test, feature = "std"))]
pub use mock::{MOCK_DMA_BASE, MockDmaAllocator, MockRegisters, MockVsp, RegisterFile, WriteMode};
pub use mmio::MmioRegion;
pub use traits::{DmaAllocator, DmaRegion, Mmio};
