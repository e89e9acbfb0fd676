// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Volatile MMIO register window.

use core::ptr::{NonNull, read_volatile, write_volatile};

use super::traits::Mmio;

/// A mapped register window accessed with volatile loads and stores.
pub struct MmioRegion {
    base: NonNull<u32>,
    /// Size of the window in bytes.
    len: usize,
}

// SAFETY: MMIO registers may be accessed from any CPU; the device
// serializes individual 32-bit accesses.
unsafe impl Send for MmioRegion {}
// SAFETY: See above.
unsafe impl Sync for MmioRegion {}

impl MmioRegion {
    /// Wrap a mapped register window.
    ///
    /// # Safety
    ///
    /// `base` must point to a device mapping of at least `len` bytes that
    /// stays mapped for the lifetime of the returned value.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u32>, len: usize) -> Self {
        Self { base, len }
    }

    /// Size of the window in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the window is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn reg(&self, offset: u32) -> *mut u32 {
        let offset = offset as usize;
        assert!(
            offset % 4 == 0 && offset + 4 <= self.len,
            "register offset {offset:#x} outside {:#x} byte window",
            self.len
        );
        self.base.as_ptr().wrapping_add(offset / 4)
    }
}

impl Mmio for MmioRegion {
    fn read(&self, offset: u32) -> u32 {
        // SAFETY: `reg` checked the offset against the mapping size.
        unsafe { read_volatile(self.reg(offset)) }
    }

    fn write(&self, offset: u32, value: u32) {
        // SAFETY: `reg` checked the offset against the mapping size.
        unsafe { write_volatile(self.reg(offset), value) }
    }
}
