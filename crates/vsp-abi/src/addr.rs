// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Device-visible address type.
//!
//! The VSP fetches display lists and pixel data through its own bus view of
//! memory. Those addresses are not CPU pointers, and this newtype keeps them
//! from being mixed up with offsets or register values.

use core::fmt;
use core::ops::Add;

/// A bus address the device can DMA from or to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct DmaAddr(u64);

impl DmaAddr {
    /// Create a new DMA address.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Create a null (zero) DMA address.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self(0)
    }

    /// Check if this is a null address.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Get the raw address value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The value programmed into 32-bit address registers and headers.
    ///
    /// The VSP display list engine only sees the low 32 bits; buffers are
    /// allocated below 4 GiB.
    #[inline]
    #[must_use]
    pub const fn as_reg(self) -> u32 {
        self.0 as u32
    }

    /// Add a byte offset to this address.
    #[inline]
    #[must_use]
    pub const fn add(self, offset: u64) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    /// Byte distance from `base` to this address.
    #[inline]
    #[must_use]
    pub const fn diff(self, base: Self) -> u64 {
        self.0.wrapping_sub(base.0)
    }

    /// Check if this address is aligned to the given alignment.
    ///
    /// Returns `None` if alignment is zero or not a power of two.
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, alignment: u64) -> Option<bool> {
        if !alignment.is_power_of_two() {
            return None;
        }
        Some((self.0 & (alignment - 1)) == 0)
    }
}

impl fmt::Debug for DmaAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DmaAddr({:#x})", self.0)
    }
}

impl fmt::Display for DmaAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for DmaAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

impl Add<u64> for DmaAddr {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self::add(self, rhs)
    }
}
