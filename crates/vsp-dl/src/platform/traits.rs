// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Platform abstraction traits.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU32, Ordering};

use vsp_abi::DmaAddr;

use crate::error::AllocError;

/// Abstraction over a memory-mapped register window.
///
/// Register access takes `&self`: the window is shared between the thread
/// committing display lists and the interrupt handler, and the hardware
/// changes register contents on its own anyway.
pub trait Mmio: Send + Sync {
    /// Read the 32-bit register at `offset`.
    fn read(&self, offset: u32) -> u32;

    /// Write the 32-bit register at `offset`.
    fn write(&self, offset: u32, value: u32);

    /// Read-modify-write: clear `clear`, then set `set`.
    fn modify(&self, offset: u32, clear: u32, set: u32) {
        let value = self.read(offset);
        self.write(offset, (value & !clear) | set);
    }
}

/// Source of device-visible, write-combined memory.
pub trait DmaAllocator {
    /// Allocate `size` bytes the device can read through DMA.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if no device-visible memory is available.
    fn alloc_wc(&self, size: usize) -> Result<DmaRegion, AllocError>;
}

enum Backing {
    Owned(Box<[AtomicU32]>),
    Mapped { ptr: NonNull<AtomicU32>, words: usize },
}

/// A contiguous device-visible memory region.
///
/// The host writes it word by word and the device reads it behind the
/// host's back, so every word is an atomic: no host-side reference ever
/// aliases memory the device may be fetching.
pub struct DmaRegion {
    backing: Backing,
    dma: DmaAddr,
}

// SAFETY: The mapped variant points at memory that lives as long as the
// region (guaranteed by the caller of `from_raw`) and is only accessed
// through atomics.
unsafe impl Send for DmaRegion {}
// SAFETY: See above, all access goes through `AtomicU32`.
unsafe impl Sync for DmaRegion {}

impl DmaRegion {
    /// Create a zeroed host-backed region of `size` bytes at bus address `dma`.
    ///
    /// The size is rounded up to whole words.
    #[must_use]
    pub fn new(dma: DmaAddr, size: usize) -> Self {
        let words = size.div_ceil(4);
        let backing: Vec<AtomicU32> = (0..words).map(|_| AtomicU32::new(0)).collect();
        Self {
            backing: Backing::Owned(backing.into_boxed_slice()),
            dma,
        }
    }

    /// Wrap an existing write-combined mapping.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `words` 32-bit words,
    /// suitably aligned, for the whole lifetime of the returned region, and
    /// must not be accessed through non-atomic references meanwhile.
    #[must_use]
    pub const unsafe fn from_raw(ptr: NonNull<u32>, words: usize, dma: DmaAddr) -> Self {
        Self {
            backing: Backing::Mapped {
                ptr: ptr.cast(),
                words,
            },
            dma,
        }
    }

    fn words(&self) -> &[AtomicU32] {
        match &self.backing {
            Backing::Owned(words) => words,
            // SAFETY: Validity for `words` elements is the contract of `from_raw`.
            Backing::Mapped { ptr, words } => unsafe {
                core::slice::from_raw_parts(ptr.as_ptr(), *words)
            },
        }
    }

    /// Bus address of the first byte.
    #[inline]
    #[must_use]
    pub const fn dma(&self) -> DmaAddr {
        self.dma
    }

    /// Size of the region in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.words().len() * 4
    }

    /// Bus address of word `word`.
    #[inline]
    #[must_use]
    pub const fn word_dma(&self, word: usize) -> DmaAddr {
        self.dma.add((word * 4) as u64)
    }

    /// Whether `addr` lies inside this region.
    #[must_use]
    pub fn contains(&self, addr: DmaAddr) -> bool {
        addr >= self.dma && addr.diff(self.dma) < self.size() as u64
    }

    /// Read word `word`.
    ///
    /// # Panics
    ///
    /// Panics if `word` is outside the region.
    #[must_use]
    pub fn read_word(&self, word: usize) -> u32 {
        self.words()[word].load(Ordering::Acquire)
    }

    /// Write word `word`.
    ///
    /// # Panics
    ///
    /// Panics if `word` is outside the region.
    pub fn write_word(&self, word: usize, value: u32) {
        self.words()[word].store(value, Ordering::Release);
    }
}
