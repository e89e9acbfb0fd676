// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Display list bodies and the pool they are drawn from.
//!
//! A [`BodyPool`] is one device-visible allocation sliced into `count`
//! bodies of equal stride:
//!
//! ```text
//! base                                     base + count * stride
//! +----------------------+----------------------+----
//! | entries | extra      | entries | extra      | ...
//! +----------------------+----------------------+----
//!   body 0                 body 1
//! ```
//!
//! The extra space behind the entries holds the display list header when
//! the pool backs primary bodies in header mode.
//!
//! A [`Body`] is an `(pool, index)` handle. Handles are reference counted:
//! [`Body::share`] takes another reference, and dropping a handle releases
//! one. The body returns to the free list, with its entry count reset, when
//! the last reference goes away.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use spin::Mutex;
use tracing::{debug, trace, warn};
use vsp_abi::DmaAddr;
use vsp_abi::layout::{ENTRY_SIZE, ENTRY_WORDS};

use crate::error::{AllocError, BodyError, DestroyError};
use crate::platform::{DmaAllocator, DmaRegion};

/// Per-body bookkeeping.
struct BodySlot {
    refcount: AtomicU32,
    num_entries: AtomicUsize,
}

/// State shared between a pool and every body handle drawn from it.
struct PoolShared {
    region: DmaRegion,
    /// Bytes between consecutive bodies.
    stride: usize,
    max_entries: usize,
    slots: Box<[BodySlot]>,
    free: Mutex<VecDeque<usize>>,
}

impl PoolShared {
    const fn base_word(&self, index: usize) -> usize {
        index * self.stride / 4
    }

    const fn extra_word(&self, index: usize, word: usize) -> usize {
        self.base_word(index) + self.max_entries * ENTRY_WORDS + word
    }
}

/// Pool of fixed-size display list bodies backed by one DMA region.
pub struct BodyPool {
    shared: Arc<PoolShared>,
}

impl BodyPool {
    /// Allocate `count` bodies of `entries` entries each.
    ///
    /// Every body is followed by `extra_bytes` of space (rounded up to
    /// 8 bytes) for a display list header. All bodies start on the free
    /// list.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidGeometry`] for an empty geometry and
    /// propagates allocator failures. Nothing is retained on failure.
    pub fn create<A: DmaAllocator + ?Sized>(
        alloc: &A,
        count: usize,
        entries: usize,
        extra_bytes: usize,
    ) -> Result<Self, AllocError> {
        let stride = entries
            .checked_mul(ENTRY_SIZE)
            .and_then(|bytes| bytes.checked_add(extra_bytes.next_multiple_of(8)))
            .unwrap_or(0);
        let size = stride.checked_mul(count).unwrap_or(0);
        if count == 0 || entries == 0 || size == 0 {
            return Err(AllocError::InvalidGeometry { count, stride });
        }

        let region = alloc.alloc_wc(size)?;

        let slots = (0..count)
            .map(|_| BodySlot {
                refcount: AtomicU32::new(0),
                num_entries: AtomicUsize::new(0),
            })
            .collect();

        debug!(count, entries, stride, dma = %region.dma(), "body pool created");

        Ok(Self {
            shared: Arc::new(PoolShared {
                region,
                stride,
                max_entries: entries,
                slots,
                free: Mutex::new((0..count).collect()),
            }),
        })
    }

    /// Check out a body, or `None` if every body is in use.
    ///
    /// The returned body is empty and holds the only reference.
    #[must_use]
    pub fn acquire(&self) -> Option<Body> {
        let index = self.shared.free.lock().pop_front()?;
        let slot = &self.shared.slots[index];
        debug_assert_eq!(slot.refcount.load(Ordering::Acquire), 0);
        slot.refcount.store(1, Ordering::Release);
        trace!(index, "body acquired");
        Some(Body {
            pool: Arc::clone(&self.shared),
            index,
        })
    }

    /// Bodies currently on the free list.
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.free.lock().len()
    }

    /// Bodies the pool was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }

    /// Entries each body can hold.
    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.shared.max_entries
    }

    /// Bytes between consecutive bodies.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.shared.stride
    }

    /// Bus address of the backing region.
    #[must_use]
    pub fn dma(&self) -> DmaAddr {
        self.shared.region.dma()
    }

    /// Size of the backing region in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shared.region.size()
    }

    /// Tear the pool down, checking that every body came back.
    ///
    /// Outstanding bodies keep the backing region alive until they are
    /// dropped, so an early destroy is reported but never unsound.
    pub fn destroy(self) -> Result<(), DestroyError> {
        let capacity = self.capacity();
        let outstanding = capacity - self.available();
        if outstanding == 0 {
            Ok(())
        } else {
            Err(DestroyError {
                outstanding,
                capacity,
            })
        }
    }
}

impl Drop for BodyPool {
    fn drop(&mut self) {
        let outstanding = self.capacity() - self.available();
        if outstanding != 0 {
            warn!(outstanding, "body pool dropped with bodies checked out");
        }
    }
}

impl fmt::Debug for BodyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyPool")
            .field("dma", &self.dma())
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("max_entries", &self.max_entries())
            .finish()
    }
}

/// Handle to one checked-out body.
pub struct Body {
    pool: Arc<PoolShared>,
    index: usize,
}

impl Body {
    fn slot(&self) -> &BodySlot {
        &self.pool.slots[self.index]
    }

    /// Index of this body within its pool.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Take another reference to the same body.
    ///
    /// Shared bodies are frozen: [`Body::write`] fails until all but one
    /// reference is dropped.
    #[must_use]
    pub fn share(&self) -> Self {
        self.slot().refcount.fetch_add(1, Ordering::AcqRel);
        Self {
            pool: Arc::clone(&self.pool),
            index: self.index,
        }
    }

    /// Current reference count.
    #[must_use]
    pub fn refcount(&self) -> u32 {
        self.slot().refcount.load(Ordering::Acquire)
    }

    /// Append one register write.
    ///
    /// # Errors
    ///
    /// Fails without writing anything if the body is full or shared.
    pub fn write(&mut self, reg: u32, value: u32) -> Result<(), BodyError> {
        let refcount = self.refcount();
        if refcount > 1 {
            tracing::error!(index = self.index, refcount, "write to shared body");
            return Err(BodyError::Shared { refcount });
        }

        let slot = self.slot();
        let n = slot.num_entries.load(Ordering::Relaxed);
        if n >= self.pool.max_entries {
            tracing::error!(
                index = self.index,
                max_entries = self.pool.max_entries,
                "body full, register write dropped"
            );
            return Err(BodyError::Full {
                max_entries: self.pool.max_entries,
            });
        }

        let word = self.pool.base_word(self.index) + n * ENTRY_WORDS;
        self.pool.region.write_word(word, reg);
        self.pool.region.write_word(word + 1, value);
        slot.num_entries.store(n + 1, Ordering::Release);
        Ok(())
    }

    /// Number of entries written so far.
    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.slot().num_entries.load(Ordering::Acquire)
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.pool.max_entries
    }

    /// Whether no entries have been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_entries() == 0
    }

    /// Bus address of the first entry.
    #[must_use]
    pub fn dma(&self) -> DmaAddr {
        self.pool.region.word_dma(self.pool.base_word(self.index))
    }

    /// Bytes of entries the device has to read.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.num_entries() * ENTRY_SIZE
    }

    /// Entry `i` as `(register, value)`.
    #[must_use]
    pub fn entry(&self, i: usize) -> Option<(u32, u32)> {
        if i >= self.num_entries() {
            return None;
        }
        let word = self.pool.base_word(self.index) + i * ENTRY_WORDS;
        Some((
            self.pool.region.read_word(word),
            self.pool.region.read_word(word + 1),
        ))
    }

    /// Entries in write order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.num_entries()).filter_map(|i| self.entry(i))
    }

    /// Whether this body was drawn from `pool`.
    #[must_use]
    pub fn belongs_to(&self, pool: &BodyPool) -> bool {
        Arc::ptr_eq(&self.pool, &pool.shared)
    }

    /// Discard all entries of a body that stays checked out.
    pub(crate) fn reset(&mut self) {
        self.slot().num_entries.store(0, Ordering::Release);
    }

    /// Bus address of word `word` of the extra space.
    pub(crate) fn extra_dma(&self, word: usize) -> DmaAddr {
        self.pool
            .region
            .word_dma(self.pool.extra_word(self.index, word))
    }

    /// Bytes of extra space behind the entries.
    pub(crate) fn extra_size(&self) -> usize {
        self.pool.stride - self.pool.max_entries * ENTRY_SIZE
    }

    pub(crate) fn read_extra(&self, word: usize) -> u32 {
        debug_assert!(word * 4 < self.extra_size());
        self.pool
            .region
            .read_word(self.pool.extra_word(self.index, word))
    }

    pub(crate) fn write_extra(&self, word: usize, value: u32) {
        debug_assert!(word * 4 < self.extra_size());
        self.pool
            .region
            .write_word(self.pool.extra_word(self.index, word), value);
    }
}

impl Drop for Body {
    fn drop(&mut self) {
        let slot = &self.pool.slots[self.index];
        if slot.refcount.fetch_sub(1, Ordering::AcqRel) == 1 {
            slot.num_entries.store(0, Ordering::Release);
            self.pool.free.lock().push_back(self.index);
            trace!(index = self.index, "body released");
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("index", &self.index)
            .field("dma", &self.dma())
            .field("entries", &self.num_entries())
            .field("refcount", &self.refcount())
            .finish()
    }
}
