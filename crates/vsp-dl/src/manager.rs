// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Display list manager and commit protocol.
//!
//! One manager drives one device output. Lists move through three slots:
//!
//! ```text
//!   acquire            commit                frame end            frame end
//! free ──────► caller ──────► pending ─────────► queued ─────────► active ──► free
//!                       │         (device busy)     ▲
//!                       └───────────────────────────┘ (device idle)
//! ```
//!
//! - **queued**: programmed into the device, waiting to be fetched at the
//!   next frame start.
//! - **pending**: committed while the device had not fetched the queued
//!   list yet. A later commit replaces it.
//! - **active**: fetched by the device and being executed (looping, in
//!   continuous mode).
//!
//! Whether the device fetched the queued list is read back from the
//! device, never tracked in software: the frame end interrupt and a commit
//! can race, and only the device knows which side won.
//!
//! All slot transitions happen under one spin lock shared by [`commit`]
//! and [`irq_frame_end`]. Lists leaving a slot are released after the lock
//! is dropped.
//!
//! [`commit`]: DlManager::commit
//! [`irq_frame_end`]: DlManager::irq_frame_end

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::fmt;
use core::ops::{BitOr, BitOrAssign};

use spin::Mutex;
use tracing::{debug, error, trace};
use vsp_abi::DeviceInfo;
use vsp_abi::layout::{DL_NUM_ENTRIES, header_size};
use vsp_abi::vsp;

use crate::body::{Body, BodyPool};
use crate::cmd::CmdPool;
use crate::error::AllocError;
use crate::list::{DisplayList, ListHome, ListParts};
use crate::platform::{DmaAllocator, Mmio};

// =============================================================================
// Configuration
// =============================================================================

/// How the device locates the bodies of a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DlMode {
    /// A header references up to eight bodies and may chain lists.
    Header,
    /// The device reads exactly one body programmed through registers.
    Headerless,
}

/// Configuration of one display list manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DlmConfig {
    /// Device output (WPF) index.
    pub index: usize,
    /// Header or headerless operation.
    pub mode: DlMode,
    /// Every commit is started individually instead of looping.
    pub singleshot: bool,
    /// Number of display lists.
    pub prealloc: usize,
    /// Bodies beyond the primary ones, handed out by [`DlManager::get_body`].
    pub extra_bodies: usize,
    /// Entries per body.
    pub entries: usize,
    /// Reserve extended headers and a pre-command per list.
    pub extended: bool,
}

impl DlmConfig {
    /// Configuration of a display pipe output on `info`'s generation.
    ///
    /// Display pipes run in continuous mode. Header mode and extended
    /// lists follow the generation table.
    #[must_use]
    pub const fn for_generation(info: &DeviceInfo, index: usize) -> Self {
        let mode = if info.header_display_lists {
            DlMode::Header
        } else {
            DlMode::Headerless
        };
        Self {
            index,
            mode,
            singleshot: false,
            prealloc: 64,
            extra_bodies: 1,
            entries: DL_NUM_ENTRIES,
            extended: info.extended_dl && info.header_display_lists,
        }
    }

    /// Switch to single-shot operation (memory to memory pipes).
    ///
    /// Single-shot managers always use header mode.
    #[must_use]
    pub const fn singleshot(mut self) -> Self {
        self.singleshot = true;
        self.mode = DlMode::Header;
        self
    }

    /// Set the number of display lists.
    #[must_use]
    pub const fn with_prealloc(mut self, prealloc: usize) -> Self {
        self.prealloc = prealloc;
        self
    }

    /// Set the number of entries per body.
    #[must_use]
    pub const fn with_entries(mut self, entries: usize) -> Self {
        self.entries = entries;
        self
    }

    /// Set the number of extra bodies.
    #[must_use]
    pub const fn with_extra_bodies(mut self, extra_bodies: usize) -> Self {
        self.extra_bodies = extra_bodies;
        self
    }
}

// =============================================================================
// Frame end flags
// =============================================================================

/// Outcome of a frame end, and the flags a list is committed with.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct FrameEndFlags(u32);

impl FrameEndFlags {
    /// A committed list reached the device and the previous one completed.
    pub const COMPLETED: Self = Self(1 << 0);

    /// The completed list was committed by the driver itself.
    pub const INTERNAL: Self = Self(1 << 1);

    /// The active list's writeback capture finished.
    pub const WRITEBACK: Self = Self(1 << 2);

    /// No flags.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether no flag is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether all flags of `other` are set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// These flags plus `other`.
    #[inline]
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// These flags minus `other`.
    #[inline]
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for FrameEndFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl BitOrAssign for FrameEndFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.with(rhs);
    }
}

impl fmt::Debug for FrameEndFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::COMPLETED, "COMPLETED"),
            (Self::INTERNAL, "INTERNAL"),
            (Self::WRITEBACK, "WRITEBACK"),
        ];
        f.write_str("FrameEndFlags(")?;
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        f.write_str(")")
    }
}

// =============================================================================
// Manager
// =============================================================================

#[derive(Default)]
struct DlmState {
    active: Option<DisplayList>,
    queued: Option<DisplayList>,
    pending: Option<DisplayList>,
}

/// Display list manager for one device output.
pub struct DlManager<M: Mmio> {
    // Field order matters for drop: in-flight lists return to the home
    // before the home returns the primary bodies to the pool.
    state: Mutex<DlmState>,
    home: Arc<ListHome>,
    pool: BodyPool,
    config: DlmConfig,
    regs: Arc<M>,
}

impl<M: Mmio> DlManager<M> {
    /// Create a manager with `config.prealloc` display lists.
    ///
    /// The primary bodies of all lists and the extra bodies come from one
    /// body pool; in header mode each primary body is followed by its
    /// header.
    ///
    /// # Errors
    ///
    /// Propagates allocation failures; `prealloc` must be non-zero.
    pub fn new<A: DmaAllocator + ?Sized>(
        config: DlmConfig,
        regs: Arc<M>,
        alloc: &A,
    ) -> Result<Self, AllocError> {
        if config.prealloc == 0 {
            return Err(AllocError::InvalidGeometry {
                count: 0,
                stride: config.entries,
            });
        }

        let extended = config.extended && config.mode == DlMode::Header;
        let header = match config.mode {
            DlMode::Header => header_size(extended),
            DlMode::Headerless => 0,
        };

        let pool = BodyPool::create(
            alloc,
            config.prealloc + config.extra_bodies,
            config.entries,
            header,
        )?;
        let cmd_pool = if extended {
            Some(CmdPool::create(alloc, config.prealloc)?)
        } else {
            None
        };

        let mut free = VecDeque::with_capacity(config.prealloc);
        for id in 0..config.prealloc {
            let body0 = pool.acquire().ok_or(AllocError::InvalidGeometry {
                count: config.prealloc,
                stride: pool.stride(),
            })?;
            free.push_back(ListParts { id, body0 });
        }

        debug!(
            index = config.index,
            mode = ?config.mode,
            singleshot = config.singleshot,
            lists = config.prealloc,
            "display list manager created"
        );

        Ok(Self {
            state: Mutex::new(DlmState::default()),
            home: Arc::new(ListHome {
                free: Mutex::new(free),
                mode: config.mode,
                singleshot: config.singleshot,
                extended,
                cmd_pool,
            }),
            pool,
            config,
            regs,
        })
    }

    /// The configuration this manager was created with.
    #[must_use]
    pub const fn config(&self) -> &DlmConfig {
        &self.config
    }

    /// Device output index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.config.index
    }

    /// Register window of the device.
    #[must_use]
    pub const fn regs(&self) -> &Arc<M> {
        &self.regs
    }

    /// Program the global display list control registers.
    pub fn setup(&self) {
        let mut ctrl = (256 << vsp::DL_CTRL_AR_WAIT_SHIFT)
            | vsp::DL_CTRL_DC2
            | vsp::DL_CTRL_DC1
            | vsp::DL_CTRL_DC0
            | vsp::DL_CTRL_DLE;

        if self.home.extended {
            self.regs.write(
                vsp::dl_ext_ctrl(self.config.index),
                (0x02 << vsp::DL_EXT_CTRL_POLINT_SHIFT)
                    | vsp::DL_EXT_CTRL_DLPRI
                    | vsp::DL_EXT_CTRL_EXT,
            );
        }

        // Display pipes run lists in continuous frame mode.
        if !self.config.singleshot {
            ctrl |= vsp::DL_CTRL_CFM0 | vsp::DL_CTRL_NH0;
        }

        self.regs.write(vsp::DL_CTRL, ctrl);
        self.regs.write(vsp::DL_SWAP, vsp::DL_SWAP_LWS);
    }

    /// Take a display list from the free list, `None` if all are in use.
    #[must_use]
    pub fn acquire(&self) -> Option<DisplayList> {
        let parts = self.home.free.lock().pop_front()?;
        trace!(index = self.config.index, id = parts.id, "display list acquired");
        Some(DisplayList::from_parts(parts, Arc::clone(&self.home)))
    }

    /// Return an uncommitted display list.
    ///
    /// Equivalent to dropping it.
    #[allow(clippy::needless_pass_by_value)]
    pub fn release(&self, dl: DisplayList) {
        trace!(index = self.config.index, id = dl.id(), "display list returned");
    }

    /// Take an extra body from the manager's pool.
    #[must_use]
    pub fn get_body(&self) -> Option<Body> {
        self.pool.acquire()
    }

    /// Display lists on the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.home.free.lock().len()
    }

    /// Display lists the manager was created with.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.config.prealloc
    }

    /// Hand `dl` to the device.
    ///
    /// `flags` may carry [`FrameEndFlags::INTERNAL`] (the driver waits for
    /// this list itself) and [`FrameEndFlags::WRITEBACK`] (the list
    /// captures the output to memory). In header mode the headers of the
    /// list and its chain are filled first.
    pub fn commit(&self, mut dl: DisplayList, flags: FrameEndFlags) {
        if self.config.mode == DlMode::Header {
            dl.fill_chain_headers();
        }
        dl.set_flags(flags.without(FrameEndFlags::COMPLETED));

        let displaced = {
            let mut state = self.state.lock();
            if self.config.singleshot {
                self.commit_singleshot(&mut state, dl)
            } else {
                self.commit_continuous(&mut state, dl)
            }
        };
        drop(displaced);
    }

    fn commit_continuous(&self, state: &mut DlmState, dl: DisplayList) -> Option<DisplayList> {
        // The device has not fetched the queued list yet. Programming it
        // now could replace a list the device is about to read, so park
        // the new one until the next frame end. A parked list is always
        // replaced rather than overtaken.
        if state.pending.is_some() || self.hw_update_pending(state) {
            trace!(index = self.config.index, id = dl.id(), "commit pending");
            let old = state.pending.replace(dl);
            if let Some(old) = &old {
                let internal = old.flags().contains(FrameEndFlags::INTERNAL);
                if internal {
                    error!(
                        index = self.config.index,
                        id = old.id(),
                        "internal display list replaced before completion"
                    );
                }
                debug_assert!(!internal, "two internal display list waiters");
            }
            return old;
        }

        trace!(index = self.config.index, id = dl.id(), "commit queued");
        self.hw_enqueue(&dl);
        state.queued.replace(dl)
    }

    fn commit_singleshot(&self, state: &mut DlmState, dl: DisplayList) -> Option<DisplayList> {
        trace!(index = self.config.index, id = dl.id(), "commit single-shot");
        self.hw_enqueue(&dl);
        let old = state.active.replace(dl);
        if old.is_some() {
            error!(index = self.config.index, "single-shot commit while a list is active");
        }
        old
    }

    /// Advance the slots at a frame end.
    ///
    /// Called from the interrupt handler. `interlaced` outputs complete on
    /// the frame end after the bottom field.
    #[must_use]
    pub fn irq_frame_end(&self, interlaced: bool) -> FrameEndFlags {
        let mut flags = FrameEndFlags::empty();
        let recycled = {
            let mut state = self.state.lock();
            self.frame_end_locked(&mut state, interlaced, &mut flags)
        };
        drop(recycled);

        if !flags.is_empty() {
            trace!(index = self.config.index, ?flags, "frame end");
        }
        flags
    }

    fn frame_end_locked(
        &self,
        state: &mut DlmState,
        interlaced: bool,
        flags: &mut FrameEndFlags,
    ) -> Option<DisplayList> {
        if self.config.singleshot {
            *flags |= FrameEndFlags::COMPLETED;
            return state.active.take();
        }

        // The commit raced the frame start: the queued list is still
        // waiting to be fetched. Try again at the next frame end.
        if self.hw_update_pending(state) {
            return None;
        }

        if interlaced
            && self.regs.read(vsp::STATUS) & vsp::status_fld_std(self.config.index) != 0
        {
            return None;
        }

        if let Some(active) = state.active.as_mut() {
            if active.flags().contains(FrameEndFlags::WRITEBACK) {
                *flags |= FrameEndFlags::WRITEBACK;
                let cleared = active.flags().without(FrameEndFlags::WRITEBACK);
                active.set_flags(cleared);
            }
        }

        let mut recycled = None;
        if let Some(mut queued) = state.queued.take() {
            if queued.flags().contains(FrameEndFlags::INTERNAL) {
                *flags |= FrameEndFlags::INTERNAL;
                let cleared = queued.flags().without(FrameEndFlags::INTERNAL);
                queued.set_flags(cleared);
            }
            recycled = state.active.replace(queued);
            *flags |= FrameEndFlags::COMPLETED;
        }

        if let Some(pending) = state.pending.take() {
            self.hw_enqueue(&pending);
            state.queued = Some(pending);
        }

        recycled
    }

    /// Drop every in-flight list. The output must be stopped.
    pub fn reset(&self) {
        let (active, queued, pending) = {
            let mut state = self.state.lock();
            (
                state.active.take(),
                state.queued.take(),
                state.pending.take(),
            )
        };
        if active.is_some() || queued.is_some() || pending.is_some() {
            debug!(index = self.config.index, "display list manager reset");
        }
    }

    /// Re-program the device after a soft reset.
    ///
    /// `reset` runs under the slot lock, so no frame end or commit can
    /// interleave with it. Afterwards the newest list the device had been
    /// given (queued, else active) is programmed again so scanout resumes
    /// from a valid list.
    pub fn restore<F: FnOnce(&M)>(&self, reset: F) {
        let state = self.state.lock();
        reset(&*self.regs);
        if let Some(dl) = state.queued.as_ref().or(state.active.as_ref()) {
            debug!(index = self.config.index, id = dl.id(), "display list restored");
            self.hw_enqueue(dl);
        }
    }

    /// Id of the list being executed.
    #[must_use]
    pub fn active_id(&self) -> Option<usize> {
        self.state.lock().active.as_ref().map(DisplayList::id)
    }

    /// Id of the list programmed but not yet fetched.
    #[must_use]
    pub fn queued_id(&self) -> Option<usize> {
        self.state.lock().queued.as_ref().map(DisplayList::id)
    }

    /// Id of the list waiting for the queued one to be fetched.
    #[must_use]
    pub fn pending_id(&self) -> Option<usize> {
        self.state.lock().pending.as_ref().map(DisplayList::id)
    }

    // =========================================================================
    // Hardware access
    // =========================================================================

    fn hw_update_pending(&self, state: &DlmState) -> bool {
        if state.queued.is_none() {
            return false;
        }
        match self.config.mode {
            DlMode::Headerless => {
                self.regs.read(vsp::DL_BODY_SIZE) & vsp::DL_BODY_SIZE_UPD != 0
            }
            DlMode::Header => {
                self.regs.read(vsp::cmd(self.config.index)) & vsp::CMD_UPDHDR != 0
            }
        }
    }

    fn hw_enqueue(&self, dl: &DisplayList) {
        match self.config.mode {
            DlMode::Headerless => {
                self.regs
                    .write(vsp::dl_hdr_addr(0), dl.body0().dma().as_reg());
                self.regs.write(
                    vsp::DL_BODY_SIZE,
                    vsp::DL_BODY_SIZE_UPD
                        | (dl.body0_bytes() as u32 & vsp::DL_BODY_SIZE_BS_MASK),
                );
            }
            DlMode::Header => {
                self.regs
                    .write(vsp::dl_hdr_addr(self.config.index), dl.dma().as_reg());
            }
        }
    }
}

impl<M: Mmio> fmt::Debug for DlManager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DlManager")
            .field("index", &self.config.index)
            .field("mode", &self.config.mode)
            .field("singleshot", &self.config.singleshot)
            .field("active", &self.active_id())
            .field("queued", &self.queued_id())
            .field("pending", &self.pending_id())
            .field("free", &self.free_count())
            .finish_non_exhaustive()
    }
}
