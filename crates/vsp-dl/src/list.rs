// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Display lists.
//!
//! A [`DisplayList`] is one frame's worth of register writes: a primary
//! body, extra bodies (header mode only) and optionally a chain of further
//! lists the device runs back to back. In header mode the header lives in
//! the space reserved behind the primary body.
//!
//! Lists are handed out by a [`DlManager`](crate::DlManager) and return to
//! it when dropped. Dropping a list releases its extra bodies, its chained
//! lists and its pre-command.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::mem::ManuallyDrop;

use spin::Mutex;
use tracing::{error, trace};
use vsp_abi::DmaAddr;
use vsp_abi::layout::{
    DLH_AUTO_START, DLH_EXT_PRE_CMD_EXEC, DLH_INT_ENABLE, HDR_EXT_CMD, HDR_EXT_POST_NUM,
    HDR_EXT_POST_PLIST, HDR_EXT_PRE_PLIST, HDR_FLAGS, HDR_NEXT_HEADER, HDR_NUM_LISTS,
    HEADER_LISTS, hdr_list_addr, hdr_list_num_bytes,
};

use crate::body::Body;
use crate::cmd::{CmdPool, ExtCmd};
use crate::error::{BodyError, ModeError};
use crate::manager::{DlMode, FrameEndFlags};

/// The storage that stays with a list slot across reuse.
pub(crate) struct ListParts {
    pub(crate) id: usize,
    pub(crate) body0: Body,
}

/// State shared by all lists of one manager.
pub(crate) struct ListHome {
    pub(crate) free: Mutex<VecDeque<ListParts>>,
    pub(crate) mode: DlMode,
    pub(crate) singleshot: bool,
    pub(crate) extended: bool,
    pub(crate) cmd_pool: Option<CmdPool>,
}

/// One display list.
pub struct DisplayList {
    parts: ManuallyDrop<ListParts>,
    home: Arc<ListHome>,
    bodies: Vec<Body>,
    chain: Vec<DisplayList>,
    pre_cmd: Option<ExtCmd>,
    flags: FrameEndFlags,
}

impl DisplayList {
    pub(crate) fn from_parts(parts: ListParts, home: Arc<ListHome>) -> Self {
        Self {
            parts: ManuallyDrop::new(parts),
            home,
            bodies: Vec::new(),
            chain: Vec::new(),
            pre_cmd: None,
            flags: FrameEndFlags::empty(),
        }
    }

    /// Identifier of this list within its manager.
    #[must_use]
    pub fn id(&self) -> usize {
        self.parts.id
    }

    /// Operating mode of the owning manager.
    #[must_use]
    pub fn mode(&self) -> DlMode {
        self.home.mode
    }

    /// Bus address the device is pointed at for this list.
    ///
    /// The header in header mode, the primary body otherwise.
    #[must_use]
    pub fn dma(&self) -> DmaAddr {
        match self.home.mode {
            DlMode::Header => self.parts.body0.extra_dma(0),
            DlMode::Headerless => self.parts.body0.dma(),
        }
    }

    /// The primary body.
    #[must_use]
    pub fn body0(&self) -> &Body {
        &self.parts.body0
    }

    /// The primary body, for direct register writes.
    pub fn body0_mut(&mut self) -> &mut Body {
        &mut self.parts.body0
    }

    /// Append a register write to the primary body.
    pub fn write(&mut self, reg: u32, value: u32) -> Result<(), BodyError> {
        self.parts.body0.write(reg, value)
    }

    /// Reference `body` from this list, after the primary body and any
    /// previously added bodies.
    ///
    /// The list takes its own reference; the caller keeps theirs.
    pub fn add_body(&mut self, body: &Body) -> Result<(), ModeError> {
        if self.home.mode == DlMode::Headerless {
            error!(id = self.id(), "extra body on a headerless display list");
            return Err(ModeError::Headerless);
        }
        if self.bodies.len() + 1 >= HEADER_LISTS {
            return Err(ModeError::HeaderFull { max: HEADER_LISTS });
        }
        self.bodies.push(body.share());
        Ok(())
    }

    /// Extra bodies in insertion order.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Append `next` (and its own chain) to this list's chain.
    ///
    /// On error `next` is returned to its manager.
    pub fn add_chain(&mut self, mut next: Self) -> Result<(), ModeError> {
        if self.home.mode == DlMode::Headerless {
            error!(id = self.id(), "chaining a headerless display list");
            return Err(ModeError::Headerless);
        }
        if !Arc::ptr_eq(&self.home, &next.home) {
            return Err(ModeError::ForeignList);
        }
        let tail = core::mem::take(&mut next.chain);
        self.chain.push(next);
        self.chain.extend(tail);
        Ok(())
    }

    /// Whether other lists are chained behind this one.
    #[must_use]
    pub fn has_chain(&self) -> bool {
        !self.chain.is_empty()
    }

    /// Chained lists in execution order.
    #[must_use]
    pub fn chain(&self) -> &[Self] {
        &self.chain
    }

    /// The auto-field pre-command of this list, attached on first use.
    ///
    /// `None` without extended display lists or when all commands are in
    /// use.
    pub fn pre_cmd(&mut self) -> Option<&mut ExtCmd> {
        if self.pre_cmd.is_none() {
            self.pre_cmd = self.home.cmd_pool.as_ref()?.acquire();
        }
        self.pre_cmd.as_mut()
    }

    /// Whether a pre-command is attached.
    #[must_use]
    pub const fn has_pre_cmd(&self) -> bool {
        self.pre_cmd.is_some()
    }

    /// Flags recorded at commit time.
    #[must_use]
    pub const fn flags(&self) -> FrameEndFlags {
        self.flags
    }

    pub(crate) fn set_flags(&mut self, flags: FrameEndFlags) {
        self.flags = flags;
    }

    /// Bytes of entries in the primary body, for headerless programming.
    pub(crate) fn body0_bytes(&self) -> usize {
        self.parts.body0.size_bytes()
    }

    /// Write the header the device uses to walk this list.
    ///
    /// `next` is the list that follows in a chain, `None` for the last
    /// list. In continuous mode the last list loops back to itself.
    pub fn fill_header(&self, next: Option<&Self>) -> Result<(), ModeError> {
        if self.home.mode == DlMode::Headerless {
            return Err(ModeError::Headerless);
        }
        self.write_header(next);
        Ok(())
    }

    fn write_header(&self, next: Option<&Self>) {
        let hdr = &self.parts.body0;
        let is_last = next.is_none();
        let singleshot = self.home.singleshot;

        hdr.write_extra(hdr_list_addr(0), self.parts.body0.dma().as_reg());
        hdr.write_extra(hdr_list_num_bytes(0), self.parts.body0.size_bytes() as u32);
        for (i, body) in self.bodies.iter().enumerate() {
            hdr.write_extra(hdr_list_addr(i + 1), body.dma().as_reg());
            hdr.write_extra(hdr_list_num_bytes(i + 1), body.size_bytes() as u32);
        }
        hdr.write_extra(HDR_NUM_LISTS, self.bodies.len() as u32);

        // Lists inside a chain only auto-start the next one. The last list
        // interrupts; in continuous mode it also restarts itself.
        let flags = if !is_last {
            DLH_AUTO_START
        } else if singleshot {
            DLH_INT_ENABLE
        } else {
            DLH_INT_ENABLE | DLH_AUTO_START
        };
        hdr.write_extra(HDR_FLAGS, flags);

        if let Some(next) = next {
            hdr.write_extra(HDR_NEXT_HEADER, next.dma().as_reg());
        } else if !singleshot {
            hdr.write_extra(HDR_NEXT_HEADER, self.dma().as_reg());
        }

        if self.home.extended {
            self.fill_extension();
        }

        trace!(
            id = self.id(),
            bodies = self.bodies.len() + 1,
            is_last,
            flags,
            "header filled"
        );
    }

    fn fill_extension(&self) {
        let hdr = &self.parts.body0;
        let mut ext_flags = 0;
        let mut num_cmds = 0;
        let mut plist = 0;
        if let Some(cmd) = &self.pre_cmd {
            cmd.fill_header();
            ext_flags |= DLH_EXT_PRE_CMD_EXEC;
            num_cmds = cmd.num_cmds();
            plist = cmd.cmd_dma().as_reg();
        }
        hdr.write_extra(HDR_EXT_CMD, (num_cmds & 0xffff) | (ext_flags << 16));
        hdr.write_extra(HDR_EXT_PRE_PLIST, plist);
        hdr.write_extra(HDR_EXT_POST_NUM, 0);
        hdr.write_extra(HDR_EXT_POST_PLIST, 0);
    }

    /// Fill the headers of this list and every chained list.
    ///
    /// Only the last list of the chain is flagged as last.
    pub(crate) fn fill_chain_headers(&self) {
        self.write_header(self.chain.first());
        for (i, dl) in self.chain.iter().enumerate() {
            dl.write_header(self.chain.get(i + 1));
        }
    }

    /// Read-only view of the header, `None` in headerless mode.
    #[must_use]
    pub fn header(&self) -> Option<HeaderView<'_>> {
        (self.home.mode == DlMode::Header).then_some(HeaderView {
            body0: &self.parts.body0,
            extended: self.home.extended,
        })
    }

    /// Whether this list and `other` belong to the same manager.
    #[must_use]
    pub fn same_manager(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.home, &other.home)
    }
}

impl Drop for DisplayList {
    fn drop(&mut self) {
        self.bodies.clear();
        self.chain.clear();
        self.pre_cmd = None;

        // SAFETY: `parts` is never touched again after this point.
        let mut parts = unsafe { ManuallyDrop::take(&mut self.parts) };
        parts.body0.reset();
        trace!(id = parts.id, "display list released");
        self.home.free.lock().push_back(parts);
    }
}

impl fmt::Debug for DisplayList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayList")
            .field("id", &self.id())
            .field("dma", &self.dma())
            .field("entries", &self.parts.body0.num_entries())
            .field("bodies", &self.bodies.len())
            .field("chain", &self.chain.len())
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a display list header as the device will parse it.
#[derive(Clone, Copy)]
pub struct HeaderView<'a> {
    body0: &'a Body,
    extended: bool,
}

impl HeaderView<'_> {
    /// Number of bodies referenced by the header.
    #[must_use]
    pub fn num_bodies(&self) -> usize {
        self.body0.read_extra(HDR_NUM_LISTS) as usize + 1
    }

    /// Address and byte size of body `i`.
    #[must_use]
    pub fn body(&self, i: usize) -> Option<(u32, u32)> {
        (i < self.num_bodies()).then(|| {
            (
                self.body0.read_extra(hdr_list_addr(i)),
                self.body0.read_extra(hdr_list_num_bytes(i)),
            )
        })
    }

    /// Address of the header the device proceeds to.
    #[must_use]
    pub fn next_header(&self) -> u32 {
        self.body0.read_extra(HDR_NEXT_HEADER)
    }

    /// Header flags.
    #[must_use]
    pub fn flags(&self) -> u32 {
        self.body0.read_extra(HDR_FLAGS)
    }

    /// Pre-command count and extended flags, `None` without extension.
    #[must_use]
    pub fn pre_cmd(&self) -> Option<(u32, u32, u32)> {
        self.extended.then(|| {
            let word = self.body0.read_extra(HDR_EXT_CMD);
            (
                word & 0xffff,
                word >> 16,
                self.body0.read_extra(HDR_EXT_PRE_PLIST),
            )
        })
    }
}
