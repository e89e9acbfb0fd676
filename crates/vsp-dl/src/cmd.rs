// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Extended display list commands.
//!
//! On generations with extended display lists the header can point at a
//! list of commands the device executes before the list body. The only
//! command used here is auto-field: for interlaced inputs it re-latches
//! the source addresses of each input at every field, so only addresses
//! change between the top and the bottom field.
//!
//! A [`CmdPool`] holds one DMA region laid out as all command headers
//! followed by all command data areas:
//!
//! ```text
//! +----------+----------+----+------------+------------+----
//! | header 0 | header 1 | .. | data 0     | data 1     | ..
//! +----------+----------+----+------------+------------+----
//! ```

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::fmt;

use spin::Mutex;
use tracing::{debug, trace};
use vsp_abi::DmaAddr;
use vsp_abi::layout::{
    AUTOFLD_DATA_WORDS, AUTOFLD_INPUT_WORDS, AUTOFLD_INPUTS, AUTOFLD_INT, EXT_CMD_ADDRESS_SET,
    EXT_CMD_FLAGS, EXT_CMD_OPCODE, EXT_CMD_RESERVED, EXT_CMD_WORDS, EXTCMD_AUTOFLD,
    autofld_input_enable,
};

use crate::error::{AllocError, HeaderError};
use crate::platform::{DmaAllocator, DmaRegion};

/// Source addresses of one input for both fields.
///
/// Index 0 is the luma plane, 1 and 2 the chroma planes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldAddresses {
    /// Plane addresses for the top field.
    pub top: [DmaAddr; 3],
    /// Plane addresses for the bottom field.
    pub bottom: [DmaAddr; 3],
}

impl FieldAddresses {
    /// Field addresses of an interleaved frame.
    ///
    /// The bottom field starts one line (one stride) after the top field of
    /// every plane. Unused planes have a null address and stay null.
    #[must_use]
    pub fn interleaved(planes: [DmaAddr; 3], strides: [u32; 3]) -> Self {
        let mut bottom = planes;
        for (addr, stride) in bottom.iter_mut().zip(strides) {
            if !addr.is_null() {
                *addr = addr.add(u64::from(stride));
            }
        }
        Self {
            top: planes,
            bottom,
        }
    }
}

struct CmdShared {
    region: DmaRegion,
    count: usize,
    free: Mutex<VecDeque<usize>>,
}

impl CmdShared {
    const fn header_word(index: usize) -> usize {
        index * EXT_CMD_WORDS
    }

    const fn data_word(&self, index: usize) -> usize {
        self.count * EXT_CMD_WORDS + index * AUTOFLD_DATA_WORDS
    }
}

/// Pool of auto-field commands.
pub struct CmdPool {
    shared: Arc<CmdShared>,
}

impl CmdPool {
    /// Allocate `count` auto-field commands.
    ///
    /// # Errors
    ///
    /// Propagates allocator failures; `count` must be non-zero.
    pub fn create<A: DmaAllocator + ?Sized>(alloc: &A, count: usize) -> Result<Self, AllocError> {
        let stride = (EXT_CMD_WORDS + AUTOFLD_DATA_WORDS) * 4;
        if count == 0 {
            return Err(AllocError::InvalidGeometry { count, stride });
        }
        let region = alloc.alloc_wc(count * stride)?;
        debug!(count, dma = %region.dma(), "command pool created");

        Ok(Self {
            shared: Arc::new(CmdShared {
                region,
                count,
                free: Mutex::new((0..count).collect()),
            }),
        })
    }

    /// Check out an empty command, or `None` if all are in use.
    #[must_use]
    pub fn acquire(&self) -> Option<ExtCmd> {
        let index = self.shared.free.lock().pop_front()?;
        let cmd = ExtCmd {
            pool: Arc::clone(&self.shared),
            index,
            flags: 0,
        };
        for word in 0..AUTOFLD_DATA_WORDS {
            cmd.write_data(word, 0);
        }
        trace!(index, "command acquired");
        Some(cmd)
    }

    /// Commands currently on the free list.
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.free.lock().len()
    }

    /// Commands the pool was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.count
    }
}

impl Clone for CmdPool {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for CmdPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmdPool")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .finish()
    }
}

/// One auto-field command; returns to its pool on drop.
pub struct ExtCmd {
    pool: Arc<CmdShared>,
    index: usize,
    flags: u32,
}

impl ExtCmd {
    fn write_data(&self, word: usize, value: u32) {
        let base = self.pool.data_word(self.index);
        self.pool.region.write_word(base + word, value);
    }

    fn read_data(&self, word: usize) -> u32 {
        let base = self.pool.data_word(self.index);
        self.pool.region.read_word(base + word)
    }

    /// Record the field addresses of `input` and enable re-latching it.
    pub fn set_field_addresses(
        &mut self,
        input: usize,
        fields: &FieldAddresses,
    ) -> Result<(), HeaderError> {
        if input >= AUTOFLD_INPUTS {
            return Err(HeaderError::InputOutOfRange {
                input,
                max: AUTOFLD_INPUTS,
            });
        }

        let base = input * AUTOFLD_INPUT_WORDS;
        for plane in 0..3 {
            self.write_data(base + 2 * plane, fields.top[plane].as_reg());
            self.write_data(base + 2 * plane + 1, fields.bottom[plane].as_reg());
        }
        self.flags |= AUTOFLD_INT | autofld_input_enable(input);
        trace!(index = self.index, input, "auto-field addresses set");
        Ok(())
    }

    /// Field addresses recorded for `input`, if it is enabled.
    #[must_use]
    pub fn field_addresses(&self, input: usize) -> Option<FieldAddresses> {
        if input >= AUTOFLD_INPUTS || self.flags & autofld_input_enable(input) == 0 {
            return None;
        }
        let base = input * AUTOFLD_INPUT_WORDS;
        let mut fields = FieldAddresses::default();
        for plane in 0..3 {
            fields.top[plane] = DmaAddr::new(u64::from(self.read_data(base + 2 * plane)));
            fields.bottom[plane] = DmaAddr::new(u64::from(self.read_data(base + 2 * plane + 1)));
        }
        Some(fields)
    }

    /// Command flags as written to the command header.
    #[must_use]
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    /// Commands in this command list.
    #[must_use]
    pub const fn num_cmds(&self) -> u32 {
        1
    }

    /// Bus address of the command header list.
    #[must_use]
    pub fn cmd_dma(&self) -> DmaAddr {
        self.pool.region.word_dma(CmdShared::header_word(self.index))
    }

    /// Bus address of the command data.
    #[must_use]
    pub fn data_dma(&self) -> DmaAddr {
        self.pool.region.word_dma(self.pool.data_word(self.index))
    }

    /// Write the command header the device parses.
    pub(crate) fn fill_header(&self) {
        let base = CmdShared::header_word(self.index);
        let region = &self.pool.region;
        region.write_word(base + EXT_CMD_OPCODE, EXTCMD_AUTOFLD);
        region.write_word(base + EXT_CMD_FLAGS, self.flags);
        region.write_word(base + EXT_CMD_ADDRESS_SET, self.data_dma().as_reg());
        region.write_word(base + EXT_CMD_RESERVED, 0);
    }

    /// Read back header word `word`.
    #[must_use]
    pub fn header_word(&self, word: usize) -> u32 {
        debug_assert!(word < EXT_CMD_WORDS);
        self.pool
            .region
            .read_word(CmdShared::header_word(self.index) + word)
    }
}

impl Drop for ExtCmd {
    fn drop(&mut self) {
        self.pool.free.lock().push_back(self.index);
        trace!(index = self.index, "command released");
    }
}

impl fmt::Debug for ExtCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtCmd")
            .field("index", &self.index)
            .field("flags", &format_args!("{:#x}", self.flags))
            .finish()
    }
}
