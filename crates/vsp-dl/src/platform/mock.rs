// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Mock platform for host testing.
//!
//! [`MockRegisters`] is a register file with just enough device behavior to
//! drive the display list protocol: write-one-to-clear and
//! write-zero-to-clear status registers, strobe registers, and write hooks
//! that emulate the device latching a new display list. The test plays the
//! device by setting and clearing bits directly.

use std::boxed::Box;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::vec::Vec;

use spin::Mutex;
use vsp_abi::{DmaAddr, vsp};

use super::traits::{DmaAllocator, DmaRegion, Mmio};
use crate::error::AllocError;

/// How a register reacts to a CPU write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// The written value is stored.
    #[default]
    Store,
    /// Bits written as 1 are set, others are kept (command registers).
    SetBits,
    /// Bits written as 0 are cleared, bits written as 1 are kept.
    WriteZeroToClear,
    /// Bits written as 1 are cleared, bits written as 0 are kept.
    WriteOneToClear,
    /// Nothing is stored; only hooks observe the write.
    Strobe,
}

/// Plain register storage, as seen by write hooks and by the test.
#[derive(Debug, Default)]
pub struct RegisterFile {
    values: BTreeMap<u32, u32>,
}

impl RegisterFile {
    /// Current value of `offset` (zero if never written).
    #[must_use]
    pub fn get(&self, offset: u32) -> u32 {
        self.values.get(&offset).copied().unwrap_or(0)
    }

    /// Overwrite `offset`.
    pub fn set(&mut self, offset: u32, value: u32) {
        self.values.insert(offset, value);
    }

    /// Set `bits` in `offset`.
    pub fn set_bits(&mut self, offset: u32, bits: u32) {
        let value = self.get(offset) | bits;
        self.set(offset, value);
    }

    /// Clear `bits` in `offset`.
    pub fn clear_bits(&mut self, offset: u32, bits: u32) {
        let value = self.get(offset) & !bits;
        self.set(offset, value);
    }
}

type WriteHook = Box<dyn Fn(&mut RegisterFile, u32) + Send + Sync>;

#[derive(Default)]
struct MockState {
    file: RegisterFile,
    modes: BTreeMap<u32, WriteMode>,
    hooks: BTreeMap<u32, Vec<WriteHook>>,
    log: Vec<(u32, u32)>,
}

/// Mock register window.
#[derive(Default)]
pub struct MockRegisters {
    state: Mutex<MockState>,
}

impl MockRegisters {
    /// Create an all-zero register file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how `offset` reacts to CPU writes.
    pub fn set_mode(&self, offset: u32, mode: WriteMode) {
        self.state.lock().modes.insert(offset, mode);
    }

    /// Run `hook` with the written value after every CPU write to `offset`.
    pub fn on_write(
        &self,
        offset: u32,
        hook: impl Fn(&mut RegisterFile, u32) + Send + Sync + 'static,
    ) {
        self.state
            .lock()
            .hooks
            .entry(offset)
            .or_default()
            .push(Box::new(hook));
    }

    /// Current value of `offset`, without logging.
    #[must_use]
    pub fn get(&self, offset: u32) -> u32 {
        self.state.lock().file.get(offset)
    }

    /// Device-side overwrite of `offset`; bypasses modes, hooks and log.
    pub fn poke(&self, offset: u32, value: u32) {
        self.state.lock().file.set(offset, value);
    }

    /// Device-side set of `bits` in `offset`.
    pub fn set_bits(&self, offset: u32, bits: u32) {
        self.state.lock().file.set_bits(offset, bits);
    }

    /// Device-side clear of `bits` in `offset`.
    pub fn clear_bits(&self, offset: u32, bits: u32) {
        self.state.lock().file.clear_bits(offset, bits);
    }

    /// All CPU writes so far, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.state.lock().log.clone()
    }

    /// Drain the write log.
    pub fn take_writes(&self) -> Vec<(u32, u32)> {
        core::mem::take(&mut self.state.lock().log)
    }

    /// Values written to `offset`, in order.
    #[must_use]
    pub fn writes_to(&self, offset: u32) -> Vec<u32> {
        self.state
            .lock()
            .log
            .iter()
            .filter(|(reg, _)| *reg == offset)
            .map(|(_, value)| *value)
            .collect()
    }
}

impl Mmio for MockRegisters {
    fn read(&self, offset: u32) -> u32 {
        self.state.lock().file.get(offset)
    }

    fn write(&self, offset: u32, value: u32) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.log.push((offset, value));

        match state.modes.get(&offset).copied().unwrap_or_default() {
            WriteMode::Store => state.file.set(offset, value),
            WriteMode::SetBits => state.file.set_bits(offset, value),
            WriteMode::WriteZeroToClear => state.file.clear_bits(offset, !value),
            WriteMode::WriteOneToClear => state.file.clear_bits(offset, value),
            WriteMode::Strobe => {}
        }

        if let Some(hooks) = state.hooks.get(&offset) {
            for hook in hooks {
                hook(&mut state.file, value);
            }
        }
    }
}

/// Base bus address of the mock allocator's address space.
pub const MOCK_DMA_BASE: u64 = 0x5800_0000;

/// Allocation granularity of the mock allocator.
const MOCK_DMA_ALIGN: u64 = 256;

/// Bump allocator over a fake bus address space.
#[derive(Debug)]
pub struct MockDmaAllocator {
    next: AtomicU64,
    fail: AtomicBool,
}

impl MockDmaAllocator {
    /// Create an allocator handing out addresses from [`MOCK_DMA_BASE`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(MOCK_DMA_BASE),
            fail: AtomicBool::new(false),
        }
    }

    /// Make subsequent allocations fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Bytes handed out so far, including alignment padding.
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - MOCK_DMA_BASE
    }
}

impl Default for MockDmaAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaAllocator for MockDmaAllocator {
    fn alloc_wc(&self, size: usize) -> Result<DmaRegion, AllocError> {
        if self.fail.load(Ordering::Relaxed) || size == 0 {
            return Err(AllocError::OutOfMemory { size });
        }
        let span = (size as u64).next_multiple_of(MOCK_DMA_ALIGN);
        let base = self.next.fetch_add(span, Ordering::Relaxed);
        Ok(DmaRegion::new(DmaAddr::new(base), size))
    }
}

/// Device-side model of the VSP register interface used by display lists.
///
/// Writing a header address raises the update-pending bit of that output
/// until the test calls [`MockVsp::latch`], which is the device fetching
/// the queued list at the start of a frame. Interrupt status registers are
/// write-zero-to-clear and the soft reset register clears the output's
/// activity bit.
pub struct MockVsp {
    regs: Arc<MockRegisters>,
    outputs: usize,
}

impl MockVsp {
    /// Model a VSP with `outputs` WPFs.
    #[must_use]
    pub fn new(outputs: usize) -> Self {
        let regs = Arc::new(MockRegisters::new());
        for index in 0..outputs {
            regs.set_mode(vsp::cmd(index), WriteMode::SetBits);
            regs.set_mode(vsp::wpf_irq_sta(index), WriteMode::WriteZeroToClear);
            regs.on_write(vsp::dl_hdr_addr(index), move |file, _| {
                file.set_bits(vsp::cmd(index), vsp::CMD_UPDHDR);
            });
        }
        regs.set_mode(vsp::SRESET, WriteMode::Strobe);
        regs.on_write(vsp::SRESET, move |file, value| {
            for index in 0..outputs {
                if value & vsp::sreset_srts(index) != 0 {
                    file.clear_bits(vsp::STATUS, vsp::status_sys_act(index));
                }
            }
        });
        Self { regs, outputs }
    }

    /// The register window, for handing to the driver.
    #[must_use]
    pub const fn regs(&self) -> &Arc<MockRegisters> {
        &self.regs
    }

    /// Number of modelled outputs.
    #[must_use]
    pub const fn outputs(&self) -> usize {
        self.outputs
    }

    /// The device fetched the list programmed for `index`.
    pub fn latch(&self, index: usize) {
        self.regs.clear_bits(vsp::cmd(index), vsp::CMD_UPDHDR);
        self.regs.clear_bits(vsp::DL_BODY_SIZE, vsp::DL_BODY_SIZE_UPD);
    }

    /// Whether a programmed list has not been fetched yet.
    #[must_use]
    pub fn update_pending(&self, index: usize) -> bool {
        self.regs.get(vsp::cmd(index)) & vsp::CMD_UPDHDR != 0
            || self.regs.get(vsp::DL_BODY_SIZE) & vsp::DL_BODY_SIZE_UPD != 0
    }

    /// Header (or headerless body) address programmed for `index`.
    #[must_use]
    pub fn programmed_list(&self, index: usize) -> u32 {
        self.regs.get(vsp::dl_hdr_addr(index))
    }

    /// Raise interrupt status bits for WPF `index`.
    pub fn raise(&self, index: usize, bits: u32) {
        self.regs.set_bits(vsp::wpf_irq_sta(index), bits);
    }

    /// Mark output `index` running or stopped.
    pub fn set_active(&self, index: usize, active: bool) {
        if active {
            self.regs.set_bits(vsp::STATUS, vsp::status_sys_act(index));
        } else {
            self.regs.clear_bits(vsp::STATUS, vsp::status_sys_act(index));
        }
    }

    /// Report the bottom field (or the top field) for output `index`.
    pub fn set_bottom_field(&self, index: usize, bottom: bool) {
        if bottom {
            self.regs.set_bits(vsp::STATUS, vsp::status_fld_std(index));
        } else {
            self.regs.clear_bits(vsp::STATUS, vsp::status_fld_std(index));
        }
    }
}
