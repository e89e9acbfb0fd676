// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the mock platform.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::error::AllocError;
use std::vec;

#[test]
fn store_is_default() {
    let regs = MockRegisters::new();
    regs.write(0x10, 0xdead_beef);
    assert_eq!(regs.read(0x10), 0xdead_beef);
    assert_eq!(regs.read(0x14), 0);
}

#[test]
fn write_log_records_order() {
    let regs = MockRegisters::new();
    regs.write(0x10, 1);
    regs.write(0x20, 2);
    regs.write(0x10, 3);
    assert_eq!(regs.writes(), vec![(0x10, 1), (0x20, 2), (0x10, 3)]);
    assert_eq!(regs.writes_to(0x10), vec![1, 3]);
    assert_eq!(regs.take_writes().len(), 3);
    assert!(regs.writes().is_empty());
}

#[test]
fn device_side_access_is_not_logged() {
    let regs = MockRegisters::new();
    regs.poke(0x8, 0xf0);
    regs.set_bits(0x8, 0x01);
    regs.clear_bits(0x8, 0x10);
    assert_eq!(regs.get(0x8), 0xe1);
    assert!(regs.writes().is_empty());
}

#[test]
fn write_zero_to_clear_only_clears_zero_bits() {
    let regs = MockRegisters::new();
    regs.set_mode(0x4c, WriteMode::WriteZeroToClear);
    regs.poke(0x4c, 0b1011);
    // Acknowledge bit 1 only.
    regs.write(0x4c, !0b0010);
    assert_eq!(regs.read(0x4c), 0b1001);
}

#[test]
fn write_one_to_clear_only_clears_one_bits() {
    let regs = MockRegisters::new();
    regs.set_mode(0x8, WriteMode::WriteOneToClear);
    regs.poke(0x8, 0b1011);
    regs.write(0x8, 0b0011);
    assert_eq!(regs.read(0x8), 0b1000);
}

#[test]
fn set_bits_mode_accumulates() {
    let regs = MockRegisters::new();
    regs.set_mode(0x0, WriteMode::SetBits);
    regs.poke(0x0, 0x10);
    regs.write(0x0, 0x01);
    assert_eq!(regs.read(0x0), 0x11);
}

#[test]
fn strobe_hook_acts_on_other_register() {
    let regs = MockRegisters::new();
    regs.set_mode(0xc, WriteMode::Strobe);
    regs.on_write(0xc, |file, value| file.clear_bits(0x8, value));
    regs.poke(0x8, 0xff);
    regs.write(0xc, 0x0f);
    assert_eq!(regs.read(0xc), 0);
    assert_eq!(regs.read(0x8), 0xf0);
}

#[test]
fn modify_is_read_modify_write() {
    let regs = MockRegisters::new();
    regs.poke(0x0, 0b1100);
    regs.modify(0x0, 0b0100, 0b0001);
    assert_eq!(regs.read(0x0), 0b1001);
}

#[test]
fn allocator_hands_out_disjoint_aligned_regions() {
    let alloc = MockDmaAllocator::new();
    let a = alloc.alloc_wc(100).unwrap();
    let b = alloc.alloc_wc(300).unwrap();

    assert_eq!(a.dma().as_u64(), MOCK_DMA_BASE);
    assert_eq!(a.size(), 100);
    assert_eq!(b.dma().is_aligned(256), Some(true));
    assert!(b.dma().as_u64() >= a.dma().as_u64() + 100);
    assert!(!a.contains(b.dma()));
}

#[test]
fn allocator_failure_is_reported() {
    let alloc = MockDmaAllocator::new();
    alloc.set_fail(true);
    assert_eq!(
        alloc.alloc_wc(64).err(),
        Some(AllocError::OutOfMemory { size: 64 })
    );
    alloc.set_fail(false);
    assert!(alloc.alloc_wc(64).is_ok());
}

#[test]
fn vsp_model_tracks_header_updates() {
    use vsp_abi::vsp;

    let model = MockVsp::new(1);
    let regs = model.regs();
    assert!(!model.update_pending(0));

    regs.write(vsp::dl_hdr_addr(0), 0x5800_0000);
    assert!(model.update_pending(0));
    assert_eq!(model.programmed_list(0), 0x5800_0000);

    // Starting the pipe must not drop the pending update.
    regs.write(vsp::cmd(0), vsp::CMD_STRCMD);
    assert!(model.update_pending(0));

    model.latch(0);
    assert!(!model.update_pending(0));
}

#[test]
fn vsp_model_reset_clears_activity() {
    use vsp_abi::vsp;

    let model = MockVsp::new(2);
    model.set_active(0, true);
    model.set_active(1, true);
    model.regs().write(vsp::SRESET, vsp::sreset_srts(1));
    let status = model.regs().read(vsp::STATUS);
    assert_ne!(status & vsp::status_sys_act(0), 0);
    assert_eq!(status & vsp::status_sys_act(1), 0);
}
