// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the display list manager and its commit protocol.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::platform::{MockDmaAllocator, MockRegisters, MockVsp};
use crate::test_support::init_tracing;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::vec::Vec;
use vsp_abi::Generation;
use vsp_abi::vsp;

struct Fixture {
    vsp: MockVsp,
    dlm: DlManager<MockRegisters>,
}

fn fixture(config: DlmConfig) -> Fixture {
    init_tracing();
    let vsp = MockVsp::new(1);
    let dlm = DlManager::new(config, Arc::clone(vsp.regs()), &MockDmaAllocator::new()).unwrap();
    Fixture { vsp, dlm }
}

fn continuous() -> Fixture {
    fixture(
        DlmConfig::for_generation(Generation::Gen3.info(), 0)
            .with_prealloc(4)
            .with_entries(16),
    )
}

fn headerless() -> Fixture {
    fixture(
        DlmConfig::for_generation(Generation::Gen2.info(), 0)
            .with_prealloc(4)
            .with_entries(16),
    )
}

fn singleshot() -> Fixture {
    fixture(
        DlmConfig::for_generation(Generation::Gen4.info(), 0)
            .singleshot()
            .with_prealloc(4)
            .with_entries(16),
    )
}

impl Fixture {
    fn commit(&self, flags: FrameEndFlags) -> usize {
        let dl = self.dlm.acquire().unwrap();
        let id = dl.id();
        self.dlm.commit(dl, flags);
        id
    }

    /// One frame: the device fetches the queued list, then ends the frame.
    fn frame(&self) -> FrameEndFlags {
        self.vsp.latch(0);
        self.dlm.irq_frame_end(false)
    }

    fn slots(&self) -> (Option<usize>, Option<usize>, Option<usize>) {
        (
            self.dlm.active_id(),
            self.dlm.queued_id(),
            self.dlm.pending_id(),
        )
    }
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn config_follows_generation() {
    let gen2 = DlmConfig::for_generation(Generation::Gen2.info(), 0);
    assert_eq!(gen2.mode, DlMode::Headerless);
    assert!(!gen2.extended);

    let gen3 = DlmConfig::for_generation(Generation::Gen3.info(), 1);
    assert_eq!(gen3.mode, DlMode::Header);
    assert!(gen3.extended);
    assert_eq!(gen3.index, 1);

    let m2m = DlmConfig::for_generation(Generation::Gen2.info(), 0).singleshot();
    assert!(m2m.singleshot);
    assert_eq!(m2m.mode, DlMode::Header);
}

#[test]
fn zero_lists_are_rejected() {
    let vsp = MockVsp::new(1);
    let config = DlmConfig::for_generation(Generation::Gen3.info(), 0).with_prealloc(0);
    assert!(DlManager::new(config, Arc::clone(vsp.regs()), &MockDmaAllocator::new()).is_err());
}

#[test]
fn allocation_failure_is_propagated() {
    let vsp = MockVsp::new(1);
    let alloc = MockDmaAllocator::new();
    alloc.set_fail(true);
    let config = DlmConfig::for_generation(Generation::Gen3.info(), 0);
    assert!(matches!(
        DlManager::new(config, Arc::clone(vsp.regs()), &alloc),
        Err(AllocError::OutOfMemory { .. })
    ));
}

#[test]
fn setup_programs_continuous_mode() {
    let f = continuous();
    f.dlm.setup();
    let regs = f.vsp.regs();

    let ctrl = regs.read(vsp::DL_CTRL);
    assert_eq!(ctrl >> vsp::DL_CTRL_AR_WAIT_SHIFT, 256);
    assert_ne!(ctrl & vsp::DL_CTRL_DLE, 0);
    assert_ne!(ctrl & vsp::DL_CTRL_CFM0, 0);
    assert_ne!(ctrl & vsp::DL_CTRL_NH0, 0);
    assert_eq!(regs.read(vsp::DL_SWAP), vsp::DL_SWAP_LWS);
    assert_eq!(
        regs.read(vsp::dl_ext_ctrl(0)),
        (0x02 << vsp::DL_EXT_CTRL_POLINT_SHIFT) | vsp::DL_EXT_CTRL_DLPRI | vsp::DL_EXT_CTRL_EXT
    );
}

#[test]
fn setup_of_singleshot_uses_manual_start() {
    let f = singleshot();
    f.dlm.setup();
    let ctrl = f.vsp.regs().read(vsp::DL_CTRL);
    assert_eq!(ctrl & (vsp::DL_CTRL_CFM0 | vsp::DL_CTRL_NH0), 0);
    assert!(f.vsp.regs().writes_to(vsp::dl_ext_ctrl(0)).is_empty());
}

// =============================================================================
// Continuous mode
// =============================================================================

#[test]
fn commit_to_idle_device_is_queued() {
    let f = continuous();
    let a = f.commit(FrameEndFlags::empty());
    assert_eq!(f.slots(), (None, Some(a), None));
    assert!(f.vsp.update_pending(0));

    let flags = f.frame();
    assert!(flags.contains(FrameEndFlags::COMPLETED));
    assert_eq!(f.slots(), (Some(a), None, None));

    // Nothing queued: no state change, no completion.
    assert_eq!(f.frame(), FrameEndFlags::empty());
    assert_eq!(f.slots(), (Some(a), None, None));
}

#[test]
fn commit_while_update_pending_parks_list() {
    let f = continuous();
    let a = f.commit(FrameEndFlags::empty());
    let b = f.commit(FrameEndFlags::empty());
    assert_eq!(f.slots(), (None, Some(a), Some(b)));

    let free_before = f.dlm.free_count();
    let c = f.commit(FrameEndFlags::empty());
    assert_eq!(f.slots(), (None, Some(a), Some(c)));
    // b went back to the free list; c came out of it.
    assert_eq!(f.dlm.free_count(), free_before);

    let flags = f.frame();
    assert!(flags.contains(FrameEndFlags::COMPLETED));
    assert_eq!(f.slots(), (Some(a), Some(c), None));
    let header = f.dlm.regs().read(vsp::dl_hdr_addr(0));
    assert!(f.vsp.update_pending(0));
    assert_ne!(header, 0);
}

#[test]
fn frame_end_racing_commit_is_skipped() {
    let f = continuous();
    let a = f.commit(FrameEndFlags::empty());
    // The device has not fetched the list at this frame end.
    assert_eq!(f.dlm.irq_frame_end(false), FrameEndFlags::empty());
    assert_eq!(f.slots(), (None, Some(a), None));

    assert!(f.frame().contains(FrameEndFlags::COMPLETED));
    assert_eq!(f.slots(), (Some(a), None, None));
}

#[test]
fn promotion_recycles_previous_active() {
    let f = continuous();
    f.commit(FrameEndFlags::empty());
    f.frame();
    f.commit(FrameEndFlags::empty());
    assert_eq!(f.dlm.free_count(), 2);
    f.frame();
    assert_eq!(f.dlm.free_count(), 3);
}

#[test]
fn internal_flag_is_reported_once() {
    let f = continuous();
    f.commit(FrameEndFlags::INTERNAL);
    let flags = f.frame();
    assert!(flags.contains(FrameEndFlags::COMPLETED | FrameEndFlags::INTERNAL));

    f.commit(FrameEndFlags::empty());
    let flags = f.frame();
    assert!(flags.contains(FrameEndFlags::COMPLETED));
    assert!(!flags.contains(FrameEndFlags::INTERNAL));
}

#[test]
fn writeback_is_reported_while_active() {
    let f = continuous();
    f.commit(FrameEndFlags::WRITEBACK);
    // Promotion frame: the capture is only starting.
    assert_eq!(f.frame(), FrameEndFlags::COMPLETED);
    // Next frame: the capture of the active list finished, once.
    assert_eq!(f.frame(), FrameEndFlags::WRITEBACK);
    assert_eq!(f.frame(), FrameEndFlags::empty());
}

#[test]
fn completed_is_never_stored_on_a_list() {
    let f = continuous();
    let dl = f.dlm.acquire().unwrap();
    f.dlm.commit(dl, FrameEndFlags::COMPLETED);
    // A stored COMPLETED flag would make no difference here; what matters
    // is that the flag did not turn into a writeback or internal report.
    assert_eq!(f.frame(), FrameEndFlags::COMPLETED);
    assert_eq!(f.frame(), FrameEndFlags::empty());
}

#[test]
fn interlaced_output_waits_for_second_field() {
    let f = continuous();
    let a = f.commit(FrameEndFlags::empty());
    f.vsp.latch(0);

    f.vsp.set_bottom_field(0, true);
    assert_eq!(f.dlm.irq_frame_end(true), FrameEndFlags::empty());
    assert_eq!(f.slots(), (None, Some(a), None));

    // Progressive outputs ignore the field status.
    assert!(f.dlm.irq_frame_end(false).contains(FrameEndFlags::COMPLETED));

    let b = f.commit(FrameEndFlags::empty());
    f.vsp.latch(0);
    f.vsp.set_bottom_field(0, false);
    assert!(f.dlm.irq_frame_end(true).contains(FrameEndFlags::COMPLETED));
    assert_eq!(f.slots(), (Some(b), None, None));
}

#[test]
fn header_mode_programs_header_address() {
    let f = continuous();
    let dl = f.dlm.acquire().unwrap();
    let dma = dl.dma();
    f.dlm.commit(dl, FrameEndFlags::empty());
    assert_eq!(f.vsp.programmed_list(0), dma.as_reg());
}

#[test]
fn commit_fills_header() {
    let f = continuous();
    let mut dl = f.dlm.acquire().unwrap();
    dl.write(0x100, 1).unwrap();
    let id = dl.id();
    f.dlm.commit(dl, FrameEndFlags::empty());
    assert_eq!(f.dlm.queued_id(), Some(id));
    assert_eq!(f.vsp.regs().writes_to(vsp::dl_hdr_addr(0)).len(), 1);
}

#[test]
fn headerless_mode_programs_body_and_size() {
    let f = headerless();
    let mut dl = f.dlm.acquire().unwrap();
    dl.write(0x100, 1).unwrap();
    dl.write(0x104, 2).unwrap();
    let body = dl.body0().dma();
    f.dlm.commit(dl, FrameEndFlags::empty());

    let regs = f.vsp.regs();
    assert_eq!(regs.read(vsp::dl_hdr_addr(0)), body.as_reg());
    assert_eq!(regs.read(vsp::DL_BODY_SIZE), vsp::DL_BODY_SIZE_UPD | 16);

    // Update pending is read from the body size register.
    let second = f.commit(FrameEndFlags::empty());
    assert_eq!(f.dlm.pending_id(), Some(second));
    assert!(f.frame().contains(FrameEndFlags::COMPLETED));
    assert_eq!(f.dlm.queued_id(), Some(second));
}

// =============================================================================
// Single-shot mode
// =============================================================================

#[test]
fn singleshot_commit_is_active_immediately() {
    let f = singleshot();
    let a = f.commit(FrameEndFlags::empty());
    assert_eq!(f.slots(), (Some(a), None, None));
    assert_ne!(f.vsp.programmed_list(0), 0);

    let flags = f.dlm.irq_frame_end(false);
    assert_eq!(flags, FrameEndFlags::COMPLETED);
    assert_eq!(f.slots(), (None, None, None));
    assert_eq!(f.dlm.free_count(), f.dlm.capacity());
}

#[test]
fn singleshot_ignores_update_pending() {
    let f = singleshot();
    f.commit(FrameEndFlags::empty());
    assert!(f.vsp.update_pending(0));
    assert_eq!(f.dlm.irq_frame_end(false), FrameEndFlags::COMPLETED);
}

// =============================================================================
// Reset, restore and bodies
// =============================================================================

#[test]
fn reset_releases_every_slot() {
    let f = continuous();
    f.commit(FrameEndFlags::empty());
    f.frame();
    f.commit(FrameEndFlags::empty());
    f.commit(FrameEndFlags::empty());
    assert_eq!(f.dlm.free_count(), 1);

    f.dlm.reset();
    assert_eq!(f.slots(), (None, None, None));
    assert_eq!(f.dlm.free_count(), f.dlm.capacity());
}

#[test]
fn reset_of_idle_manager_is_noop() {
    let f = continuous();
    f.dlm.reset();
    f.dlm.reset();
    assert_eq!(f.dlm.free_count(), f.dlm.capacity());
    assert!(f.vsp.regs().writes().is_empty());
}

#[test]
fn restore_reprograms_newest_list() {
    let f = continuous();
    let a = f.commit(FrameEndFlags::empty());
    f.frame();
    let b = f.commit(FrameEndFlags::empty());
    let queued_dma = f.vsp.programmed_list(0);
    assert_eq!(f.slots(), (Some(a), Some(b), None));

    f.vsp.regs().take_writes();
    f.dlm.restore(|regs| regs.write(vsp::SRESET, vsp::sreset_srts(0)));

    let writes = f.vsp.regs().take_writes();
    assert_eq!(writes[0], (vsp::SRESET, vsp::sreset_srts(0)));
    assert_eq!(writes[1], (vsp::dl_hdr_addr(0), queued_dma));
}

#[test]
fn restore_falls_back_to_active() {
    let f = continuous();
    f.commit(FrameEndFlags::empty());
    f.frame();
    let active_dma = f.vsp.programmed_list(0);
    f.vsp.regs().poke(vsp::dl_hdr_addr(0), 0);

    f.dlm.restore(|_| {});
    assert_eq!(f.vsp.programmed_list(0), active_dma);
}

#[test]
fn restore_of_idle_manager_only_resets() {
    let f = continuous();
    f.dlm.restore(|regs| regs.write(vsp::SRESET, 1));
    assert_eq!(f.vsp.regs().writes(), [(vsp::SRESET, 1)]);
}

#[test]
fn get_body_draws_from_spare_bodies() {
    let f = continuous();
    let body = f.dlm.get_body().unwrap();
    assert_eq!(body.max_entries(), 16);
    assert!(f.dlm.get_body().is_none());
    drop(body);
    assert!(f.dlm.get_body().is_some());
}

#[test]
fn lists_are_exhaustible() {
    let f = continuous();
    let held: Vec<_> = (0..4).map(|_| f.dlm.acquire().unwrap()).collect();
    assert!(f.dlm.acquire().is_none());
    drop(held);
    assert_eq!(f.dlm.free_count(), 4);
}

#[test]
fn frame_end_flags_debug_lists_names() {
    let flags = FrameEndFlags::COMPLETED | FrameEndFlags::WRITEBACK;
    assert_eq!(
        std::format!("{flags:?}"),
        "FrameEndFlags(COMPLETED | WRITEBACK)"
    );
    assert_eq!(std::format!("{:?}", FrameEndFlags::empty()), "FrameEndFlags()");
}

// =============================================================================
// Invariants
// =============================================================================

#[derive(Clone, Copy, Debug)]
enum Step {
    Commit,
    Latch,
    FrameEnd,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Commit), Just(Step::Latch), Just(Step::FrameEnd)]
}

proptest! {
    /// Under any interleaving of commits, device fetches and frame ends:
    /// slots never share a list, no list leaks, lists become active in
    /// commit order, and a replaced pending list never becomes active.
    #[test]
    fn commit_protocol_invariants(steps in prop::collection::vec(step(), 1..120)) {
        let f = continuous();
        let mut seq_of: BTreeMap<usize, u64> = BTreeMap::new();
        let mut superseded: BTreeSet<u64> = BTreeSet::new();
        let mut next_seq = 0_u64;
        let mut last_active: Option<u64> = None;

        for step in steps {
            match step {
                Step::Commit => {
                    let pending_before = f.dlm.pending_id().map(|id| seq_of[&id]);
                    let id = f.commit(FrameEndFlags::empty());
                    seq_of.insert(id, next_seq);
                    if f.dlm.pending_id() == Some(id) {
                        if let Some(old) = pending_before {
                            superseded.insert(old);
                        }
                    }
                    next_seq += 1;
                }
                Step::Latch => f.vsp.latch(0),
                Step::FrameEnd => {
                    let flags = f.dlm.irq_frame_end(false);
                    if flags.contains(FrameEndFlags::COMPLETED) {
                        let active = seq_of[&f.dlm.active_id().unwrap()];
                        prop_assert!(!superseded.contains(&active));
                        if let Some(last) = last_active {
                            prop_assert!(active > last);
                        }
                        last_active = Some(active);
                    }
                }
            }

            let (active, queued, pending) = f.slots();
            let occupied: Vec<usize> = [active, queued, pending].into_iter().flatten().collect();
            let distinct: BTreeSet<usize> = occupied.iter().copied().collect();
            prop_assert_eq!(distinct.len(), occupied.len());
            prop_assert_eq!(f.dlm.free_count() + occupied.len(), f.dlm.capacity());

            // Slots hold lists in commit order.
            let seqs: Vec<u64> = occupied.iter().map(|id| seq_of[id]).collect();
            prop_assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

#[test]
fn completion_within_two_frame_ends() {
    let f = continuous();
    // Commit races the first frame end: the device fetches only at the
    // second frame start.
    f.commit(FrameEndFlags::empty());
    assert!(!f.dlm.irq_frame_end(false).contains(FrameEndFlags::COMPLETED));
    assert!(f.frame().contains(FrameEndFlags::COMPLETED));
}

#[test]
fn pending_list_is_never_overtaken() {
    let f = continuous();
    let a = f.commit(FrameEndFlags::empty());
    let b = f.commit(FrameEndFlags::empty());
    assert_eq!(f.slots(), (None, Some(a), Some(b)));

    // The device fetched `a` at frame start; the frame end has not come yet.
    f.vsp.latch(0);
    let c = f.commit(FrameEndFlags::empty());
    assert_eq!(f.slots(), (None, Some(a), Some(c)));

    assert!(f.dlm.irq_frame_end(false).contains(FrameEndFlags::COMPLETED));
    assert_eq!(f.slots(), (Some(a), Some(c), None));
}
