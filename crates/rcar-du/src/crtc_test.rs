// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for CRTC enable, disable and page flips.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::clock::ClockSource;
use crate::crtc::{Crtc, CrtcConfig, CrtcState, TeardownReport};
use crate::error::CrtcError;
use crate::flip::FlipEvent;
use crate::irq::IrqReturn;
use crate::mock::{MockDu, RecordingSink, SinkEvent};
use crate::mode::DisplayMode;
use crate::test_support::{init_tracing, pipe};
use std::sync::Arc;
use std::time::Duration;
use vsp_abi::{Generation, du};
use vsp_dl::platform::{MockRegisters, MockVsp};

const SHORT: Duration = Duration::from_millis(5);

struct Rig {
    du: MockDu,
    vsp: Option<MockVsp>,
    sink: Arc<RecordingSink>,
    crtc: Crtc<MockRegisters>,
}

fn rig(
    generation: Generation,
    index: usize,
    config: impl FnOnce(CrtcConfig) -> CrtcConfig,
) -> Rig {
    init_tracing();
    let info = generation.info();
    let du = MockDu::new(info.du_channels);
    let sink = Arc::new(RecordingSink::new());
    let config = config(CrtcConfig::new(info, index, 297_000_000).with_timeouts(SHORT, SHORT));
    let crtc = Crtc::new(generation, Arc::clone(du.regs()), config, sink.clone());

    if info.vsp_planes {
        let (vsp, pipe) = pipe(generation);
        Rig {
            du,
            vsp: Some(vsp),
            sink,
            crtc: crtc.with_pipe(pipe),
        }
    } else {
        Rig {
            du,
            vsp: None,
            sink,
            crtc,
        }
    }
}

fn gen3() -> Rig {
    rig(Generation::Gen3, 0, |config| config)
}

fn gen2() -> Rig {
    rig(Generation::Gen2, 0, |config| config)
}

#[test]
fn starts_disabled() {
    let rig = gen3();
    assert_eq!(rig.crtc.state(), CrtcState::Disabled);
    assert_eq!(rig.crtc.mode(), None);
    assert!(rig.crtc.pipe().is_some());
}

#[test]
fn enable_programs_timing_and_starts_pipe() {
    let rig = gen3();
    rig.crtc.enable(&DisplayMode::CEA_1080P60).unwrap();

    assert_eq!(rig.crtc.state(), CrtcState::Running);
    assert_eq!(rig.crtc.mode(), Some(DisplayMode::CEA_1080P60));
    assert_eq!(rig.du.reg(0, du::HDSR), 173);
    assert_eq!(rig.du.reg(0, du::VCR), 1124);
    assert_eq!(rig.du.reg(0, du::DSMR), DisplayMode::CEA_1080P60.dsmr());
    assert_eq!(rig.du.group_reg(0, du::escr(0)), du::ESCR_DCLKSEL_CLKS | 1);
    assert_eq!(rig.du.group_reg(0, du::DS1PR), du::DSPR_VSP);
    assert_ne!(rig.du.reg(0, du::DIER) & du::DIER_VBE, 0);

    let dsysr = rig.du.reg(0, du::DSYSR);
    assert_ne!(dsysr & du::DSYSR_DEN, 0);
    assert_eq!(dsysr & (du::DSYSR_DRES | du::DSYSR_TVM_MASK), 0);

    assert!(rig.crtc.pipe().unwrap().is_running());
    assert_eq!(rig.crtc.clock_plan().unwrap().rate, 148_500_000);
}

#[test]
fn enable_twice_is_a_no_op() {
    let rig = gen3();
    rig.crtc.enable(&DisplayMode::CEA_1080P60).unwrap();
    rig.crtc.enable(&DisplayMode::VESA_1024X768_60).unwrap();
    assert_eq!(rig.crtc.mode(), Some(DisplayMode::CEA_1080P60));
}

#[test]
fn invalid_mode_leaves_crtc_disabled() {
    let rig = gen3();
    let broken = DisplayMode {
        htotal: 2000,
        ..DisplayMode::CEA_1080P60
    };
    assert!(matches!(
        rig.crtc.enable(&broken),
        Err(CrtcError::InvalidMode(_))
    ));
    assert_eq!(rig.crtc.state(), CrtcState::Disabled);
    assert!(!rig.crtc.pipe().unwrap().is_running());
}

#[test]
fn dpll_channel_without_reference_fails() {
    let rig = rig(Generation::Gen3, 1, |config| config);
    assert_eq!(
        rig.crtc.enable(&DisplayMode::CEA_1080P60),
        Err(CrtcError::ClockUnavailable {
            target: 148_500_000
        })
    );
    assert_eq!(rig.crtc.state(), CrtcState::Disabled);
}

#[test]
fn dpll_channel_programs_pll() {
    let rig = rig(Generation::Gen3, 1, |config| config.with_ext_clock(27_000_000));
    rig.crtc.enable(&DisplayMode::CEA_1080P60).unwrap();

    let plan = rig.crtc.clock_plan().unwrap();
    assert!(matches!(plan.source, ClockSource::Dpll(_)));
    assert_eq!(rig.du.group_reg(1, du::DPLLCR), plan.dpllcr().unwrap());
    assert_eq!(rig.du.group_reg(1, du::escr(1)), du::ESCR_DCLKSEL_DCLKIN);
    assert_eq!(rig.du.group_reg(1, du::DS2PR), du::DSPR_VSP);
}

#[test]
fn disable_waits_one_vblank() {
    let rig = gen3();
    rig.crtc.enable(&DisplayMode::CEA_1080P60).unwrap();

    // No interrupt arrives: the bounded wait expires.
    let report = rig.crtc.disable().unwrap();
    assert_eq!(report.vblank_waits, 1);
    assert!(report.vblank_timeout);
    assert!(!report.flip_timeout);
    assert_eq!(report.pipe_error, None);

    assert_eq!(rig.crtc.state(), CrtcState::Disabled);
    assert_eq!(rig.crtc.mode(), None);
    assert_eq!(rig.du.group_reg(0, du::DS1PR), 0);
    assert_eq!(rig.du.reg(0, du::DIER) & du::DIER_VBE, 0);
    let dsysr = rig.du.reg(0, du::DSYSR);
    assert_eq!(dsysr & du::DSYSR_DEN, 0);
    assert_ne!(dsysr & du::DSYSR_DRES, 0);
    assert_eq!(dsysr & du::DSYSR_TVM_MASK, du::DSYSR_TVM_SWITCH);
    assert!(!rig.crtc.pipe().unwrap().is_running());
}

#[test]
fn disable_with_pending_vblank_waits_two() {
    let rig = gen3();
    rig.crtc.enable(&DisplayMode::CEA_1080P60).unwrap();
    rig.du.raise_vblank(0);

    let report = rig.crtc.disable().unwrap();
    assert_eq!(report.vblank_waits, 2);
    assert_eq!(rig.crtc.last_vblank_arm(), 2);
}

#[test]
fn disable_of_disabled_crtc_does_nothing() {
    let rig = gen3();
    assert_eq!(rig.crtc.disable().unwrap(), TeardownReport::default());
    assert!(rig.du.regs().writes().is_empty());
}

#[test]
fn flip_completes_on_vsp_frame_end() {
    let rig = gen3();
    rig.crtc.enable(&DisplayMode::CEA_1080P60).unwrap();
    rig.crtc.queue_page_flip(FlipEvent { cookie: 1 }).unwrap();
    assert_eq!(
        rig.crtc.queue_page_flip(FlipEvent { cookie: 2 }),
        Err(CrtcError::FlipPending { index: 0 })
    );

    // A DU vblank alone does not complete it.
    rig.du.raise_vblank(0);
    assert_eq!(rig.crtc.irq(), IrqReturn::Handled);
    assert!(rig.crtc.flip_pending());

    rig.vsp.as_ref().unwrap().latch(0);
    rig.crtc.pipe().unwrap().frame_end();
    assert!(!rig.crtc.flip_pending());
    assert_eq!(
        rig.sink.events(),
        [
            SinkEvent::Vblank {
                crtc: 0,
                sequence: 1
            },
            SinkEvent::FlipDone {
                crtc: 0,
                event: FlipEvent { cookie: 1 },
                sequence: 1
            },
        ]
    );
}

#[test]
fn flip_completes_on_du_vblank_without_vsp() {
    let rig = gen2();
    assert!(rig.crtc.pipe().is_none());
    rig.crtc.enable(&DisplayMode::VESA_1024X768_60).unwrap();
    rig.crtc.queue_page_flip(FlipEvent { cookie: 9 }).unwrap();

    rig.du.raise_vblank(0);
    rig.crtc.irq();
    assert_eq!(rig.sink.flips(), [FlipEvent { cookie: 9 }]);
    assert_eq!(rig.crtc.vblank_sequence(), 1);
}

#[test]
fn disable_forces_stuck_flip() {
    let rig = gen3();
    rig.crtc.enable(&DisplayMode::CEA_1080P60).unwrap();
    rig.crtc.queue_page_flip(FlipEvent { cookie: 4 }).unwrap();

    let report = rig.crtc.disable().unwrap();
    assert!(report.flip_timeout);
    assert_eq!(rig.sink.flips(), [FlipEvent { cookie: 4 }]);
    assert!(!rig.crtc.flip_pending());
}

#[test]
fn wait_page_flip_without_flip_is_immediate() {
    let rig = gen3();
    rig.crtc.wait_page_flip().unwrap();
}

#[test]
fn crtc_can_be_enabled_again() {
    let rig = gen3();
    rig.crtc.enable(&DisplayMode::CEA_1080P60).unwrap();
    rig.crtc.disable().unwrap();
    rig.crtc.enable(&DisplayMode::VESA_1024X768_60).unwrap();

    assert_eq!(rig.crtc.state(), CrtcState::Running);
    assert_eq!(rig.du.reg(0, du::DEWR), 1024);
    assert_eq!(rig.du.reg(0, du::DSYSR) & du::DSYSR_DRES, 0);
    assert!(rig.crtc.pipe().unwrap().is_running());
}
