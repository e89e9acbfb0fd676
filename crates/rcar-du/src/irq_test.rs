// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the interrupt handlers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::crtc::{Crtc, CrtcConfig};
use crate::irq::{DuIrqHandler, IrqReturn, VspIrqHandler};
use crate::mock::{MockDu, RecordingHandler, RecordingSink};
use crate::pipe::LifConfig;
use crate::test_support::{init_tracing, pipe};
use std::sync::Arc;
use vsp_abi::{Generation, du, vsp};

#[test]
fn irq_return_combines() {
    assert_eq!(IrqReturn::None.or(IrqReturn::None), IrqReturn::None);
    assert_eq!(IrqReturn::None.or(IrqReturn::Handled), IrqReturn::Handled);
    assert_eq!(IrqReturn::Handled.or(IrqReturn::None), IrqReturn::Handled);
}

#[test]
fn vsp_without_status_is_not_handled() {
    let (vsp, pipe) = pipe(Generation::Gen3);
    let mut handler = VspIrqHandler::new(Arc::clone(pipe.context()));
    handler.attach(Arc::clone(&pipe));

    assert_eq!(handler.handle(), IrqReturn::None);
    vsp.raise(0, vsp::WPF_IRQ_FRE);
    assert_eq!(handler.handle(), IrqReturn::None);
    assert_eq!(pipe.frame_count(), 0);
}

#[test]
fn display_frame_end_advances_the_pipe() {
    let recorder = Arc::new(RecordingHandler::new());
    let (vsp, pipe) = pipe(Generation::Gen3);
    pipe.setup_lif(Some(LifConfig::new(1920, 1080).with_handler(recorder.clone())))
        .unwrap();
    let mut handler = VspIrqHandler::new(Arc::clone(pipe.context()));
    handler.attach(Arc::clone(&pipe));

    vsp.latch(0);
    vsp.raise(0, vsp::WPF_IRQ_DFE);
    assert_eq!(handler.handle(), IrqReturn::Handled);

    assert_eq!(vsp.regs().get(vsp::wpf_irq_sta(0)), 0);
    assert_eq!(pipe.frame_count(), 1);
    assert_eq!(recorder.completions(), 1);
    assert!(pipe.dlm().active_id().is_some());
}

#[test]
fn handled_bits_are_acknowledged() {
    let (vsp, pipe) = pipe(Generation::Gen3);
    let mut handler = VspIrqHandler::new(Arc::clone(pipe.context()));
    handler.attach(Arc::clone(&pipe));

    vsp.raise(0, vsp::WPF_IRQ_DFE | vsp::WPF_IRQ_FRE);
    handler.handle();
    assert_eq!(
        vsp.regs().writes_to(vsp::wpf_irq_sta(0)),
        [!vsp::WPF_IRQ_DFE & (vsp::WPF_IRQ_DFE | vsp::WPF_IRQ_UND)]
    );
    assert_eq!(vsp.regs().get(vsp::wpf_irq_sta(0)) & vsp::WPF_IRQ_DFE, 0);
}

#[test]
fn underrun_is_counted_and_cleared() {
    let (vsp, pipe) = pipe(Generation::Gen3);
    let mut handler = VspIrqHandler::new(Arc::clone(pipe.context()));
    handler.attach(Arc::clone(&pipe));

    vsp.raise(0, vsp::WPF_IRQ_UND);
    assert_eq!(handler.handle(), IrqReturn::Handled);
    vsp.raise(0, vsp::WPF_IRQ_UND);
    handler.handle();

    assert_eq!(pipe.context().underruns(0), 2);
    assert_eq!(vsp.regs().get(vsp::wpf_irq_sta(0)), 0);
    assert_eq!(pipe.frame_count(), 0);
}

#[test]
fn unattached_output_is_acknowledged() {
    let (vsp, pipe) = pipe(Generation::Gen2);
    let handler = VspIrqHandler::new(Arc::clone(pipe.context()));

    vsp.raise(3, vsp::WPF_IRQ_DFE);
    assert_eq!(handler.handle(), IrqReturn::Handled);
    assert_eq!(vsp.regs().get(vsp::wpf_irq_sta(3)), 0);
}

#[test]
fn du_handler_dispatches_per_channel() {
    init_tracing();
    let mock = MockDu::new(2);
    let sink = Arc::new(RecordingSink::new());
    let info = Generation::Gen4.info();
    let crtcs: Vec<_> = (0..2)
        .map(|index| {
            Arc::new(Crtc::new(
                Generation::Gen4,
                Arc::clone(mock.regs()),
                CrtcConfig::new(info, index, 297_000_000),
                sink.clone(),
            ))
        })
        .collect();
    let handler = DuIrqHandler::new(crtcs.clone());

    assert_eq!(handler.handle(), IrqReturn::None);

    mock.raise_vblank(1);
    assert_eq!(handler.handle(), IrqReturn::Handled);
    assert_eq!(crtcs[0].vblank_sequence(), 0);
    assert_eq!(crtcs[1].vblank_sequence(), 1);
    assert_eq!(mock.status(1), 0);
}

#[test]
fn du_clears_only_clearable_bits() {
    init_tracing();
    let mock = MockDu::new(1);
    let crtc = Crtc::new(
        Generation::Gen3,
        Arc::clone(mock.regs()),
        CrtcConfig::new(Generation::Gen3.info(), 0, 297_000_000),
        Arc::new(RecordingSink::new()),
    );

    let sticky = 1 << 20;
    mock.raise(0, du::DSSR_VBK | du::DSSR_HBK | sticky);
    assert_eq!(crtc.irq(), IrqReturn::Handled);
    assert_eq!(mock.status(0), sticky);

    // Nothing clearable left.
    assert_eq!(crtc.irq(), IrqReturn::None);
    assert_eq!(crtc.vblank_sequence(), 1);
}
