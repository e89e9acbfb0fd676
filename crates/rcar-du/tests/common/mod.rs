// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared test infrastructure for integration tests.
//!
//! [`Display`] wires a modelled DU and VSP to one CRTC, its pipe and both
//! interrupt handlers, the way a board driver would when it binds.
//!
//! This module is not a test file, so it follows the full clippy rules.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::sync::{Arc, Once};

use rcar_du::mock::{MockDu, RecordingSink};
use rcar_du::{
    Crtc, CrtcConfig, DeviceContext, DuIrqHandler, IrqReturn, PipeError, VspDrmPipe,
    VspIrqHandler,
};
use tracing_subscriber::EnvFilter;
use vsp_abi::{Generation, vsp};
use vsp_dl::platform::{MockDmaAllocator, MockRegisters, MockVsp};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// DU channel 0 fed by VSP output 0.
pub struct Display {
    pub du: MockDu,
    pub vsp: MockVsp,
    pub sink: Arc<RecordingSink>,
    pub pipe: Arc<VspDrmPipe<MockRegisters>>,
    pub crtc: Arc<Crtc<MockRegisters>>,
    pub vsp_irq: VspIrqHandler<MockRegisters>,
    pub du_irq: DuIrqHandler<MockRegisters>,
}

impl Display {
    /// A disabled display on `generation` hardware.
    ///
    /// `config` adjusts the CRTC configuration before the CRTC is built.
    pub fn new(
        generation: Generation,
        config: impl FnOnce(CrtcConfig) -> CrtcConfig,
    ) -> Result<Self, PipeError> {
        init_tracing();
        let info = generation.info();

        let vsp = MockVsp::new(info.wpf_count);
        let ctx = Arc::new(DeviceContext::new(generation, Arc::clone(vsp.regs())));
        let pipe = Arc::new(VspDrmPipe::with_prealloc(
            Arc::clone(&ctx),
            0,
            4,
            &MockDmaAllocator::new(),
        )?);
        let mut vsp_irq = VspIrqHandler::new(ctx);
        vsp_irq.attach(Arc::clone(&pipe));

        let du = MockDu::new(info.du_channels);
        let sink = Arc::new(RecordingSink::new());
        let crtc = Arc::new(
            Crtc::new(
                generation,
                Arc::clone(du.regs()),
                config(CrtcConfig::new(info, 0, 297_000_000)),
                sink.clone(),
            )
            .with_pipe(Arc::clone(&pipe)),
        );
        let du_irq = DuIrqHandler::new(vec![Arc::clone(&crtc)]);

        Ok(Self {
            du,
            vsp,
            sink,
            pipe,
            crtc,
            vsp_irq,
            du_irq,
        })
    }

    /// The VSP fetches the programmed list and ends a frame.
    pub fn vsp_frame(&self) -> IrqReturn {
        self.vsp.latch(0);
        self.vsp.raise(0, vsp::WPF_IRQ_DFE);
        self.vsp_irq.handle()
    }

    /// The DU enters vertical blanking.
    pub fn vblank(&self) -> IrqReturn {
        self.du.raise_vblank(0);
        self.du_irq.handle()
    }
}
