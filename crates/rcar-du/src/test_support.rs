// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared helpers for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Once};

use tracing_subscriber::EnvFilter;
use vsp_abi::Generation;
use vsp_dl::platform::{MockDmaAllocator, MockRegisters, MockVsp};

use crate::context::DeviceContext;
use crate::pipe::VspDrmPipe;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A modelled VSP with a context for `generation`.
pub fn vsp_context(generation: Generation) -> (MockVsp, Arc<DeviceContext<MockRegisters>>) {
    init_tracing();
    let vsp = MockVsp::new(generation.info().wpf_count);
    let ctx = Arc::new(DeviceContext::new(generation, Arc::clone(vsp.regs())));
    (vsp, ctx)
}

/// A display pipe on WPF 0 with a small display list pool.
pub fn pipe(generation: Generation) -> (MockVsp, Arc<VspDrmPipe<MockRegisters>>) {
    let (vsp, ctx) = vsp_context(generation);
    let pipe = VspDrmPipe::with_prealloc(ctx, 0, 4, &MockDmaAllocator::new()).unwrap();
    (vsp, Arc::new(pipe))
}
