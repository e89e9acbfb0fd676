// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Interrupt handlers.
//!
//! The VSP handler is the only place where display list completion is
//! observed; everything downstream (page flip completion, writeback
//! completion, internal commit waiters) is driven from here.

use std::fmt;
use std::sync::Arc;

use tracing::trace;
use vsp_abi::vsp;
use vsp_dl::Mmio;

use crate::context::DeviceContext;
use crate::crtc::Crtc;
use crate::pipe::VspDrmPipe;

/// Whether an interrupt was raised by this device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrqReturn {
    /// No status bit was set.
    None,
    /// At least one status bit was handled.
    Handled,
}

impl IrqReturn {
    /// Combine the results of two sources sharing a line.
    #[must_use]
    pub const fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::None, Self::None) => Self::None,
            _ => Self::Handled,
        }
    }
}

/// Interrupt handler of one VSP device.
pub struct VspIrqHandler<M: Mmio> {
    ctx: Arc<DeviceContext<M>>,
    pipes: Vec<Option<Arc<VspDrmPipe<M>>>>,
}

impl<M: Mmio> VspIrqHandler<M> {
    /// A handler with no pipes attached.
    #[must_use]
    pub fn new(ctx: Arc<DeviceContext<M>>) -> Self {
        let pipes = vec![None; ctx.info().wpf_count];
        Self { ctx, pipes }
    }

    /// Route the interrupts of the pipe's WPF to `pipe`.
    pub fn attach(&mut self, pipe: Arc<VspDrmPipe<M>>) {
        let index = pipe.index();
        if let Some(slot) = self.pipes.get_mut(index) {
            *slot = Some(pipe);
        }
    }

    /// Handle the VSP interrupt.
    ///
    /// For every WPF the enabled status bits are read and exactly those are
    /// cleared (the register is write-zero-to-clear). An underrun is
    /// counted and logged; a display frame end advances the display list
    /// state machine of the attached pipe.
    pub fn handle(&self) -> IrqReturn {
        let regs = self.ctx.regs();
        let mask = vsp::WPF_IRQ_DFE | vsp::WPF_IRQ_UND;
        let mut ret = IrqReturn::None;

        for (index, pipe) in self.pipes.iter().enumerate() {
            let status = regs.read(vsp::wpf_irq_sta(index)) & mask;
            if status == 0 {
                continue;
            }
            regs.write(vsp::wpf_irq_sta(index), !status & mask);
            ret = IrqReturn::Handled;

            let Some(pipe) = pipe else {
                trace!(wpf = index, status, "interrupt without pipe");
                continue;
            };

            if status & vsp::WPF_IRQ_UND != 0 {
                pipe.underrun();
            }
            if status & vsp::WPF_IRQ_DFE != 0 {
                pipe.frame_end();
            }
        }
        ret
    }
}

impl<M: Mmio> fmt::Debug for VspIrqHandler<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VspIrqHandler")
            .field("ctx", &self.ctx)
            .field("pipes", &self.pipes.iter().filter(|p| p.is_some()).count())
            .finish()
    }
}

/// Interrupt handler for DU channels sharing one interrupt line.
pub struct DuIrqHandler<M: Mmio> {
    crtcs: Vec<Arc<Crtc<M>>>,
}

impl<M: Mmio> DuIrqHandler<M> {
    /// Dispatch to `crtcs`.
    #[must_use]
    pub const fn new(crtcs: Vec<Arc<Crtc<M>>>) -> Self {
        Self { crtcs }
    }

    /// Handle the DU interrupt.
    pub fn handle(&self) -> IrqReturn {
        self.crtcs
            .iter()
            .fold(IrqReturn::None, |ret, crtc| ret.or(crtc.irq()))
    }
}

impl<M: Mmio> fmt::Debug for DuIrqHandler<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuIrqHandler")
            .field("crtcs", &self.crtcs.len())
            .finish()
    }
}
