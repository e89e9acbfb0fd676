// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Generation-specific CRTC behavior.
//!
//! The CRTC code is written once against [`GenerationOps`]; each SoC
//! generation provides a stateless implementation selected by [`ops_for`].

use std::fmt;

use vsp_abi::Generation;

use crate::clock::ClockPlan;
use crate::crtc::CrtcConfig;
use crate::error::CrtcError;
use crate::mode::{DisplayMode, TimingRegs};

/// Horizontal display start offset of the DU timing generator.
pub const HDSE_OFFSET: u32 = 19;

/// Behavior that differs between SoC generations.
pub trait GenerationOps: Send + Sync + fmt::Debug {
    /// The generation this implementation drives.
    fn generation(&self) -> Generation;

    /// Choose the dot clock source for `target` Hz.
    fn plan_clock(&self, config: &CrtcConfig, target: u64) -> Result<ClockPlan, CrtcError>;

    /// Horizontal display start offset.
    fn hdse_offset(&self) -> u32 {
        HDSE_OFFSET
    }

    /// Timing registers for `mode`.
    fn timing(&self, mode: &DisplayMode) -> Result<TimingRegs, CrtcError> {
        TimingRegs::compute(mode, self.hdse_offset())
    }

    /// Planes are fed by a VSP pipe instead of the DU plane engine.
    fn planes_via_vsp(&self) -> bool;

    /// Page flips complete in the DU vertical blanking interrupt.
    ///
    /// Otherwise they complete when the VSP reports the frame done.
    fn completes_flip_on_vblank(&self) -> bool {
        !self.planes_via_vsp()
    }
}

fn divided(config: &CrtcConfig, target: u64) -> Result<ClockPlan, CrtcError> {
    ClockPlan::divided(config.clock_rate, config.ext_clock_rate, target)
        .ok_or(CrtcError::ClockUnavailable { target })
}

/// R-Car Gen2: DU planes, divided clocks.
#[derive(Debug)]
pub struct Gen2Ops;

impl GenerationOps for Gen2Ops {
    fn generation(&self) -> Generation {
        Generation::Gen2
    }

    fn plan_clock(&self, config: &CrtcConfig, target: u64) -> Result<ClockPlan, CrtcError> {
        divided(config, target)
    }

    fn planes_via_vsp(&self) -> bool {
        false
    }
}

/// R-Car Gen3: VSP planes, display PLL on some channels.
#[derive(Debug)]
pub struct Gen3Ops;

impl GenerationOps for Gen3Ops {
    fn generation(&self) -> Generation {
        Generation::Gen3
    }

    fn plan_clock(&self, config: &CrtcConfig, target: u64) -> Result<ClockPlan, CrtcError> {
        if !config.has_dpll {
            return divided(config, target);
        }
        config
            .ext_clock_rate
            .and_then(|input| ClockPlan::dpll(input, target))
            .ok_or(CrtcError::ClockUnavailable { target })
    }

    fn planes_via_vsp(&self) -> bool {
        true
    }
}

/// R-Car Gen4: VSP planes, divided clocks.
#[derive(Debug)]
pub struct Gen4Ops;

impl GenerationOps for Gen4Ops {
    fn generation(&self) -> Generation {
        Generation::Gen4
    }

    fn plan_clock(&self, config: &CrtcConfig, target: u64) -> Result<ClockPlan, CrtcError> {
        divided(config, target)
    }

    fn planes_via_vsp(&self) -> bool {
        true
    }
}

/// The operations table for `generation`.
#[must_use]
pub const fn ops_for(generation: Generation) -> &'static dyn GenerationOps {
    match generation {
        Generation::Gen2 => &Gen2Ops,
        Generation::Gen3 => &Gen3Ops,
        Generation::Gen4 => &Gen4Ops,
    }
}
