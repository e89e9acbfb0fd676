// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Per-device VSP context.
//!
//! Everything the pipes and the interrupt handler of one VSP instance share:
//! the register window, the generation table, underrun counters and the
//! register workaround list. Instances never share state with each other.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, error};
use vsp_abi::{DeviceInfo, Generation, vsp};
use vsp_dl::Mmio;

use crate::error::TimeoutError;

/// Status polls before a WPF reset is declared failed.
pub const RESET_POLL_TRIES: u32 = 10;

/// Delay between two status polls of a sleeping reset.
pub const RESET_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Shared state of one VSP device.
pub struct DeviceContext<M: Mmio> {
    info: &'static DeviceInfo,
    regs: Arc<M>,
    underruns: Box<[AtomicU32]>,
    workarounds: Vec<(u32, u32)>,
}

impl<M: Mmio> DeviceContext<M> {
    /// Context for a device of `generation` behind `regs`.
    #[must_use]
    pub fn new(generation: Generation, regs: Arc<M>) -> Self {
        let info = generation.info();
        let underruns = (0..info.wpf_count).map(|_| AtomicU32::new(0)).collect();
        Self {
            info,
            regs,
            underruns,
            workarounds: Vec::new(),
        }
    }

    /// Register writes applied after every pipe start and reset.
    #[must_use]
    pub fn with_workarounds(mut self, workarounds: Vec<(u32, u32)>) -> Self {
        self.workarounds = workarounds;
        self
    }

    /// Hardware description of this device.
    #[must_use]
    pub const fn info(&self) -> &'static DeviceInfo {
        self.info
    }

    /// Generation of this device.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.info.generation
    }

    /// The register window.
    #[must_use]
    pub const fn regs(&self) -> &Arc<M> {
        &self.regs
    }

    /// Count an underrun on WPF `index` and return the running total.
    pub fn record_underrun(&self, index: usize) -> u32 {
        self.underruns
            .get(index)
            .map_or(0, |count| count.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Underruns seen on WPF `index` so far.
    #[must_use]
    pub fn underruns(&self, index: usize) -> u32 {
        self.underruns
            .get(index)
            .map_or(0, |count| count.load(Ordering::Relaxed))
    }

    /// Apply the register workarounds of this device.
    pub fn apply_workarounds(&self) {
        for &(offset, value) in &self.workarounds {
            self.regs.write(offset, value);
        }
    }

    /// Reset WPF `index` and wait for it to stop, sleeping between polls.
    pub fn reset_wpf(&self, index: usize) -> Result<(), TimeoutError> {
        self.reset_wpf_with(index, || thread::sleep(RESET_POLL_INTERVAL))
    }

    /// Reset WPF `index`, calling `delay` between status polls.
    ///
    /// Used with a spinning delay where sleeping is not allowed.
    pub fn reset_wpf_with(&self, index: usize, mut delay: impl FnMut()) -> Result<(), TimeoutError> {
        let active = vsp::status_sys_act(index);
        if self.regs.read(vsp::STATUS) & active == 0 {
            return Ok(());
        }

        self.regs.write(vsp::SRESET, vsp::sreset_srts(index));
        for _ in 0..RESET_POLL_TRIES {
            if self.regs.read(vsp::STATUS) & active == 0 {
                debug!(wpf = index, "wpf reset");
                return Ok(());
            }
            delay();
        }

        error!(wpf = index, "failed to reset wpf");
        Err(TimeoutError {
            what: "wpf reset",
            timeout: RESET_POLL_INTERVAL * RESET_POLL_TRIES,
        })
    }
}

impl<M: Mmio> fmt::Debug for DeviceContext<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext")
            .field("generation", &self.info.generation)
            .field("workarounds", &self.workarounds.len())
            .finish_non_exhaustive()
    }
}
