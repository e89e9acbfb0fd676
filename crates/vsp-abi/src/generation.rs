// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Hardware generation tables.
//!
//! Behavior that differs between SoC generations is selected from a
//! [`Generation`] tag and the constant [`DeviceInfo`] it carries, instead of
//! feature bitmasks scattered through the driver.

use core::fmt;

/// R-Car SoC generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Generation {
    /// R-Car H2/M2: headerless display lists, DU composes planes itself.
    Gen2,
    /// R-Car H3/M3: header mode with extended display lists, VSP planes.
    Gen3,
    /// R-Car V4H: header mode without extended commands, VSP planes.
    Gen4,
}

/// Constant description of one generation's display hardware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Which generation this table describes.
    pub generation: Generation,
    /// Human readable SoC family name.
    pub name: &'static str,
    /// Number of VSP inputs (RPFs) usable by one display pipe.
    pub rpf_count: usize,
    /// Number of VSP outputs (WPFs).
    pub wpf_count: usize,
    /// Number of DU channels (CRTCs).
    pub du_channels: usize,
    /// Display outputs use header mode display lists.
    pub header_display_lists: bool,
    /// Display lists support extended pre/post commands.
    pub extended_dl: bool,
    /// Bitmask of DU channels driven by a display PLL.
    pub dpll_mask: u8,
    /// DU planes are composed by the VSP rather than by the DU.
    pub vsp_planes: bool,
}

const GEN2_INFO: DeviceInfo = DeviceInfo {
    generation: Generation::Gen2,
    name: "R-Car Gen2",
    rpf_count: 4,
    wpf_count: 4,
    du_channels: 3,
    header_display_lists: false,
    extended_dl: false,
    dpll_mask: 0,
    vsp_planes: false,
};

const GEN3_INFO: DeviceInfo = DeviceInfo {
    generation: Generation::Gen3,
    name: "R-Car Gen3",
    rpf_count: 5,
    wpf_count: 1,
    du_channels: 4,
    header_display_lists: true,
    extended_dl: true,
    dpll_mask: 0b0110,
    vsp_planes: true,
};

const GEN4_INFO: DeviceInfo = DeviceInfo {
    generation: Generation::Gen4,
    name: "R-Car Gen4",
    rpf_count: 5,
    wpf_count: 1,
    du_channels: 2,
    header_display_lists: true,
    extended_dl: false,
    dpll_mask: 0,
    vsp_planes: true,
};

impl Generation {
    /// The hardware description table for this generation.
    #[must_use]
    pub const fn info(self) -> &'static DeviceInfo {
        match self {
            Self::Gen2 => &GEN2_INFO,
            Self::Gen3 => &GEN3_INFO,
            Self::Gen4 => &GEN4_INFO,
        }
    }
}

impl DeviceInfo {
    /// Whether DU channel `index` has a display PLL.
    #[must_use]
    pub const fn has_dpll(&self, index: usize) -> bool {
        index < 8 && self.dpll_mask & (1 << index) != 0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}
