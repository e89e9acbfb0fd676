// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! DU (display unit) register map.
//!
//! Each CRTC owns a register window at `channel_base(index)`; per-channel
//! offsets below are relative to that window. Channels are paired in
//! groups that share the plane priority and clock selection registers.

/// Base offset of the register window of DU channel `index`.
#[must_use]
pub const fn channel_base(index: usize) -> u32 {
    match index {
        0 => 0x0_0000,
        1 => 0x3_0000,
        2 => 0x4_0000,
        _ => 0x7_0000,
    }
}

/// Base offset of the group owning channel `index`.
#[must_use]
pub const fn group_base(index: usize) -> u32 {
    channel_base(index - index % 2)
}

// =============================================================================
// System control
// =============================================================================

/// Display system control.
pub const DSYSR: u32 = 0x0000;
/// Interlace mode enable.
pub const DSYSR_ILTS: u32 = 1 << 29;
/// Display reset.
pub const DSYSR_DRES: u32 = 1 << 9;
/// Display enable.
pub const DSYSR_DEN: u32 = 1 << 8;
/// TV sync mode field.
pub const DSYSR_TVM_MASK: u32 = 3 << 6;
/// TV sync mode: master (the DU generates sync).
pub const DSYSR_TVM_MASTER: u32 = 0;
/// TV sync mode: switching, used while stopping.
pub const DSYSR_TVM_SWITCH: u32 = 1 << 6;

/// Display mode register.
pub const DSMR: u32 = 0x0004;
/// Vertical sync polarity high.
pub const DSMR_VSL: u32 = 1 << 18;
/// Horizontal sync polarity high.
pub const DSMR_HSL: u32 = 1 << 17;
/// Display-enable pin outputs the display period.
pub const DSMR_DIPM_DISP: u32 = 0;
/// Composite sync pin mode.
pub const DSMR_CSPM: u32 = 1 << 24;
/// Odd/even field signal output (interlaced).
pub const DSMR_ODEV: u32 = 1 << 8;

/// Display status register.
pub const DSSR: u32 = 0x0008;
/// Frame end.
pub const DSSR_FRM: u32 = 1 << 0;
/// Horizontal blanking.
pub const DSSR_HBK: u32 = 1 << 8;
/// Raster interrupt.
pub const DSSR_RINT: u32 = 1 << 9;
/// Vertical blanking.
pub const DSSR_VBK: u32 = 1 << 11;
/// TV sync error.
pub const DSSR_TVR: u32 = 1 << 15;

/// Display status clear register.
///
/// Writing a one clears the corresponding `DSSR` bit.
pub const DSRCR: u32 = 0x000c;
/// Bits of `DSSR` that software may clear through `DSRCR`.
pub const DSRCR_MASK: u32 = DSSR_TVR | DSSR_VBK | DSSR_RINT | DSSR_HBK | DSSR_FRM;

/// Display interrupt enable register.
pub const DIER: u32 = 0x0010;
/// Vertical blanking interrupt enable.
pub const DIER_VBE: u32 = 1 << 11;

/// Plane priority register of the first channel of a group.
pub const DS1PR: u32 = 0x0020;
/// Plane priority register of the second channel of a group.
pub const DS2PR: u32 = 0x0024;

/// Plane priority value showing only the plane fed by the VSP.
pub const DSPR_VSP: u32 = 0x1;

/// Plane priority register for channel `index`, relative to its group base.
#[must_use]
pub const fn dspr(index: usize) -> u32 {
    if index % 2 == 0 { DS1PR } else { DS2PR }
}

// =============================================================================
// Display timing
// =============================================================================

/// Horizontal display start.
pub const HDSR: u32 = 0x0040;
/// Horizontal display end.
pub const HDER: u32 = 0x0044;
/// Vertical display start.
pub const VDSR: u32 = 0x0048;
/// Vertical display end.
pub const VDER: u32 = 0x004c;
/// Horizontal cycle.
pub const HCR: u32 = 0x0050;
/// Horizontal sync width.
pub const HSWR: u32 = 0x0054;
/// Vertical cycle.
pub const VCR: u32 = 0x0058;
/// Vertical sync point.
pub const VSPR: u32 = 0x005c;
/// Data enable start.
pub const DESR: u32 = 0x0078;
/// Data enable width.
pub const DEWR: u32 = 0x007c;

// =============================================================================
// Clock selection
// =============================================================================

/// External sync / clock selection for the even channel of a group.
pub const ESCR02: u32 = 0x1_0000;
/// External sync / clock selection for the odd channel of a group.
pub const ESCR13: u32 = 0x0_1000;

/// Clock selection register for channel `index`, relative to its group base.
#[must_use]
pub const fn escr(index: usize) -> u32 {
    if index % 2 == 0 { ESCR02 } else { ESCR13 }
}

/// Dot clock from the external DCLKIN pin (or the DPLL).
pub const ESCR_DCLKSEL_DCLKIN: u32 = 1 << 20;
/// Dot clock from the internal functional clock.
pub const ESCR_DCLKSEL_CLKS: u32 = 0;
/// Divider field mask (divider minus one).
pub const ESCR_FRQSEL_MASK: u32 = 0x3f;

/// Display PLL control (shared by all channels with a DPLL).
pub const DPLLCR: u32 = 0x2_0044;
/// Write protection code, must accompany every write.
pub const DPLLCR_CODE: u32 = 0x95 << 24;
/// DPLL output clock enable.
pub const DPLLCR_CLKE: u32 = 1 << 18;
/// Standby release.
pub const DPLLCR_STBY: u32 = 1 << 2;

/// Output divider field.
#[must_use]
pub const fn dpllcr_fdpll(fdpll: u32) -> u32 {
    (fdpll & 0x3f) << 12
}

/// Feedback divider field.
#[must_use]
pub const fn dpllcr_n(n: u32) -> u32 {
    (n & 0x7f) << 5
}

/// Input divider field.
#[must_use]
pub const fn dpllcr_m(m: u32) -> u32 {
    (m & 0x3) << 3
}
