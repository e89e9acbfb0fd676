// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Display modes and DU timing registers.

use vsp_abi::du;

use crate::error::CrtcError;

/// Display timings of one output mode.
///
/// Horizontal values are in pixels, vertical values in lines, both counted
/// from the start of the active area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayMode {
    /// Pixel clock in Hz.
    pub clock: u64,
    /// Active pixels per line.
    pub hdisplay: u32,
    /// First pixel of the horizontal sync pulse.
    pub hsync_start: u32,
    /// First pixel after the horizontal sync pulse.
    pub hsync_end: u32,
    /// Pixels per line including blanking.
    pub htotal: u32,
    /// Active lines per frame.
    pub vdisplay: u32,
    /// First line of the vertical sync pulse.
    pub vsync_start: u32,
    /// First line after the vertical sync pulse.
    pub vsync_end: u32,
    /// Lines per frame including blanking.
    pub vtotal: u32,
    /// Horizontal sync is active high.
    pub hsync_high: bool,
    /// Vertical sync is active high.
    pub vsync_high: bool,
    /// Interlaced output.
    pub interlaced: bool,
}

impl DisplayMode {
    /// CEA-861 1920x1080 at 60 Hz.
    pub const CEA_1080P60: Self = Self {
        clock: 148_500_000,
        hdisplay: 1920,
        hsync_start: 2008,
        hsync_end: 2052,
        htotal: 2200,
        vdisplay: 1080,
        vsync_start: 1084,
        vsync_end: 1089,
        vtotal: 1125,
        hsync_high: true,
        vsync_high: true,
        interlaced: false,
    };

    /// VESA 1024x768 at 60 Hz.
    pub const VESA_1024X768_60: Self = Self {
        clock: 65_000_000,
        hdisplay: 1024,
        hsync_start: 1048,
        hsync_end: 1184,
        htotal: 1344,
        vdisplay: 768,
        vsync_start: 771,
        vsync_end: 777,
        vtotal: 806,
        hsync_high: false,
        vsync_high: false,
        interlaced: false,
    };

    /// Check that the timings describe a mode the DU can generate.
    ///
    /// `hdse_offset` is the generation's horizontal display start offset;
    /// the horizontal back porch plus sync must cover it.
    pub fn validate(&self, hdse_offset: u32) -> Result<(), CrtcError> {
        if self.clock == 0 {
            return Err(CrtcError::InvalidMode("zero pixel clock"));
        }
        if self.hdisplay == 0 || self.vdisplay == 0 {
            return Err(CrtcError::InvalidMode("empty active area"));
        }
        if !(self.hdisplay <= self.hsync_start
            && self.hsync_start < self.hsync_end
            && self.hsync_end <= self.htotal)
        {
            return Err(CrtcError::InvalidMode("horizontal timings out of order"));
        }
        if !(self.vdisplay <= self.vsync_start
            && self.vsync_start < self.vsync_end
            && self.vsync_end <= self.vtotal)
        {
            return Err(CrtcError::InvalidMode("vertical timings out of order"));
        }
        if self.htotal - self.hsync_start < hdse_offset {
            return Err(CrtcError::InvalidMode("horizontal back porch too short"));
        }
        if self.vtotal - self.vsync_end < 2 {
            return Err(CrtcError::InvalidMode("vertical back porch too short"));
        }
        Ok(())
    }

    /// Display mode register value for these timings.
    #[must_use]
    pub const fn dsmr(&self) -> u32 {
        let mut value = du::DSMR_DIPM_DISP | du::DSMR_CSPM;
        if self.vsync_high {
            value |= du::DSMR_VSL;
        }
        if self.hsync_high {
            value |= du::DSMR_HSL;
        }
        if self.interlaced {
            value |= du::DSMR_ODEV;
        }
        value
    }
}

/// DU timing register values, derived from a validated [`DisplayMode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingRegs {
    /// Horizontal display start.
    pub hdsr: u32,
    /// Horizontal display end.
    pub hder: u32,
    /// Horizontal sync width.
    pub hswr: u32,
    /// Horizontal cycle.
    pub hcr: u32,
    /// Vertical display start.
    pub vdsr: u32,
    /// Vertical display end.
    pub vder: u32,
    /// Vertical sync point.
    pub vspr: u32,
    /// Vertical cycle.
    pub vcr: u32,
    /// Data enable start.
    pub desr: u32,
    /// Data enable width.
    pub dewr: u32,
}

impl TimingRegs {
    /// Compute the timing registers of `mode`.
    pub fn compute(mode: &DisplayMode, hdse_offset: u32) -> Result<Self, CrtcError> {
        mode.validate(hdse_offset)?;

        let hstart = mode.htotal - mode.hsync_start;
        let vstart = mode.vtotal - mode.vsync_end;
        Ok(Self {
            hdsr: hstart - hdse_offset,
            hder: hstart + mode.hdisplay - hdse_offset,
            hswr: mode.hsync_end - mode.hsync_start - 1,
            hcr: mode.htotal - 1,
            vdsr: vstart - 2,
            vder: vstart + mode.vdisplay - 2,
            vspr: vstart + mode.vsync_start - 1,
            vcr: mode.vtotal - 1,
            desr: hstart - 1,
            dewr: mode.hdisplay,
        })
    }

    /// `(register, value)` pairs in programming order.
    #[must_use]
    pub const fn writes(&self) -> [(u32, u32); 10] {
        [
            (du::HDSR, self.hdsr),
            (du::HDER, self.hder),
            (du::HSWR, self.hswr),
            (du::HCR, self.hcr),
            (du::VDSR, self.vdsr),
            (du::VDER, self.vder),
            (du::VSPR, self.vspr),
            (du::VCR, self.vcr),
            (du::DESR, self.desr),
            (du::DEWR, self.dewr),
        ]
    }
}
