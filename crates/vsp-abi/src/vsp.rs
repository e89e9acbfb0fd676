// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! VSP register map.
//!
//! Offsets are relative to the VSP MMIO base. Only the registers touched by
//! the display list engine and the display pipe are described. Functions
//! take the hardware index (WPF, RPF or display list channel) and return
//! the register offset for that instance.

// =============================================================================
// Command and status
// =============================================================================

/// Per-WPF command register.
#[must_use]
pub const fn cmd(index: usize) -> u32 {
    (index as u32) * 4
}

/// Start the pipeline driven by this WPF.
pub const CMD_STRCMD: u32 = 1 << 0;

/// A new display list header address has been written and not yet latched.
///
/// Set when software programs `dl_hdr_addr`, cleared by the device when it
/// starts processing that list at the next frame start.
pub const CMD_UPDHDR: u32 = 1 << 4;

/// Software reset register.
pub const SRESET: u32 = 0x0028;

/// Reset request bit for WPF `index`.
#[must_use]
pub const fn sreset_srts(index: usize) -> u32 {
    1 << index
}

/// Global status register.
pub const STATUS: u32 = 0x0038;

/// WPF `index` is active.
#[must_use]
pub const fn status_sys_act(index: usize) -> u32 {
    1 << (index + 8)
}

/// The field currently being output on WPF `index` is the bottom field.
#[must_use]
pub const fn status_fld_std(index: usize) -> u32 {
    1 << (index + 28)
}

/// WPF interrupt enable register.
#[must_use]
pub const fn wpf_irq_enb(index: usize) -> u32 {
    0x0048 + (index as u32) * 12
}

/// WPF interrupt status register.
///
/// Bits are cleared by writing zero to them; one bits are left untouched.
#[must_use]
pub const fn wpf_irq_sta(index: usize) -> u32 {
    0x004c + (index as u32) * 12
}

/// Frame end.
pub const WPF_IRQ_FRE: u32 = 1 << 0;
/// Display frame end (display list processed).
pub const WPF_IRQ_DFE: u32 = 1 << 1;
/// FIFO underrun.
pub const WPF_IRQ_UND: u32 = 1 << 16;

// =============================================================================
// Display list control
// =============================================================================

/// Display list control register.
pub const DL_CTRL: u32 = 0x0100;
/// Auto-repeat wait shift.
pub const DL_CTRL_AR_WAIT_SHIFT: u32 = 16;
/// Data conversion enable, channel 2.
pub const DL_CTRL_DC2: u32 = 1 << 12;
/// Data conversion enable, channel 1.
pub const DL_CTRL_DC1: u32 = 1 << 8;
/// Data conversion enable, channel 0.
pub const DL_CTRL_DC0: u32 = 1 << 4;
/// Continuous frame mode, channel 0.
pub const DL_CTRL_CFM0: u32 = 1 << 2;
/// No header mode, channel 0.
pub const DL_CTRL_NH0: u32 = 1 << 1;
/// Display list enable.
pub const DL_CTRL_DLE: u32 = 1 << 0;

/// Display list header (or headerless body) address for channel `index`.
#[must_use]
pub const fn dl_hdr_addr(index: usize) -> u32 {
    0x0104 + (index as u32) * 4
}

/// Display list data swap register.
pub const DL_SWAP: u32 = 0x0114;
/// Long word swap.
pub const DL_SWAP_LWS: u32 = 1 << 2;

/// Extended display list control for channel `index`.
#[must_use]
pub const fn dl_ext_ctrl(index: usize) -> u32 {
    0x011c + (index as u32) * 36
}

/// Polling interval shift for extended display lists.
pub const DL_EXT_CTRL_POLINT_SHIFT: u32 = 8;
/// Display list priority.
pub const DL_EXT_CTRL_DLPRI: u32 = 1 << 5;
/// Extended command priority.
pub const DL_EXT_CTRL_EXPRI: u32 = 1 << 4;
/// Extended display list enable.
pub const DL_EXT_CTRL_EXT: u32 = 1 << 0;

/// Body size register used in headerless mode.
pub const DL_BODY_SIZE: u32 = 0x0120;
/// Update request, cleared by the device when the body is latched.
pub const DL_BODY_SIZE_UPD: u32 = 1 << 24;
/// Body size field mask (bytes).
pub const DL_BODY_SIZE_BS_MASK: u32 = 0x1_ffff;

// =============================================================================
// RPF (read pixel formatter, one per input)
// =============================================================================

const RPF_BASE: u32 = 0x0300;
const RPF_STRIDE: u32 = 0x0100;

const fn rpf(index: usize, offset: u32) -> u32 {
    RPF_BASE + (index as u32) * RPF_STRIDE + offset
}

/// Basic read size (width << 16 | height).
#[must_use]
pub const fn rpf_src_bsize(index: usize) -> u32 {
    rpf(index, 0x00)
}

/// Extended read size (width << 16 | height) after cropping.
#[must_use]
pub const fn rpf_src_esize(index: usize) -> u32 {
    rpf(index, 0x04)
}

/// Input format.
#[must_use]
pub const fn rpf_infmt(index: usize) -> u32 {
    rpf(index, 0x08)
}

/// Data swap.
#[must_use]
pub const fn rpf_dswap(index: usize) -> u32 {
    rpf(index, 0x0c)
}

/// Display location (left << 16 | top) in the composed output.
#[must_use]
pub const fn rpf_loc(index: usize) -> u32 {
    rpf(index, 0x10)
}

/// Alpha selection.
#[must_use]
pub const fn rpf_alph_sel(index: usize) -> u32 {
    rpf(index, 0x14)
}

/// Source memory address, plane `plane` (Y, C0, C1).
#[must_use]
pub const fn rpf_srcm_addr(index: usize, plane: usize) -> u32 {
    rpf(index, 0x1c + (plane as u32) * 4)
}

/// Source memory pitch for luma (high half) and chroma (low half).
#[must_use]
pub const fn rpf_srcm_pstride(index: usize) -> u32 {
    rpf(index, 0x34)
}

/// Shift of the luma stride in `rpf_srcm_pstride`.
pub const RPF_PSTRIDE_Y_SHIFT: u32 = 16;

/// Fixed alpha value source selection: use the constant from `rpf_alph_sel`.
pub const RPF_ALPH_SEL_ASEL_FIXED: u32 = 4 << 28;

// =============================================================================
// WPF (write pixel formatter, one per output)
// =============================================================================

const WPF_BASE: u32 = 0x1000;
const WPF_STRIDE: u32 = 0x0100;

const fn wpf(index: usize, offset: u32) -> u32 {
    WPF_BASE + (index as u32) * WPF_STRIDE + offset
}

/// Source RPF selection bitmask.
#[must_use]
pub const fn wpf_srcrpf(index: usize) -> u32 {
    wpf(index, 0x00)
}

/// Master layer selection: the blend unit output.
pub const WPF_SRCRPF_VIRACT_MST: u32 = 2 << 28;

/// Horizontal clip size.
#[must_use]
pub const fn wpf_hszclip(index: usize) -> u32 {
    wpf(index, 0x04)
}

/// Vertical clip size.
#[must_use]
pub const fn wpf_vszclip(index: usize) -> u32 {
    wpf(index, 0x08)
}

/// Output format.
#[must_use]
pub const fn wpf_outfmt(index: usize) -> u32 {
    wpf(index, 0x0c)
}

/// Destination stride (luma).
#[must_use]
pub const fn wpf_dstm_stride_y(index: usize) -> u32 {
    wpf(index, 0x1c)
}

/// Destination address, plane `plane`.
#[must_use]
pub const fn wpf_dstm_addr(index: usize, plane: usize) -> u32 {
    wpf(index, 0x24 + (plane as u32) * 4)
}

/// Write-back control.
#[must_use]
pub const fn wpf_wrbck_ctrl(index: usize) -> u32 {
    wpf(index, 0x34)
}

/// Write-back mode enable.
pub const WPF_WRBCK_CTRL_WBMD: u32 = 1 << 0;

// =============================================================================
// Routing and blending
// =============================================================================

/// Routing target for RPF `index`.
#[must_use]
pub const fn dpr_rpf_route(index: usize) -> u32 {
    0x2000 + (index as u32) * 4
}

/// Route value meaning "not connected".
pub const DPR_NODE_UNUSED: u32 = 0x3f;

/// Route value for blend unit input `input`.
#[must_use]
pub const fn dpr_node_bru_in(input: usize) -> u32 {
    22 + input as u32
}

/// Blend unit input control.
pub const BRU_INCTRL: u32 = 0x2c00;

/// Blend unit virtual input size (width << 16 | height).
pub const BRU_VIRRPF_SIZE: u32 = 0x2c04;

/// Blend unit control for input `input`.
#[must_use]
pub const fn bru_ctrl(input: usize) -> u32 {
    0x2c10 + (input as u32) * 8
}

/// Blend unit blend factors for input `input`.
#[must_use]
pub const fn bru_bld(input: usize) -> u32 {
    0x2c14 + (input as u32) * 8
}

/// Input enable inside `bru_ctrl`.
pub const BRU_CTRL_RBC: u32 = 1 << 31;

// =============================================================================
// LIF (link to the DU)
// =============================================================================

/// LIF control.
pub const LIF_CTRL: u32 = 0x3b00;
/// Output buffer threshold shift.
pub const LIF_CTRL_OBTH_SHIFT: u32 = 16;
/// Output is in YCbCr (used for interlaced outputs).
pub const LIF_CTRL_CFMT: u32 = 1 << 4;
/// LIF enable.
pub const LIF_CTRL_LIF_EN: u32 = 1 << 0;
