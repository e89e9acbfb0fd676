// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! VSP display pipe.
//!
//! A pipe composes up to `rpf_count` input planes in the blend unit and
//! streams the result through the LIF to a DU channel. Every atomic update
//! is turned into one display list:
//!
//! ```text
//!   body0                 per-frame: inputs, routing, WPF, writeback
//!   stream body (shared)  per-mode: blend size, WPF clip, LIF
//! ```
//!
//! In header mode the stream body is written once when the pipe starts and
//! attached to every list. Headerless lists carry a single body, so the
//! stream registers are repeated in body0.
//!
//! The DU is told about frame completion through the
//! [`FrameCompleteHandler`] installed by [`VspDrmPipe::setup_lif`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, trace, warn};
use vsp_abi::{DmaAddr, vsp};
use vsp_dl::{
    Body, DisplayList, DlManager, DlMode, DlmConfig, DmaAllocator, FieldAddresses, FrameEndFlags, Mmio,
};

use crate::context::DeviceContext;
use crate::error::{PipeError, TimeoutError};

/// LIF output buffer threshold.
pub const LIF_OBTH: u32 = 1500;

// =============================================================================
// Plane description
// =============================================================================

/// Memory formats understood by the read and write formatters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit ARGB with per-pixel alpha.
    Argb8888,
    /// 32-bit RGB, alpha byte ignored.
    Xrgb8888,
    /// 16-bit RGB.
    Rgb565,
    /// Luma plane plus interleaved chroma plane, 2x2 subsampled.
    Nv12,
    /// Luma plane plus interleaved chroma plane, 2x1 subsampled.
    Nv16,
}

impl PixelFormat {
    /// Hardware format code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Argb8888 | Self::Xrgb8888 => 0x13,
            Self::Rgb565 => 0x06,
            Self::Nv12 => 0x42,
            Self::Nv16 => 0x41,
        }
    }

    /// Byte swapping for the format's access size.
    #[must_use]
    pub const fn swap(self) -> u32 {
        match self {
            Self::Argb8888 | Self::Xrgb8888 => 0x0c,
            Self::Rgb565 => 0x0e,
            Self::Nv12 | Self::Nv16 => 0x0f,
        }
    }

    /// Number of memory planes.
    #[must_use]
    pub const fn planes(self) -> usize {
        match self {
            Self::Argb8888 | Self::Xrgb8888 | Self::Rgb565 => 1,
            Self::Nv12 | Self::Nv16 => 2,
        }
    }

    /// Bytes per pixel of the first plane.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Argb8888 | Self::Xrgb8888 => 4,
            Self::Rgb565 => 2,
            Self::Nv12 | Self::Nv16 => 1,
        }
    }

    /// Vertical chroma subsampling factor.
    #[must_use]
    pub const fn vsub(self) -> u32 {
        match self {
            Self::Nv12 => 2,
            _ => 1,
        }
    }

    /// Whether the format carries per-pixel alpha.
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Argb8888)
    }
}

/// A rectangle in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub left: u32,
    /// Top edge.
    pub top: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl Rect {
    /// A rectangle at (`left`, `top`).
    #[must_use]
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A rectangle at the origin.
    #[must_use]
    pub const fn sized(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Configuration of one input plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneConfig {
    /// Memory format.
    pub format: PixelFormat,
    /// Visible part of the framebuffer.
    pub src: Rect,
    /// Position on the output. Must have the size of `src`.
    pub dst: Rect,
    /// Framebuffer plane addresses.
    pub mem: [DmaAddr; 3],
    /// Line pitch in bytes, shared by all planes.
    pub pitch: u32,
    /// Global alpha for formats without per-pixel alpha.
    pub alpha: u8,
    /// Stacking position; higher is on top.
    pub zpos: u32,
}

impl PlaneConfig {
    /// An opaque full-size plane at `mem`.
    #[must_use]
    pub const fn new(format: PixelFormat, width: u32, height: u32, mem: DmaAddr) -> Self {
        Self {
            format,
            src: Rect::sized(width, height),
            dst: Rect::sized(width, height),
            mem: [mem, DmaAddr::null(), DmaAddr::null()],
            pitch: width * format.bytes_per_pixel(),
            alpha: 255,
            zpos: 0,
        }
    }

    fn validate(&self) -> Result<(), PipeError> {
        if self.src.width == 0 || self.src.height == 0 {
            return Err(PipeError::InvalidPlane("empty source"));
        }
        if self.src.width != self.dst.width || self.src.height != self.dst.height {
            return Err(PipeError::InvalidPlane("scaling is not supported"));
        }
        if self.pitch == 0 {
            return Err(PipeError::InvalidPlane("zero pitch"));
        }
        if self.mem[..self.format.planes()].iter().any(|addr| addr.is_null()) {
            return Err(PipeError::InvalidPlane("missing plane address"));
        }
        Ok(())
    }

    /// Plane addresses of the first visible pixel.
    #[must_use]
    pub fn addresses(&self) -> [DmaAddr; 3] {
        let pitch = u64::from(self.pitch);
        let left = u64::from(self.src.left);
        let top = u64::from(self.src.top);

        let mut mem = [DmaAddr::null(); 3];
        mem[0] = self.mem[0].add(top * pitch + left * u64::from(self.format.bytes_per_pixel()));
        if self.format.planes() > 1 {
            let vsub = u64::from(self.format.vsub());
            // Interleaved chroma: one Cb/Cr byte pair per two luma pixels.
            mem[1] = self.mem[1].add(top / vsub * pitch + left / 2 * 2);
        }
        mem
    }

    fn strides(&self) -> [u32; 3] {
        match self.format.planes() {
            1 => [self.pitch, 0, 0],
            _ => [self.pitch, self.pitch, 0],
        }
    }
}

/// Writeback target of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WritebackConfig {
    /// Memory format.
    pub format: PixelFormat,
    /// Plane addresses.
    pub mem: [DmaAddr; 3],
    /// Line pitch in bytes.
    pub pitch: u32,
}

/// Per-flush options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushConfig {
    /// Capture this frame to memory.
    pub writeback: Option<WritebackConfig>,
}

// =============================================================================
// DU link
// =============================================================================

/// Frame completion status reported to the DU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DuStatus {
    /// A display list committed by an atomic flush started scanout.
    pub complete: bool,
    /// A writeback frame finished.
    pub writeback: bool,
}

impl DuStatus {
    /// Status reported for the frame end `flags`.
    ///
    /// A completed internal list is not a user-visible completion.
    #[must_use]
    pub const fn from_flags(flags: FrameEndFlags) -> Self {
        Self {
            complete: flags.contains(FrameEndFlags::COMPLETED)
                && !flags.contains(FrameEndFlags::INTERNAL),
            writeback: flags.contains(FrameEndFlags::WRITEBACK),
        }
    }
}

/// Receiver of frame completion, called from the VSP interrupt handler.
pub trait FrameCompleteHandler: Send + Sync {
    /// Called on every display frame end of the pipe.
    fn frame_complete(&self, status: DuStatus);
}

/// Output configuration for [`VspDrmPipe::setup_lif`].
#[derive(Clone)]
pub struct LifConfig {
    /// Output width.
    pub width: u32,
    /// Output height (frame lines, both fields when interlaced).
    pub height: u32,
    /// Interlaced output.
    pub interlaced: bool,
    /// Soft-reset and restart the pipe after a FIFO underrun.
    pub recover_underrun: bool,
    /// Frame completion receiver.
    pub handler: Option<Arc<dyn FrameCompleteHandler>>,
}

impl LifConfig {
    /// A progressive output without a completion handler.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            interlaced: false,
            recover_underrun: false,
            handler: None,
        }
    }

    /// Output interlaced frames.
    #[must_use]
    pub const fn interlaced(mut self) -> Self {
        self.interlaced = true;
        self
    }

    /// Restart the pipe after underruns.
    #[must_use]
    pub const fn with_underrun_recovery(mut self) -> Self {
        self.recover_underrun = true;
        self
    }

    /// Report frame completion to `handler`.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn FrameCompleteHandler>) -> Self {
        self.handler = Some(handler);
        self
    }
}

// =============================================================================
// Pipe
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct Output {
    width: u32,
    height: u32,
    interlaced: bool,
}

impl Output {
    const fn field_height(self) -> u32 {
        if self.interlaced {
            self.height / 2
        } else {
            self.height
        }
    }
}

struct PipeState {
    output: Option<Output>,
    inputs: Vec<Option<PlaneConfig>>,
    stream: Option<Body>,
}

/// Display pipe feeding one DU channel from WPF `index`.
pub struct VspDrmPipe<M: Mmio> {
    index: usize,
    ctx: Arc<DeviceContext<M>>,
    state: Mutex<PipeState>,
    dlm: DlManager<M>,
    handler: spin::Mutex<Option<Arc<dyn FrameCompleteHandler>>>,
    internal_done: Mutex<bool>,
    internal_cond: Condvar,
    running: AtomicBool,
    interlaced: AtomicBool,
    recover: AtomicBool,
    frames: AtomicU64,
}

impl<M: Mmio> VspDrmPipe<M> {
    /// Create the pipe on WPF `index` with the generation's default number
    /// of display lists.
    pub fn new<A: DmaAllocator + ?Sized>(
        ctx: Arc<DeviceContext<M>>,
        index: usize,
        alloc: &A,
    ) -> Result<Self, PipeError> {
        let config = DlmConfig::for_generation(ctx.info(), index);
        Self::with_config(ctx, config, alloc)
    }

    /// Create the pipe on WPF `index` with `prealloc` display lists.
    pub fn with_prealloc<A: DmaAllocator + ?Sized>(
        ctx: Arc<DeviceContext<M>>,
        index: usize,
        prealloc: usize,
        alloc: &A,
    ) -> Result<Self, PipeError> {
        let config = DlmConfig::for_generation(ctx.info(), index).with_prealloc(prealloc);
        Self::with_config(ctx, config, alloc)
    }

    fn with_config<A: DmaAllocator + ?Sized>(
        ctx: Arc<DeviceContext<M>>,
        config: DlmConfig,
        alloc: &A,
    ) -> Result<Self, PipeError> {
        let info = ctx.info();
        if config.index >= info.wpf_count {
            return Err(PipeError::InvalidOutput {
                index: config.index,
                count: info.wpf_count,
            });
        }

        let dlm = DlManager::new(config, Arc::clone(ctx.regs()), alloc)?;
        dlm.setup();
        debug!(wpf = config.index, mode = ?config.mode, "vsp pipe created");

        Ok(Self {
            index: config.index,
            state: Mutex::new(PipeState {
                output: None,
                inputs: vec![None; info.rpf_count],
                stream: None,
            }),
            ctx,
            dlm,
            handler: spin::Mutex::new(None),
            internal_done: Mutex::new(false),
            internal_cond: Condvar::new(),
            running: AtomicBool::new(false),
            interlaced: AtomicBool::new(false),
            recover: AtomicBool::new(false),
            frames: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PipeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// WPF index of this pipe.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The display list manager of this pipe.
    #[must_use]
    pub const fn dlm(&self) -> &DlManager<M> {
        &self.dlm
    }

    /// The device this pipe belongs to.
    #[must_use]
    pub const fn context(&self) -> &Arc<DeviceContext<M>> {
        &self.ctx
    }

    /// Whether the pipe is streaming.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Frame ends reported so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Stored configuration of `input`.
    #[must_use]
    pub fn input(&self, input: usize) -> Option<PlaneConfig> {
        self.lock().inputs.get(input).copied().flatten()
    }

    /// Start the pipe with `config`, or stop it with `None`.
    ///
    /// Starting commits a first display list with all inputs disabled and
    /// starts the WPF. Stopping disables all inputs, resets the WPF and
    /// drops every display list in flight; a reset timeout is logged and
    /// returned after the pipe has been torn down anyway. Stopping a
    /// stopped pipe does nothing.
    pub fn setup_lif(&self, config: Option<LifConfig>) -> Result<(), PipeError> {
        match config {
            Some(config) => self.start(config),
            None => self.stop(),
        }
    }

    fn start(&self, config: LifConfig) -> Result<(), PipeError> {
        let mut state = self.lock();
        if state.output.is_some() {
            return Err(PipeError::AlreadyRunning { index: self.index });
        }

        let output = Output {
            width: config.width,
            height: config.height,
            interlaced: config.interlaced,
        };

        let stream = match self.dlm.config().mode {
            DlMode::Header => {
                let mut body = self.dlm.get_body().ok_or(PipeError::Saturated)?;
                for (reg, value) in self.stream_writes(output) {
                    body.write(reg, value)?;
                }
                Some(body)
            }
            DlMode::Headerless => None,
        };
        state.output = Some(output);
        state.stream = stream;

        *self.handler.lock() = config.handler;
        self.interlaced.store(config.interlaced, Ordering::Release);
        self.recover.store(config.recover_underrun, Ordering::Release);

        let regs = self.ctx.regs();
        regs.write(vsp::wpf_irq_sta(self.index), 0);
        regs.write(
            vsp::wpf_irq_enb(self.index),
            vsp::WPF_IRQ_DFE | vsp::WPF_IRQ_UND,
        );
        self.ctx.apply_workarounds();

        if let Err(err) = self.configure(&state, FrameEndFlags::empty(), None) {
            regs.write(vsp::wpf_irq_enb(self.index), 0);
            state.output = None;
            state.stream = None;
            *self.handler.lock() = None;
            return Err(err);
        }

        regs.write(vsp::cmd(self.index), vsp::CMD_STRCMD);
        self.running.store(true, Ordering::Release);
        info!(
            wpf = self.index,
            width = output.width,
            height = output.height,
            interlaced = output.interlaced,
            "pipe started"
        );
        Ok(())
    }

    fn stop(&self) -> Result<(), PipeError> {
        let mut state = self.lock();
        if state.output.is_none() {
            return Ok(());
        }

        state.inputs.iter_mut().for_each(|input| *input = None);
        self.running.store(false, Ordering::Release);

        let reset = self.ctx.reset_wpf(self.index);
        self.ctx.regs().write(vsp::wpf_irq_enb(self.index), 0);
        self.dlm.reset();

        state.output = None;
        state.stream = None;
        *self.handler.lock() = None;
        info!(wpf = self.index, "pipe stopped");

        reset.map_err(PipeError::from)
    }

    /// Begin an atomic update. Holds the pipe lock until flushed or dropped.
    #[must_use]
    pub fn atomic_begin(&self) -> AtomicCommit<'_, M> {
        AtomicCommit {
            pipe: self,
            state: self.lock(),
        }
    }

    /// Commit the current configuration as an internal list and wait until
    /// the device started it.
    pub fn commit_internal(&self, timeout: Duration) -> Result<(), PipeError> {
        {
            let state = self.lock();
            *self.internal_lock() = false;
            self.configure(&state, FrameEndFlags::INTERNAL, None)?;
        }

        let done = self.internal_lock();
        let (done, _) = self
            .internal_cond
            .wait_timeout_while(done, timeout, |done| !*done)
            .unwrap_or_else(PoisonError::into_inner);
        if !*done {
            warn!(wpf = self.index, "internal commit timeout");
            return Err(TimeoutError {
                what: "internal commit",
                timeout,
            }
            .into());
        }
        Ok(())
    }

    fn internal_lock(&self) -> MutexGuard<'_, bool> {
        self.internal_done
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Display frame end, called from the interrupt handler.
    pub fn frame_end(&self) -> FrameEndFlags {
        let flags = self
            .dlm
            .irq_frame_end(self.interlaced.load(Ordering::Acquire));

        if flags.contains(FrameEndFlags::INTERNAL) {
            *self.internal_lock() = true;
            self.internal_cond.notify_all();
        }

        self.frames.fetch_add(1, Ordering::Relaxed);
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler.frame_complete(DuStatus::from_flags(flags));
        }

        trace!(wpf = self.index, ?flags, "frame end");
        flags
    }

    /// FIFO underrun, called from the interrupt handler.
    ///
    /// Returns the running total for this output.
    pub fn underrun(&self) -> u32 {
        let total = self.ctx.record_underrun(self.index);
        warn!(wpf = self.index, total, "underrun");
        if self.recover.load(Ordering::Acquire) && self.is_running() {
            self.recover_underrun();
        }
        total
    }

    /// Soft-reset the WPF and restart it from the newest committed list.
    pub fn recover_underrun(&self) {
        let index = self.index;
        self.dlm.restore(|regs| {
            // Runs under the slot lock: spin instead of sleeping.
            if self.ctx.reset_wpf_with(index, std::hint::spin_loop).is_err() {
                return;
            }
            self.dlm.setup();
            regs.write(vsp::wpf_irq_enb(index), vsp::WPF_IRQ_DFE | vsp::WPF_IRQ_UND);
            self.ctx.apply_workarounds();
        });
        self.ctx
            .regs()
            .write(vsp::cmd(index), vsp::CMD_STRCMD);
        debug!(wpf = index, "pipe restarted after underrun");
    }

    fn stream_writes(&self, output: Output) -> [(u32, u32); 5] {
        let height = output.field_height();
        let mut lif = (LIF_OBTH << vsp::LIF_CTRL_OBTH_SHIFT) | vsp::LIF_CTRL_LIF_EN;
        if output.interlaced {
            lif |= vsp::LIF_CTRL_CFMT;
        }
        [
            (vsp::BRU_INCTRL, 0),
            (vsp::BRU_VIRRPF_SIZE, (output.width << 16) | height),
            (vsp::wpf_hszclip(self.index), output.width),
            (vsp::wpf_vszclip(self.index), height),
            (vsp::LIF_CTRL, lif),
        ]
    }

    /// Build the display list for the staged configuration without
    /// committing it.
    ///
    /// Must not be called while an [`AtomicCommit`] of this pipe is open.
    pub fn build_list(
        &self,
        writeback: Option<&WritebackConfig>,
    ) -> Result<DisplayList, PipeError> {
        let state = self.lock();
        self.build(&state, writeback)
    }

    /// Build and commit a display list from `state`.
    fn configure(
        &self,
        state: &PipeState,
        flags: FrameEndFlags,
        writeback: Option<&WritebackConfig>,
    ) -> Result<(), PipeError> {
        let dl = self.build(state, writeback)?;
        let flags = if writeback.is_some() {
            flags | FrameEndFlags::WRITEBACK
        } else {
            flags
        };
        trace!(wpf = self.index, id = dl.id(), ?flags, "pipe configured");
        self.dlm.commit(dl, flags);
        Ok(())
    }

    fn build(
        &self,
        state: &PipeState,
        writeback: Option<&WritebackConfig>,
    ) -> Result<DisplayList, PipeError> {
        let output = state
            .output
            .ok_or(PipeError::NotRunning { index: self.index })?;
        let mut dl = self.dlm.acquire().ok_or(PipeError::Saturated)?;

        match &state.stream {
            Some(stream) => dl.add_body(stream)?,
            None => {
                for (reg, value) in self.stream_writes(output) {
                    dl.write(reg, value)?;
                }
            }
        }

        let mut order: Vec<(usize, &PlaneConfig)> = state
            .inputs
            .iter()
            .enumerate()
            .filter_map(|(rpf, plane)| plane.as_ref().map(|plane| (rpf, plane)))
            .collect();
        order.sort_by_key(|&(rpf, plane)| (plane.zpos, rpf));

        let mut srcrpf = vsp::WPF_SRCRPF_VIRACT_MST;
        for (slot, &(rpf, plane)) in order.iter().enumerate() {
            write_input(&mut dl, rpf, slot, plane, output.interlaced)?;
            srcrpf |= 1 << rpf;
        }
        for (rpf, _) in state.inputs.iter().enumerate().filter(|(_, plane)| plane.is_none()) {
            dl.write(vsp::dpr_rpf_route(rpf), vsp::DPR_NODE_UNUSED)?;
        }
        dl.write(vsp::wpf_srcrpf(self.index), srcrpf)?;

        match writeback {
            Some(wb) => {
                dl.write(vsp::wpf_outfmt(self.index), wb.format.code())?;
                dl.write(vsp::wpf_dstm_stride_y(self.index), wb.pitch)?;
                for plane in 0..wb.format.planes() {
                    dl.write(vsp::wpf_dstm_addr(self.index, plane), wb.mem[plane].as_reg())?;
                }
                dl.write(vsp::wpf_wrbck_ctrl(self.index), vsp::WPF_WRBCK_CTRL_WBMD)?;
            }
            None => {
                dl.write(vsp::wpf_outfmt(self.index), PixelFormat::Argb8888.code())?;
                dl.write(vsp::wpf_wrbck_ctrl(self.index), 0)?;
            }
        }

        if output.interlaced {
            for &(rpf, plane) in &order {
                if let Some(cmd) = dl.pre_cmd() {
                    let fields = FieldAddresses::interleaved(plane.addresses(), plane.strides());
                    cmd.set_field_addresses(rpf, &fields)?;
                }
            }
        }

        Ok(dl)
    }
}

fn write_input(
    dl: &mut DisplayList,
    rpf: usize,
    slot: usize,
    plane: &PlaneConfig,
    interlaced: bool,
) -> Result<(), PipeError> {
    let (height, top, field_pitch) = if interlaced {
        (plane.src.height / 2, plane.dst.top / 2, plane.pitch * 2)
    } else {
        (plane.src.height, plane.dst.top, plane.pitch)
    };
    let size = (plane.src.width << 16) | height;

    dl.write(vsp::rpf_src_bsize(rpf), size)?;
    dl.write(vsp::rpf_src_esize(rpf), size)?;
    dl.write(vsp::rpf_infmt(rpf), plane.format.code())?;
    dl.write(vsp::rpf_dswap(rpf), plane.format.swap())?;
    dl.write(vsp::rpf_loc(rpf), (plane.dst.left << 16) | top)?;

    let alpha = if plane.format.has_alpha() {
        0
    } else {
        vsp::RPF_ALPH_SEL_ASEL_FIXED | u32::from(plane.alpha)
    };
    dl.write(vsp::rpf_alph_sel(rpf), alpha)?;

    let mem = plane.addresses();
    for (index, addr) in mem.iter().take(plane.format.planes()).enumerate() {
        dl.write(vsp::rpf_srcm_addr(rpf, index), addr.as_reg())?;
    }
    let chroma = if plane.format.planes() > 1 { field_pitch } else { 0 };
    dl.write(
        vsp::rpf_srcm_pstride(rpf),
        (field_pitch << vsp::RPF_PSTRIDE_Y_SHIFT) | chroma,
    )?;

    dl.write(vsp::dpr_rpf_route(rpf), vsp::dpr_node_bru_in(slot))?;
    dl.write(vsp::bru_ctrl(slot), vsp::BRU_CTRL_RBC)?;
    dl.write(vsp::bru_bld(slot), u32::from(plane.alpha))?;
    Ok(())
}

impl<M: Mmio> fmt::Debug for VspDrmPipe<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VspDrmPipe")
            .field("index", &self.index)
            .field("running", &self.is_running())
            .field("frames", &self.frame_count())
            .field("dlm", &self.dlm)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Atomic update
// =============================================================================

/// An atomic update in progress on a pipe.
///
/// Input changes are staged with [`atomic_update`](Self::atomic_update) and
/// reach the device as one display list on
/// [`atomic_flush`](Self::atomic_flush). Dropping the update without
/// flushing keeps the staged inputs for the next flush.
pub struct AtomicCommit<'a, M: Mmio> {
    pipe: &'a VspDrmPipe<M>,
    state: MutexGuard<'a, PipeState>,
}

impl<M: Mmio> AtomicCommit<'_, M> {
    /// Stage `config` for `input`, or disable the input with `None`.
    pub fn atomic_update(
        &mut self,
        input: usize,
        config: Option<PlaneConfig>,
    ) -> Result<(), PipeError> {
        let count = self.state.inputs.len();
        if input >= count {
            return Err(PipeError::InputOutOfRange { input, count });
        }
        if let Some(plane) = &config {
            plane.validate()?;
        }
        self.state.inputs[input] = config;
        trace!(wpf = self.pipe.index, input, enabled = config.is_some(), "input staged");
        Ok(())
    }

    /// Commit the staged configuration.
    ///
    /// Fails with [`PipeError::Saturated`] when every display list is in
    /// flight; the staged inputs are kept.
    pub fn atomic_flush(self, config: &FlushConfig) -> Result<(), PipeError> {
        self.pipe
            .configure(&self.state, FrameEndFlags::empty(), config.writeback.as_ref())
    }
}
