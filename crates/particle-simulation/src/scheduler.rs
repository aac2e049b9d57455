//! Per-frame orchestration
//!
//! Each tick runs, in order: optional injection into the read slot, the
//! physics step (read slot -> write slot), then clear + render sampling the
//! read slot. The frame on screen therefore trails the freshly stepped state
//! by exactly one tick.

use crate::backend::{ParticleBackend, SlotPair};
use crate::error::Result;
use particle_physics::{pointer_ndc, DrawRange, InjectionBlock, RingCursor};
use rand::rngs::ThreadRng;
use rand::Rng;

/// Pointer position in device pixels plus the pressed-button bitmask
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    pub buttons: u32,
}

impl PointerState {
    pub fn is_pressed(&self) -> bool {
        self.buttons != 0
    }
}

/// Drawing-buffer geometry for the current frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            pixel_ratio,
        }
    }
}

/// Receives the particle counter after every injection
pub trait CounterSink {
    fn show(&mut self, count: u64);
}

impl<F: FnMut(u64)> CounterSink for F {
    fn show(&mut self, count: u64) {
        self(count)
    }
}

/// What happened during one [`FrameScheduler::frame`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReport {
    pub tick: u64,
    pub slots: SlotPair,
    pub injected: bool,
    pub active_count: u64,
    pub draw: DrawRange,
}

pub struct FrameScheduler<B: ParticleBackend, R: Rng = ThreadRng> {
    backend: B,
    rng: R,
    cursor: RingCursor,
    block_size: u32,
    tick: u64,
}

impl<B: ParticleBackend> FrameScheduler<B> {
    pub fn new(backend: B, block_size: u32) -> Self {
        Self::with_rng(backend, block_size, rand::rng())
    }
}

impl<B: ParticleBackend, R: Rng> FrameScheduler<B, R> {
    pub fn with_rng(backend: B, block_size: u32, rng: R) -> Self {
        Self {
            backend,
            rng,
            cursor: RingCursor::new(),
            block_size,
            tick: 0,
        }
    }

    /// Resume from an existing cursor (e.g. to exercise wraparound)
    pub fn with_cursor(mut self, cursor: RingCursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn active_count(&self) -> u64 {
        self.cursor.active_count()
    }

    /// Read/write roles for the current tick
    pub fn slots(&self) -> SlotPair {
        SlotPair::for_tick(self.tick)
    }

    pub fn draw_range(&self) -> DrawRange {
        DrawRange::for_active(self.cursor.active_count(), self.backend.grid_side())
    }

    /// Write a fresh block at the pointer into the current read slot and
    /// advance the cursor. Returns the clamped counter value.
    pub fn inject(&mut self, pointer: PointerState, viewport: Viewport) -> Result<u64> {
        let side = self.backend.grid_side();
        let position = pointer_ndc(
            pointer.x,
            pointer.y,
            viewport.width,
            viewport.height,
            viewport.pixel_ratio,
        );
        let block = InjectionBlock::generate(&mut self.rng, position, self.block_size);
        let start = self.cursor.address(side);

        self.backend.write_block(self.slots().read, start, &block)?;
        self.cursor.advance(self.block_size);

        log::debug!(
            "tick {}: injected {} at ({:.3}, {:.3}) into texel ({}, {})",
            self.tick,
            self.block_size,
            position.x,
            position.y,
            start.column,
            start.row
        );

        Ok(self.cursor.displayed(side))
    }

    pub fn step(&mut self) -> Result<()> {
        let slots = self.slots();
        self.backend.step(slots)
    }

    /// Clear and draw the current particle prefix from the read slot
    pub fn render(&mut self, target: &B::Target) -> Result<()> {
        let range = self.draw_range();
        let read = self.slots().read;
        self.backend.render(target, read, range)
    }

    /// Run one full tick and advance the tick counter.
    ///
    /// `pointer` is the single sample taken for this tick. Any error aborts
    /// the tick without advancing it.
    pub fn frame(
        &mut self,
        pointer: PointerState,
        viewport: Viewport,
        target: &B::Target,
        counter: &mut dyn CounterSink,
    ) -> Result<FrameReport> {
        let slots = self.slots();

        let injected = pointer.is_pressed();
        if injected {
            let shown = self.inject(pointer, viewport)?;
            counter.show(shown);
        }

        self.step()?;
        self.render(target)?;

        let report = FrameReport {
            tick: self.tick,
            slots,
            injected,
            active_count: self.cursor.active_count(),
            draw: self.draw_range(),
        };
        self.tick += 1;
        Ok(report)
    }
}
