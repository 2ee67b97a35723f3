//! Rendering devices and stroke state.
//!
//! A device consumes paint operations (fill/stroke/clip of paths and
//! text, images, masks, groups, tiles, layers) and either rasterizes them
//! into a pixmap or records them into a display list. A device accepts an
//! arbitrarily nested sequence of operations followed by exactly one
//! `close`; operations after close are undefined.
//!
//! Clip-family operations push an implicit clip that must be popped with
//! [`Device::pop_clip`]. Balancing push and pop is the caller's contract:
//! the device forwards unbalanced pops to the engine without tracking
//! nesting depth.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::geometry::{Matrix, Rect};
use crate::core::handle::OwnedHandle;
use crate::core::runtime::Context;
use crate::resources::colorspace::ColorSpace;
use crate::resources::image::Image;
use crate::resources::path::Path;
use crate::resources::text::Text;
use std::sync::Arc;

/// Group compositing blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub fn as_native(self) -> i32 {
        self as i32
    }
}

/// Line cap styles for stroking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
    Triangle,
}

/// Line join styles for stroking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
    MiterXps,
}

/// Stroking parameters shared by stroke and clip-stroke operations.
pub struct StrokeState {
    handle: OwnedHandle,
}

impl StrokeState {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<StrokeState> {
        Ok(StrokeState {
            handle: OwnedHandle::new(ctx, HandleKind::StrokeState, raw)?,
        })
    }

    pub(crate) fn handle(&self) -> &OwnedHandle {
        &self.handle
    }

    fn engine(&self) -> &dyn NativeEngine {
        self.handle.ctx().engine()
    }

    pub fn close(&self) {
        self.handle.close()
    }

    pub fn line_width(&self) -> VellumResult<f32> {
        Ok(self.engine().stroke_state_line_width(self.handle.get()?)?)
    }

    pub fn set_line_width(&self, width: f32) -> VellumResult<()> {
        Ok(self.engine().stroke_state_set_line_width(self.handle.get()?, width)?)
    }

    pub fn set_miter_limit(&self, limit: f32) -> VellumResult<()> {
        Ok(self.engine().stroke_state_set_miter_limit(self.handle.get()?, limit)?)
    }

    pub fn set_line_cap(&self, cap: LineCap) -> VellumResult<()> {
        Ok(self.engine().stroke_state_set_line_cap(self.handle.get()?, cap as i32)?)
    }

    pub fn set_line_join(&self, join: LineJoin) -> VellumResult<()> {
        Ok(self.engine().stroke_state_set_line_join(self.handle.get()?, join as i32)?)
    }
}

/// A rendering device. Construct with
/// [`Runtime::draw_device`](crate::core::runtime::Runtime::draw_device) or
/// [`Runtime::display_list_device`](crate::core::runtime::Runtime::display_list_device).
pub struct Device {
    handle: OwnedHandle,
}

impl Device {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Device> {
        Ok(Device {
            handle: OwnedHandle::new(ctx, HandleKind::Device, raw)?,
        })
    }

    pub(crate) fn handle(&self) -> &OwnedHandle {
        &self.handle
    }

    fn ctx(&self) -> &Arc<Context> {
        self.handle.ctx()
    }

    fn engine(&self) -> &dyn NativeEngine {
        self.handle.ctx().engine()
    }

    /// Flushes and finishes the device. Call exactly once, after the last
    /// paint operation; releasing the handle does not imply a close.
    pub fn finish(&self) -> VellumResult<()> {
        Ok(self.engine().close_device(self.handle.get()?)?)
    }

    /// Releases the native device handle.
    pub fn close(&self) {
        self.handle.close()
    }

    pub fn fill_path(
        &self,
        path: &Path,
        even_odd: bool,
        ctm: &Matrix,
        colorspace: &ColorSpace,
        color: &[f32],
        alpha: f32,
    ) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let color_ptr = ctx.scratch.color(engine, color)?;
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.fill_path(
            self.handle.get()?,
            path.handle().get()?,
            even_odd,
            ctm_ptr,
            colorspace.handle().get()?,
            color_ptr,
            alpha,
        )?)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stroke_path(
        &self,
        path: &Path,
        stroke: &StrokeState,
        ctm: &Matrix,
        colorspace: &ColorSpace,
        color: &[f32],
        alpha: f32,
    ) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let color_ptr = ctx.scratch.color(engine, color)?;
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.stroke_path(
            self.handle.get()?,
            path.handle().get()?,
            stroke.handle().get()?,
            ctm_ptr,
            colorspace.handle().get()?,
            color_ptr,
            alpha,
        )?)
    }

    /// Pushes a clip from a path; pop with [`Device::pop_clip`].
    pub fn clip_path(&self, path: &Path, even_odd: bool, ctm: &Matrix) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.clip_path(self.handle.get()?, path.handle().get()?, even_odd, ctm_ptr)?)
    }

    pub fn clip_stroke_path(
        &self,
        path: &Path,
        stroke: &StrokeState,
        ctm: &Matrix,
    ) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.clip_stroke_path(
            self.handle.get()?,
            path.handle().get()?,
            stroke.handle().get()?,
            ctm_ptr,
        )?)
    }

    pub fn fill_text(
        &self,
        text: &Text,
        ctm: &Matrix,
        colorspace: &ColorSpace,
        color: &[f32],
        alpha: f32,
    ) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let color_ptr = ctx.scratch.color(engine, color)?;
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.fill_text(
            self.handle.get()?,
            text.handle().get()?,
            ctm_ptr,
            colorspace.handle().get()?,
            color_ptr,
            alpha,
        )?)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stroke_text(
        &self,
        text: &Text,
        stroke: &StrokeState,
        ctm: &Matrix,
        colorspace: &ColorSpace,
        color: &[f32],
        alpha: f32,
    ) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let color_ptr = ctx.scratch.color(engine, color)?;
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.stroke_text(
            self.handle.get()?,
            text.handle().get()?,
            stroke.handle().get()?,
            ctm_ptr,
            colorspace.handle().get()?,
            color_ptr,
            alpha,
        )?)
    }

    pub fn clip_text(&self, text: &Text, ctm: &Matrix) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.clip_text(self.handle.get()?, text.handle().get()?, ctm_ptr)?)
    }

    pub fn clip_stroke_text(
        &self,
        text: &Text,
        stroke: &StrokeState,
        ctm: &Matrix,
    ) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.clip_stroke_text(
            self.handle.get()?,
            text.handle().get()?,
            stroke.handle().get()?,
            ctm_ptr,
        )?)
    }

    /// Records text for extraction without painting it.
    pub fn ignore_text(&self, text: &Text, ctm: &Matrix) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.ignore_text(self.handle.get()?, text.handle().get()?, ctm_ptr)?)
    }

    pub fn fill_image(&self, image: &Image, ctm: &Matrix, alpha: f32) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.fill_image(self.handle.get()?, image.handle().get()?, ctm_ptr, alpha)?)
    }

    pub fn fill_image_mask(
        &self,
        image: &Image,
        ctm: &Matrix,
        colorspace: &ColorSpace,
        color: &[f32],
        alpha: f32,
    ) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let color_ptr = ctx.scratch.color(engine, color)?;
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.fill_image_mask(
            self.handle.get()?,
            image.handle().get()?,
            ctm_ptr,
            colorspace.handle().get()?,
            color_ptr,
            alpha,
        )?)
    }

    pub fn clip_image_mask(&self, image: &Image, ctm: &Matrix) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.clip_image_mask(self.handle.get()?, image.handle().get()?, ctm_ptr)?)
    }

    /// Pops the innermost clip pushed by a clip operation. Unbalanced pops
    /// are forwarded to the engine unchecked.
    pub fn pop_clip(&self) -> VellumResult<()> {
        Ok(self.engine().pop_clip(self.handle.get()?)?)
    }

    pub fn begin_mask(
        &self,
        area: &Rect,
        luminosity: bool,
        colorspace: &ColorSpace,
        color: &[f32],
    ) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let color_ptr = ctx.scratch.color(engine, color)?;
        let area_ptr = ctx.scratch.rect(engine, area);
        Ok(engine.begin_mask(
            self.handle.get()?,
            area_ptr,
            luminosity,
            colorspace.handle().get()?,
            color_ptr,
        )?)
    }

    pub fn end_mask(&self) -> VellumResult<()> {
        Ok(self.engine().end_mask(self.handle.get()?)?)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn begin_group(
        &self,
        area: &Rect,
        colorspace: &ColorSpace,
        isolated: bool,
        knockout: bool,
        blend_mode: BlendMode,
        alpha: f32,
    ) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let area_ptr = ctx.scratch.rect(engine, area);
        Ok(engine.begin_group(
            self.handle.get()?,
            area_ptr,
            colorspace.handle().get()?,
            isolated,
            knockout,
            blend_mode.as_native(),
            alpha,
        )?)
    }

    pub fn end_group(&self) -> VellumResult<()> {
        Ok(self.engine().end_group(self.handle.get()?)?)
    }

    /// Begins a tiled pattern cell. `area` and `view` travel through the
    /// two rect scratch slots of one call. Returns the engine's cache id
    /// for the tile.
    pub fn begin_tile(
        &self,
        area: &Rect,
        view: &Rect,
        xstep: f32,
        ystep: f32,
        ctm: &Matrix,
        id: i32,
    ) -> VellumResult<i32> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let area_ptr = ctx.scratch.rect(engine, area);
        let view_ptr = ctx.scratch.rect2(engine, view);
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.begin_tile(
            self.handle.get()?,
            area_ptr,
            view_ptr,
            xstep,
            ystep,
            ctm_ptr,
            id,
        )?)
    }

    pub fn end_tile(&self) -> VellumResult<()> {
        Ok(self.engine().end_tile(self.handle.get()?)?)
    }

    pub fn begin_layer(&self, name: &str) -> VellumResult<()> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let name_ptr = ctx.scratch.string(engine, name)?;
        Ok(engine.begin_layer(self.handle.get()?, name_ptr)?)
    }

    pub fn end_layer(&self) -> VellumResult<()> {
        Ok(self.engine().end_layer(self.handle.get()?)?)
    }
}
