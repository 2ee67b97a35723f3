//! Raster image buffers.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::geometry::Rect;
use crate::core::handle::OwnedHandle;
use crate::core::runtime::Context;
use crate::resources::colorspace::ColorSpace;
use std::sync::Arc;

/// A rectangle of pixels in engine memory.
pub struct Pixmap {
    handle: OwnedHandle,
}

impl Pixmap {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Pixmap> {
        Ok(Pixmap {
            handle: OwnedHandle::new(ctx, HandleKind::Pixmap, raw)?,
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

    pub fn x(&self) -> VellumResult<i32> {
        Ok(self.engine().pixmap_x(self.handle.get()?)?)
    }

    pub fn y(&self) -> VellumResult<i32> {
        Ok(self.engine().pixmap_y(self.handle.get()?)?)
    }

    pub fn width(&self) -> VellumResult<i32> {
        Ok(self.engine().pixmap_width(self.handle.get()?)?)
    }

    pub fn height(&self) -> VellumResult<i32> {
        Ok(self.engine().pixmap_height(self.handle.get()?)?)
    }

    /// Bytes per row.
    pub fn stride(&self) -> VellumResult<i32> {
        Ok(self.engine().pixmap_stride(self.handle.get()?)?)
    }

    pub fn components(&self) -> VellumResult<i32> {
        Ok(self.engine().pixmap_components(self.handle.get()?)?)
    }

    pub fn xres(&self) -> VellumResult<i32> {
        Ok(self.engine().pixmap_xres(self.handle.get()?)?)
    }

    pub fn yres(&self) -> VellumResult<i32> {
        Ok(self.engine().pixmap_yres(self.handle.get()?)?)
    }

    pub fn set_resolution(&self, xres: i32, yres: i32) -> VellumResult<()> {
        let raw = self.handle.get()?;
        self.engine().pixmap_set_xres(raw, xres)?;
        Ok(self.engine().pixmap_set_yres(raw, yres)?)
    }

    pub fn bounds(&self) -> VellumResult<Rect> {
        let x = self.x()? as f32;
        let y = self.y()? as f32;
        Ok(Rect::new(
            x,
            y,
            x + self.width()? as f32,
            y + self.height()? as f32,
        ))
    }

    pub fn colorspace(&self) -> VellumResult<Option<ColorSpace>> {
        let raw = self.engine().pixmap_colorspace(self.handle.get()?)?;
        if raw == 0 {
            return Ok(None);
        }
        Ok(Some(ColorSpace::adopt(self.handle.ctx().clone(), raw)?))
    }

    pub fn clear(&self) -> VellumResult<()> {
        Ok(self.engine().clear_pixmap(self.handle.get()?)?)
    }

    pub fn clear_with(&self, value: i32) -> VellumResult<()> {
        Ok(self.engine().clear_pixmap_with_value(self.handle.get()?, value)?)
    }

    /// Copies the sample data out of engine memory (stride x height
    /// bytes). A copy, not a live view: engine-side reallocation cannot
    /// invalidate it.
    pub fn samples(&self) -> VellumResult<Vec<u8>> {
        let engine = self.engine();
        let raw = self.handle.get()?;
        let stride = engine.pixmap_stride(raw)?.max(0) as usize;
        let height = engine.pixmap_height(raw)?.max(0) as usize;
        let addr = engine.pixmap_samples(raw)?;
        Ok(engine.read_bytes(addr, stride * height))
    }

    /// Encodes the pixmap as PNG. The transient engine buffer is released
    /// whether or not the copy succeeds.
    pub fn to_png(&self) -> VellumResult<Vec<u8>> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let raw = engine.pixmap_as_png(self.handle.get()?)?;
        let buffer = OwnedHandle::new(ctx.clone(), HandleKind::Buffer, raw)?;
        let data = engine.buffer_data(buffer.get()?)?;
        let size = engine.buffer_size(buffer.get()?)?;
        Ok(engine.read_bytes(data, size))
    }
}
