//! Recorded display lists.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::geometry::{Matrix, Rect};
use crate::core::handle::OwnedHandle;
use crate::core::marshal::read_rect;
use crate::core::runtime::Context;
use crate::resources::colorspace::ColorSpace;
use crate::resources::device::Device;
use crate::resources::pixmap::Pixmap;
use crate::resources::structured_text::StructuredText;
use std::sync::Arc;

/// A recorded sequence of drawing operations that can be replayed through
/// any device.
pub struct DisplayList {
    handle: OwnedHandle,
}

impl DisplayList {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<DisplayList> {
        Ok(DisplayList {
            handle: OwnedHandle::new(ctx, HandleKind::DisplayList, raw)?,
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

    pub fn bounds(&self) -> VellumResult<Rect> {
        let engine = self.engine();
        let addr = engine.bound_display_list(self.handle.get()?)?;
        Ok(read_rect(engine, addr))
    }

    /// Replays the list through `device`.
    pub fn run(&self, device: &Device, ctm: &Matrix) -> VellumResult<()> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        Ok(engine.run_display_list(self.handle.get()?, device.handle().get()?, ctm_ptr)?)
    }

    /// Rasterizes the list into a new pixmap.
    pub fn to_pixmap(
        &self,
        ctm: &Matrix,
        colorspace: &ColorSpace,
        alpha: bool,
    ) -> VellumResult<Pixmap> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        let raw = engine.pixmap_from_display_list(
            self.handle.get()?,
            ctm_ptr,
            colorspace.handle().get()?,
            alpha,
        )?;
        Pixmap::own(ctx.clone(), raw)
    }

    /// Extracts the list's text.
    pub fn to_structured_text(&self) -> VellumResult<StructuredText> {
        let raw = self.engine().stext_from_display_list(self.handle.get()?)?;
        StructuredText::own(self.handle.ctx().clone(), raw)
    }
}
