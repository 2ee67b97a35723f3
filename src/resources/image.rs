//! Image handles.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::handle::OwnedHandle;
use crate::core::runtime::Context;
use crate::resources::colorspace::ColorSpace;
use crate::resources::pixmap::Pixmap;
use std::sync::Arc;

/// A compressed or decoded image owned by the engine.
pub struct Image {
    handle: OwnedHandle,
}

impl Image {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Image> {
        Ok(Image {
            handle: OwnedHandle::new(ctx, HandleKind::Image, raw)?,
        })
    }

    pub(crate) fn adopt(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Image> {
        Ok(Image {
            handle: OwnedHandle::adopt(ctx, HandleKind::Image, raw)?,
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

    pub fn width(&self) -> VellumResult<i32> {
        Ok(self.engine().image_width(self.handle.get()?)?)
    }

    pub fn height(&self) -> VellumResult<i32> {
        Ok(self.engine().image_height(self.handle.get()?)?)
    }

    pub fn components(&self) -> VellumResult<i32> {
        Ok(self.engine().image_components(self.handle.get()?)?)
    }

    pub fn bits_per_component(&self) -> VellumResult<i32> {
        Ok(self.engine().image_bits_per_component(self.handle.get()?)?)
    }

    pub fn xres(&self) -> VellumResult<i32> {
        Ok(self.engine().image_xres(self.handle.get()?)?)
    }

    pub fn yres(&self) -> VellumResult<i32> {
        Ok(self.engine().image_yres(self.handle.get()?)?)
    }

    pub fn is_mask(&self) -> VellumResult<bool> {
        Ok(self.engine().image_is_mask(self.handle.get()?)?)
    }

    /// The image's colorspace, if it has one.
    pub fn colorspace(&self) -> VellumResult<Option<ColorSpace>> {
        let raw = self.engine().image_colorspace(self.handle.get()?)?;
        if raw == 0 {
            return Ok(None);
        }
        Ok(Some(ColorSpace::adopt(self.handle.ctx().clone(), raw)?))
    }

    /// The image's soft mask, if it has one.
    pub fn mask(&self) -> VellumResult<Option<Image>> {
        let raw = self.engine().image_mask(self.handle.get()?)?;
        if raw == 0 {
            return Ok(None);
        }
        Ok(Some(Image::adopt(self.handle.ctx().clone(), raw)?))
    }

    /// Decodes the image into a pixmap.
    pub fn to_pixmap(&self) -> VellumResult<Pixmap> {
        let raw = self.engine().image_to_pixmap(self.handle.get()?)?;
        Pixmap::own(self.handle.ctx().clone(), raw)
    }
}
