//! Colorspace handles.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::handle::OwnedHandle;
use crate::core::marshal::read_string;
use crate::core::runtime::Context;
use std::sync::Arc;

/// Colorspace families reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpaceType {
    None,
    Gray,
    Rgb,
    Bgr,
    Cmyk,
    Lab,
    Indexed,
    Separation,
    Unknown(i32),
}

impl ColorSpaceType {
    pub fn from_native(value: i32) -> ColorSpaceType {
        match value {
            0 => ColorSpaceType::None,
            1 => ColorSpaceType::Gray,
            2 => ColorSpaceType::Rgb,
            3 => ColorSpaceType::Bgr,
            4 => ColorSpaceType::Cmyk,
            5 => ColorSpaceType::Lab,
            6 => ColorSpaceType::Indexed,
            7 => ColorSpaceType::Separation,
            other => ColorSpaceType::Unknown(other),
        }
    }
}

/// A colorspace. The device colorspaces are engine singletons adopted once
/// at startup and shared through the runtime.
pub struct ColorSpace {
    handle: OwnedHandle,
}

impl ColorSpace {
    /// Wraps an engine-owned colorspace, taking a reference of our own.
    pub(crate) fn adopt(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<ColorSpace> {
        Ok(ColorSpace {
            handle: OwnedHandle::adopt(ctx, HandleKind::ColorSpace, raw)?,
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

    pub fn name(&self) -> VellumResult<String> {
        let engine = self.engine();
        let addr = engine.colorspace_name(self.handle.get()?)?;
        Ok(read_string(engine, addr))
    }

    pub fn colorspace_type(&self) -> VellumResult<ColorSpaceType> {
        let value = self.engine().colorspace_type(self.handle.get()?)?;
        Ok(ColorSpaceType::from_native(value))
    }

    /// Number of color components (1 for gray, 3 for RGB, 4 for CMYK, ...).
    pub fn components(&self) -> VellumResult<u32> {
        Ok(self.engine().colorspace_components(self.handle.get()?)?.max(0) as u32)
    }
}
