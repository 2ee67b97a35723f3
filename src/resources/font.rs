//! Font handles.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::handle::OwnedHandle;
use crate::core::marshal::read_string;
use crate::core::runtime::Context;
use std::sync::Arc;

/// A font, either one of the engine's built-ins or loaded from a buffer.
pub struct Font {
    handle: OwnedHandle,
}

impl Font {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Font> {
        Ok(Font {
            handle: OwnedHandle::new(ctx, HandleKind::Font, raw)?,
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
        let addr = engine.font_name(self.handle.get()?)?;
        Ok(read_string(engine, addr))
    }

    /// Glyph id for a character, or a negative value when the font has no
    /// glyph for it.
    pub fn encode_character(&self, character: char) -> VellumResult<i32> {
        Ok(self
            .engine()
            .encode_character(self.handle.get()?, character as u32)?)
    }

    /// Advance width of a glyph in text space units.
    pub fn advance_glyph(&self, glyph: i32, wmode: i32) -> VellumResult<f32> {
        Ok(self.engine().advance_glyph(self.handle.get()?, glyph, wmode)?)
    }
}
