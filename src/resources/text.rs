//! Text objects (positioned glyph runs).

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::geometry::{Matrix, Rect};
use crate::core::handle::OwnedHandle;
use crate::core::marshal::{read_matrix, read_rect};
use crate::core::runtime::Context;
use crate::resources::font::Font;
use std::sync::Arc;

/// A text object accumulating positioned glyphs, fed to device text
/// operations.
pub struct Text {
    handle: OwnedHandle,
}

impl Text {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Text> {
        Ok(Text {
            handle: OwnedHandle::new(ctx, HandleKind::Text, raw)?,
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
        let addr = engine.bound_text(self.handle.get()?)?;
        Ok(read_rect(engine, addr))
    }

    /// Places a single glyph with the given text matrix.
    pub fn show_glyph(
        &self,
        font: &Font,
        trm: &Matrix,
        glyph: i32,
        unicode: char,
        wmode: i32,
    ) -> VellumResult<()> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let trm_ptr = ctx.scratch.matrix(engine, trm);
        Ok(engine.show_glyph(
            self.handle.get()?,
            font.handle().get()?,
            trm_ptr,
            glyph,
            unicode as u32,
            wmode,
        )?)
    }

    /// Places a string and advances `trm` by the rendered width: the
    /// engine returns the updated matrix and its translation is written
    /// back so consecutive calls continue where the last one ended.
    pub fn show_string(
        &self,
        font: &Font,
        trm: &mut Matrix,
        text: &str,
        wmode: i32,
    ) -> VellumResult<()> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let trm_ptr = ctx.scratch.matrix(engine, trm);
        let text_ptr = ctx.scratch.string(engine, text)?;
        let out = engine.show_string(
            self.handle.get()?,
            font.handle().get()?,
            trm_ptr,
            text_ptr,
            wmode,
        )?;
        let advanced = read_matrix(engine, out);
        trm.e = advanced.e;
        trm.f = advanced.f;
        Ok(())
    }
}
