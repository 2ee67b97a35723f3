//! Structured text extracted from a page or display list.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::handle::OwnedHandle;
use crate::core::marshal::take_string;
use crate::core::runtime::Context;
use std::sync::Arc;

/// The text of one page, organized into blocks, lines and characters on
/// the engine side.
pub struct StructuredText {
    handle: OwnedHandle,
}

impl StructuredText {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<StructuredText> {
        Ok(StructuredText {
            handle: OwnedHandle::new(ctx, HandleKind::StructuredText, raw)?,
        })
    }

    fn engine(&self) -> &dyn NativeEngine {
        self.handle.ctx().engine()
    }

    pub fn close(&self) {
        self.handle.close()
    }

    /// Serializes the page text as JSON, with coordinates scaled by
    /// `scale`. The engine allocates the result string; it is copied out
    /// and freed here.
    pub fn as_json(&self, scale: f32) -> VellumResult<String> {
        let engine = self.engine();
        let addr = engine.stext_as_json(self.handle.get()?, scale)?;
        Ok(take_string(engine, addr))
    }
}
