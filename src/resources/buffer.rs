//! Engine-side byte buffers.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::{VellumError, VellumResult};
use crate::core::handle::OwnedHandle;
use crate::core::runtime::Context;
use std::sync::Arc;

/// A growable byte buffer owned by the engine.
pub struct Buffer {
    handle: OwnedHandle,
}

impl Buffer {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Buffer> {
        Ok(Buffer {
            handle: OwnedHandle::new(ctx, HandleKind::Buffer, raw)?,
        })
    }

    pub(crate) fn handle(&self) -> &OwnedHandle {
        &self.handle
    }

    fn engine(&self) -> &dyn NativeEngine {
        self.handle.ctx().engine()
    }

    /// Releases the native buffer now instead of at drop.
    pub fn close(&self) {
        self.handle.close()
    }

    pub fn len(&self) -> VellumResult<usize> {
        Ok(self.engine().buffer_size(self.handle.get()?)?)
    }

    pub fn is_empty(&self) -> VellumResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads one byte at `at`.
    pub fn read_byte(&self, at: usize) -> VellumResult<u8> {
        let engine = self.engine();
        let raw = self.handle.get()?;
        let len = engine.buffer_size(raw)?;
        if at >= len {
            return Err(VellumError::OutOfRange { index: at, len });
        }
        let data = engine.buffer_data(raw)?;
        Ok(engine.read_bytes(data + at as u32, 1)[0])
    }

    /// Appends the UTF-8 bytes of `text`.
    pub fn write_str(&self, text: &str) -> VellumResult<()> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let text_ptr = ctx.scratch.string(engine, text)?;
        Ok(engine.append_string(self.handle.get()?, text_ptr)?)
    }

    pub fn write_byte(&self, byte: u8) -> VellumResult<()> {
        Ok(self.engine().append_byte(self.handle.get()?, byte as u32)?)
    }

    /// Appends `text` followed by a newline.
    pub fn write_line(&self, text: &str) -> VellumResult<()> {
        self.write_str(text)?;
        self.write_byte(b'\n')
    }

    pub fn write_buffer(&self, other: &Buffer) -> VellumResult<()> {
        Ok(self
            .engine()
            .append_buffer(self.handle.get()?, other.handle.get()?)?)
    }

    /// Copies the buffer contents out of engine memory.
    pub fn to_bytes(&self) -> VellumResult<Vec<u8>> {
        let engine = self.engine();
        let raw = self.handle.get()?;
        let data = engine.buffer_data(raw)?;
        let size = engine.buffer_size(raw)?;
        Ok(engine.read_bytes(data, size))
    }

    /// Copies the buffer contents out as (lossy) UTF-8 text.
    pub fn to_text(&self) -> VellumResult<String> {
        Ok(String::from_utf8_lossy(&self.to_bytes()?).into_owned())
    }
}
