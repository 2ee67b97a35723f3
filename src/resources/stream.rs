//! Progressive remote streams.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle, StreamId};
use crate::core::error::VellumResult;
use crate::core::handle::OwnedHandle;
use crate::core::runtime::Context;
use std::sync::Arc;

/// A virtual seekable stream over a remote resource. The engine reads it
/// as if it were a fully buffered file; bytes arrive on demand through the
/// fetch subsystem, block by block. Reads of blocks that are not resident
/// yet fail with the retryable try-later condition until the fetch
/// completes.
///
/// Dropping the stream closes the engine side, which detaches the fetch
/// state; responses still in flight are discarded.
pub struct RemoteStream {
    handle: OwnedHandle,
}

impl RemoteStream {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<RemoteStream> {
        Ok(RemoteStream {
            handle: OwnedHandle::new(ctx, HandleKind::Stream, raw)?,
        })
    }

    pub(crate) fn handle(&self) -> &OwnedHandle {
        &self.handle
    }

    fn engine(&self) -> &dyn NativeEngine {
        self.handle.ctx().engine()
    }

    /// Closes the stream now instead of at drop.
    pub fn close(&self) {
        self.handle.close()
    }

    /// The engine-assigned fetch id, for progress queries against the
    /// block fetcher.
    pub fn fetch_id(&self) -> VellumResult<StreamId> {
        Ok(self.engine().stream_fetch_id(self.handle.get()?)?)
    }
}
