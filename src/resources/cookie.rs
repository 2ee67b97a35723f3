//! Job cancellation cookies.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::handle::OwnedHandle;
use crate::core::runtime::Context;
use std::sync::Arc;

/// A cooperative cancellation and progress token. Long-running renders
/// poll it between work units; cancellation is advisory, not preemptive.
pub struct Cookie {
    handle: OwnedHandle,
}

impl Cookie {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Cookie> {
        Ok(Cookie {
            handle: OwnedHandle::new(ctx, HandleKind::Cookie, raw)?,
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

    /// Requests cancellation; the engine notices between work units.
    pub fn abort(&self) -> VellumResult<()> {
        Ok(self.engine().cookie_abort(self.handle.get()?)?)
    }

    /// Work units completed so far by the operation holding this cookie.
    pub fn progress(&self) -> VellumResult<i32> {
        Ok(self.engine().cookie_progress(self.handle.get()?)?)
    }
}
