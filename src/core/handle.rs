//! The resource-ownership wrapper.
//!
//! Every engine object the binding holds is manually reference counted on
//! the native side. [`OwnedHandle`] pairs one handle with a release that
//! runs exactly once: explicitly through [`OwnedHandle::close`], or as a
//! backstop when the wrapper is dropped. The raw handle is zeroed on
//! release, so use-after-close fails deterministically instead of touching
//! a stale handle.

use crate::core::engine::{HandleKind, RawHandle};
use crate::core::error::{VellumError, VellumResult};
use crate::core::runtime::Context;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// A host-side owner of exactly one native handle.
pub struct OwnedHandle {
    ctx: Arc<Context>,
    kind: HandleKind,
    raw: AtomicU32,
}

impl OwnedHandle {
    /// Wraps a handle the binding owns (a fresh reference returned by the
    /// engine). Fails on a zero handle.
    pub fn new(ctx: Arc<Context>, kind: HandleKind, raw: RawHandle) -> VellumResult<OwnedHandle> {
        if raw == 0 {
            return Err(VellumError::NullHandle(kind.name()));
        }
        Ok(OwnedHandle {
            ctx,
            kind,
            raw: AtomicU32::new(raw),
        })
    }

    /// Wraps a borrowed handle by taking a reference of our own first.
    /// Required for every handle the binding did not originate (entries of
    /// engine-owned lists, probed capability handles, singletons) so that
    /// release decrements a count we are entitled to decrement.
    pub fn adopt(ctx: Arc<Context>, kind: HandleKind, raw: RawHandle) -> VellumResult<OwnedHandle> {
        if raw == 0 {
            return Err(VellumError::NullHandle(kind.name()));
        }
        let kept = ctx.engine().keep(kind, raw)?;
        OwnedHandle::new(ctx, kind, kept)
    }

    /// The live handle, or a use-after-close error once released.
    pub fn get(&self) -> VellumResult<RawHandle> {
        match self.raw.load(Ordering::Acquire) {
            0 => Err(VellumError::Closed(self.kind.name())),
            raw => Ok(raw),
        }
    }

    /// The raw handle value without a liveness check; zero once released.
    /// Only for identity comparisons and diagnostics.
    pub fn peek(&self) -> RawHandle {
        self.raw.load(Ordering::Acquire)
    }

    /// Releases the native reference now. Idempotent: the first call (or
    /// the eventual drop) zeroes the handle; later calls are no-ops.
    pub fn close(&self) {
        let raw = self.raw.swap(0, Ordering::AcqRel);
        if raw != 0 {
            self.ctx.engine().drop_handle(self.kind, raw);
        }
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} {}]", self.kind.name(), self.peek())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::NativeEngine;
    use crate::core::test_engine::TestEngine;

    fn ctx() -> (TestEngine, Arc<Context>) {
        let engine = TestEngine::new();
        engine.boot().unwrap();
        let ctx = Context::new(Arc::new(engine.clone())).unwrap();
        (engine, ctx)
    }

    #[test]
    fn test_zero_handle_rejected() {
        let (_engine, ctx) = ctx();
        assert!(matches!(
            OwnedHandle::new(ctx.clone(), HandleKind::Buffer, 0),
            Err(VellumError::NullHandle(_))
        ));
        assert!(OwnedHandle::adopt(ctx, HandleKind::Buffer, 0).is_err());
    }

    #[test]
    fn test_close_releases_exactly_once() {
        let (engine, ctx) = ctx();
        let raw = engine.register_handle(HandleKind::Buffer);
        let handle = OwnedHandle::new(ctx, HandleKind::Buffer, raw).unwrap();

        handle.close();
        handle.close();
        drop(handle);

        assert_eq!(engine.drop_count(raw), 1);
    }

    #[test]
    fn test_drop_alone_releases_once() {
        let (engine, ctx) = ctx();
        let raw = engine.register_handle(HandleKind::Page);
        drop(OwnedHandle::new(ctx, HandleKind::Page, raw).unwrap());
        assert_eq!(engine.drop_count(raw), 1);
    }

    #[test]
    fn test_get_after_close_fails() {
        let (engine, ctx) = ctx();
        let raw = engine.register_handle(HandleKind::Font);
        let handle = OwnedHandle::new(ctx, HandleKind::Font, raw).unwrap();
        assert_eq!(handle.get().unwrap(), raw);

        handle.close();
        assert!(matches!(handle.get(), Err(VellumError::Closed("font"))));
        assert_eq!(handle.peek(), 0);
    }

    #[test]
    fn test_adopt_pairs_keep_with_release() {
        let (engine, ctx) = ctx();
        let raw = engine.register_handle(HandleKind::Link);
        assert_eq!(engine.refcount(raw), 1);

        let adopted = OwnedHandle::adopt(ctx, HandleKind::Link, raw).unwrap();
        assert_eq!(engine.refcount(raw), 2);

        drop(adopted);
        assert_eq!(engine.refcount(raw), 1);
    }
}
