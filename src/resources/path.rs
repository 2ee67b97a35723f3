//! Vector path construction.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::geometry::{Matrix, Rect};
use crate::core::handle::OwnedHandle;
use crate::core::marshal::read_rect;
use crate::core::runtime::Context;
use std::sync::Arc;

/// A path under construction, fed to device fill/stroke/clip operations.
pub struct Path {
    handle: OwnedHandle,
}

impl Path {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Path> {
        Ok(Path {
            handle: OwnedHandle::new(ctx, HandleKind::Path, raw)?,
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

    pub fn move_to(&self, x: f32, y: f32) -> VellumResult<()> {
        Ok(self.engine().path_move_to(self.handle.get()?, x, y)?)
    }

    pub fn line_to(&self, x: f32, y: f32) -> VellumResult<()> {
        Ok(self.engine().path_line_to(self.handle.get()?, x, y)?)
    }

    pub fn curve_to(&self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, ex: f32, ey: f32) -> VellumResult<()> {
        Ok(self
            .engine()
            .path_curve_to(self.handle.get()?, c1x, c1y, c2x, c2y, ex, ey)?)
    }

    /// Cubic curve using the current point as the first control point.
    pub fn curve_to_v(&self, cx: f32, cy: f32, ex: f32, ey: f32) -> VellumResult<()> {
        Ok(self.engine().path_curve_to_v(self.handle.get()?, cx, cy, ex, ey)?)
    }

    /// Cubic curve using the end point as the second control point.
    pub fn curve_to_y(&self, cx: f32, cy: f32, ex: f32, ey: f32) -> VellumResult<()> {
        Ok(self.engine().path_curve_to_y(self.handle.get()?, cx, cy, ex, ey)?)
    }

    pub fn rect(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> VellumResult<()> {
        Ok(self.engine().path_rect(self.handle.get()?, x0, y0, x1, y1)?)
    }

    /// Closes the current subpath.
    pub fn close_path(&self) -> VellumResult<()> {
        Ok(self.engine().path_close(self.handle.get()?)?)
    }

    pub fn transform(&self, matrix: &Matrix) -> VellumResult<()> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let matrix_ptr = ctx.scratch.matrix(engine, matrix);
        Ok(engine.transform_path(self.handle.get()?, matrix_ptr)?)
    }

    pub fn bounds(&self) -> VellumResult<Rect> {
        let engine = self.engine();
        let addr = engine.bound_path(self.handle.get()?)?;
        Ok(read_rect(engine, addr))
    }
}
