//! Scalar marshaling between host values and engine linear memory.
//!
//! Fixed-shape composites (rectangles, matrices, colors) travel through a
//! scratch region allocated once at startup: encode writes the value into
//! the slot for its kind and hands the slot's address to exactly one native
//! call. The region is deliberately not reentrant: a second encode of the
//! same kind overwrites the first. That is safe under the crate's
//! single-timeline discipline (no suspension between encode and call).
//!
//! Strings are the exception: encoding allocates engine memory sized to the
//! UTF-8 byte length plus a terminator. The rotating scratch slot frees the
//! previous allocation on each encode; [`alloc_string`] hands ownership to
//! the caller for the rare calls that need two live strings at once.

use crate::core::engine::{Address, NativeEngine};
use crate::core::error::{VellumError, VellumResult};
use crate::core::geometry::{Matrix, Point, Quad, Rect};
use std::sync::Mutex;

const F32_SIZE: u32 = 4;

/// Pre-allocated scratch slots in engine linear memory.
pub struct Scratch {
    /// Two packed rect slots; dual-rect calls use both.
    rect: Address,
    matrix: Address,
    color: Address,
    /// Address of the previous string encode, freed on the next one.
    string: Mutex<Address>,
}

impl Scratch {
    /// Allocates the scratch slots. Called once per engine at startup.
    pub fn allocate(engine: &dyn NativeEngine) -> VellumResult<Scratch> {
        Ok(Scratch {
            rect: engine.malloc(8 * F32_SIZE as usize)?,
            matrix: engine.malloc(6 * F32_SIZE as usize)?,
            color: engine.malloc(4 * F32_SIZE as usize)?,
            string: Mutex::new(0),
        })
    }

    /// Encodes a rectangle into the first rect slot.
    pub fn rect(&self, engine: &dyn NativeEngine, r: &Rect) -> Address {
        write_f32s(engine, self.rect, &[r.x0, r.y0, r.x1, r.y1]);
        self.rect
    }

    /// Encodes a rectangle into the second rect slot, for calls taking two
    /// rectangles (tile area and view).
    pub fn rect2(&self, engine: &dyn NativeEngine, r: &Rect) -> Address {
        let slot = self.rect + 4 * F32_SIZE;
        write_f32s(engine, slot, &[r.x0, r.y0, r.x1, r.y1]);
        slot
    }

    /// Encodes a matrix into the matrix slot.
    pub fn matrix(&self, engine: &dyn NativeEngine, m: &Matrix) -> Address {
        write_f32s(engine, self.matrix, &[m.a, m.b, m.c, m.d, m.e, m.f]);
        self.matrix
    }

    /// Encodes 1..=4 color components into the color slot. The shape is
    /// checked before anything is written.
    pub fn color(&self, engine: &dyn NativeEngine, components: &[f32]) -> VellumResult<Address> {
        if components.is_empty() || components.len() > 4 {
            return Err(VellumError::Shape {
                what: "color",
                expected: "1..=4 components",
                actual: components.len(),
            });
        }
        write_f32s(engine, self.color, components);
        Ok(self.color)
    }

    /// Encodes a string into a fresh engine allocation, freeing the one
    /// from the previous call. The returned address stays valid until the
    /// next `string` encode.
    pub fn string(&self, engine: &dyn NativeEngine, text: &str) -> VellumResult<Address> {
        let mut slot = self.string.lock().unwrap();
        if *slot != 0 {
            engine.free(*slot);
            *slot = 0;
        }
        let addr = alloc_string(engine, text)?;
        *slot = addr;
        Ok(addr)
    }
}

/// Allocates a NUL-terminated UTF-8 copy of `text` in engine memory. The
/// caller owns the allocation and must free it (unless ownership is
/// explicitly transferred to the engine).
pub fn alloc_string(engine: &dyn NativeEngine, text: &str) -> VellumResult<Address> {
    let bytes = text.as_bytes();
    let addr = engine.malloc(bytes.len() + 1)?;
    engine.write_bytes(addr, bytes);
    engine.write_bytes(addr + bytes.len() as u32, &[0]);
    Ok(addr)
}

/// Reads an engine-owned string without freeing it.
pub fn read_string(engine: &dyn NativeEngine, addr: Address) -> String {
    engine.read_cstring(addr)
}

/// Reads a newly allocated engine string and frees it.
pub fn take_string(engine: &dyn NativeEngine, addr: Address) -> String {
    let text = engine.read_cstring(addr);
    engine.free(addr);
    text
}

pub fn read_point(engine: &dyn NativeEngine, addr: Address) -> Point {
    Point::new(engine.read_f32(addr), engine.read_f32(addr + F32_SIZE))
}

pub fn read_rect(engine: &dyn NativeEngine, addr: Address) -> Rect {
    Rect::new(
        engine.read_f32(addr),
        engine.read_f32(addr + F32_SIZE),
        engine.read_f32(addr + 2 * F32_SIZE),
        engine.read_f32(addr + 3 * F32_SIZE),
    )
}

pub fn read_matrix(engine: &dyn NativeEngine, addr: Address) -> Matrix {
    Matrix::new(
        engine.read_f32(addr),
        engine.read_f32(addr + F32_SIZE),
        engine.read_f32(addr + 2 * F32_SIZE),
        engine.read_f32(addr + 3 * F32_SIZE),
        engine.read_f32(addr + 4 * F32_SIZE),
        engine.read_f32(addr + 5 * F32_SIZE),
    )
}

pub fn read_quad(engine: &dyn NativeEngine, addr: Address) -> Quad {
    Quad::new(
        read_point(engine, addr),
        read_point(engine, addr + 2 * F32_SIZE),
        read_point(engine, addr + 4 * F32_SIZE),
        read_point(engine, addr + 6 * F32_SIZE),
    )
}

fn write_f32s(engine: &dyn NativeEngine, addr: Address, values: &[f32]) {
    for (i, value) in values.iter().enumerate() {
        engine.write_f32(addr + i as u32 * F32_SIZE, *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::NativeEngine;
    use crate::core::test_engine::TestEngine;

    fn engine() -> TestEngine {
        let engine = TestEngine::new();
        engine.boot().unwrap();
        engine
    }

    #[test]
    fn test_rect_roundtrip() {
        let engine = engine();
        let scratch = Scratch::allocate(&engine).unwrap();
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        let addr = scratch.rect(&engine, &r);
        assert_eq!(read_rect(&engine, addr), r);
    }

    #[test]
    fn test_dual_rect_slots_are_disjoint() {
        let engine = engine();
        let scratch = Scratch::allocate(&engine).unwrap();
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(5.0, 5.0, 9.0, 9.0);
        let pa = scratch.rect(&engine, &a);
        let pb = scratch.rect2(&engine, &b);
        assert_ne!(pa, pb);
        assert_eq!(read_rect(&engine, pa), a);
        assert_eq!(read_rect(&engine, pb), b);
    }

    #[test]
    fn test_matrix_roundtrip() {
        let engine = engine();
        let scratch = Scratch::allocate(&engine).unwrap();
        let m = Matrix::new(1.0, 0.5, -0.5, 1.0, 10.0, 20.0);
        let addr = scratch.matrix(&engine, &m);
        assert_eq!(read_matrix(&engine, addr), m);
    }

    #[test]
    fn test_color_shape_rejected_without_mutation() {
        let engine = engine();
        let scratch = Scratch::allocate(&engine).unwrap();
        let addr = scratch.color(&engine, &[0.25, 0.5, 0.75]).unwrap();

        // Both malformed shapes fail and leave the slot untouched.
        assert!(scratch.color(&engine, &[]).is_err());
        assert!(scratch.color(&engine, &[0.0; 5]).is_err());
        assert_eq!(engine.read_f32(addr), 0.25);
        assert_eq!(engine.read_f32(addr + 4), 0.5);
        assert_eq!(engine.read_f32(addr + 8), 0.75);
    }

    #[test]
    fn test_string_slot_frees_previous() {
        let engine = engine();
        let scratch = Scratch::allocate(&engine).unwrap();
        let first = scratch.string(&engine, "hello").unwrap();
        assert_eq!(engine.read_cstring(first), "hello");
        let second = scratch.string(&engine, "world").unwrap();
        assert_eq!(engine.read_cstring(second), "world");
        assert!(engine.freed_addresses().contains(&first));
    }

    #[test]
    fn test_take_string_frees() {
        let engine = engine();
        let addr = alloc_string(&engine, "transient").unwrap();
        assert_eq!(take_string(&engine, addr), "transient");
        assert!(engine.freed_addresses().contains(&addr));
    }

    #[test]
    fn test_quad_roundtrip() {
        let engine = engine();
        let addr = engine.malloc(32).unwrap();
        for (i, v) in [0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0].iter().enumerate() {
            engine.write_f32(addr + i as u32 * 4, *v);
        }
        let q = read_quad(&engine, addr);
        assert_eq!(q.ul, Point::new(0.0, 1.0));
        assert_eq!(q.lr, Point::new(6.0, 7.0));
    }
}
