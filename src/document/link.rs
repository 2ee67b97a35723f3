//! Hyperlinks on a page.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::geometry::Rect;
use crate::core::handle::OwnedHandle;
use crate::core::marshal::{read_rect, read_string};
use crate::core::runtime::Context;
use std::sync::Arc;

/// A link region on a page, pointing either inside the document or at an
/// external URI.
pub struct Link {
    handle: OwnedHandle,
}

impl Link {
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Link> {
        Ok(Link {
            handle: OwnedHandle::new(ctx, HandleKind::Link, raw)?,
        })
    }

    pub(crate) fn adopt(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Link> {
        Ok(Link {
            handle: OwnedHandle::adopt(ctx, HandleKind::Link, raw)?,
        })
    }

    fn engine(&self) -> &dyn NativeEngine {
        self.handle.ctx().engine()
    }

    pub fn close(&self) {
        self.handle.close()
    }

    pub fn bounds(&self) -> VellumResult<Rect> {
        let engine = self.engine();
        let addr = engine.link_rect(self.handle.get()?)?;
        Ok(read_rect(engine, addr))
    }

    pub fn uri(&self) -> VellumResult<String> {
        let engine = self.engine();
        let addr = engine.link_uri(self.handle.get()?)?;
        Ok(read_string(engine, addr))
    }

    /// True when the target is an absolute URI (has a scheme) rather than
    /// a location inside the document.
    pub fn is_external(&self) -> VellumResult<bool> {
        Ok(has_scheme(&self.uri()?))
    }
}

/// RFC 3986 scheme check: an ASCII letter followed by letters, digits,
/// `+`, `-` or `.`, terminated by a colon.
fn has_scheme(uri: &str) -> bool {
    let mut bytes = uri.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for byte in bytes {
        match byte {
            b':' => return true,
            b if b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.' => {}
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_detection() {
        assert!(has_scheme("https://example.com/doc.pdf"));
        assert!(has_scheme("mailto:someone@example.com"));
        assert!(has_scheme("x-custom+v1.0:payload"));
        assert!(!has_scheme("#page=3"));
        assert!(!has_scheme("chapter2"));
        assert!(!has_scheme("3ttp://bad-scheme"));
        assert!(!has_scheme(""));
    }
}
