//! The document object graph: documents, pages, annotations, links and
//! outlines.
//!
//! A document is opened from bytes, a buffer or a progressive remote
//! stream, then tagged generic or structured by probing the engine once at
//! load time. Structured documents additionally support editing: creating
//! and deleting annotations, form widgets, redaction.

pub mod annotation;
pub mod link;
pub mod outline;
pub mod page;

pub use annotation::{Annotation, AnnotationType, Widget, WidgetFieldType};
pub use link::Link;
pub use outline::OutlineItem;
pub use page::{Page, RedactImageMethod};

use crate::core::engine::{HandleKind, NativeEngine};
use crate::core::error::VellumResult;
use crate::core::handle::OwnedHandle;
use crate::core::marshal::{alloc_string, read_string};
use crate::resources::buffer::Buffer;
use crate::resources::stream::RemoteStream;

/// Where a document's bytes come from.
pub enum DocumentSource<'a> {
    Bytes(&'a [u8]),
    Buffer(&'a Buffer),
    Stream(&'a RemoteStream),
}

impl<'a> From<&'a [u8]> for DocumentSource<'a> {
    fn from(bytes: &'a [u8]) -> DocumentSource<'a> {
        DocumentSource::Bytes(bytes)
    }
}

impl<'a> From<&'a Buffer> for DocumentSource<'a> {
    fn from(buffer: &'a Buffer) -> DocumentSource<'a> {
        DocumentSource::Buffer(buffer)
    }
}

impl<'a> From<&'a RemoteStream> for DocumentSource<'a> {
    fn from(stream: &'a RemoteStream) -> DocumentSource<'a> {
        DocumentSource::Stream(stream)
    }
}

/// Whether the document exposes the structured (editable) object format.
/// Resolved once when the document is opened, by probing the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Generic,
    Structured,
}

/// Document access permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Print,
    Copy,
    Edit,
    Annotate,
}

impl Permission {
    fn as_native(self) -> i32 {
        match self {
            Permission::Print => 'p' as i32,
            Permission::Copy => 'c' as i32,
            Permission::Edit => 'e' as i32,
            Permission::Annotate => 'n' as i32,
        }
    }
}

/// An open document.
#[derive(Debug)]
pub struct Document {
    handle: OwnedHandle,
    kind: DocumentKind,
}

impl Document {
    pub const META_FORMAT: &'static str = "format";
    pub const META_ENCRYPTION: &'static str = "encryption";
    pub const META_INFO_AUTHOR: &'static str = "info:Author";
    pub const META_INFO_TITLE: &'static str = "info:Title";
    pub const META_INFO_SUBJECT: &'static str = "info:Subject";
    pub const META_INFO_KEYWORDS: &'static str = "info:Keywords";
    pub const META_INFO_CREATOR: &'static str = "info:Creator";
    pub const META_INFO_PRODUCER: &'static str = "info:Producer";
    pub const META_INFO_CREATION_DATE: &'static str = "info:CreationDate";
    pub const META_INFO_MODIFICATION_DATE: &'static str = "info:ModDate";

    pub(crate) fn from_parts(handle: OwnedHandle, kind: DocumentKind) -> Document {
        Document { handle, kind }
    }

    fn engine(&self) -> &dyn NativeEngine {
        self.handle.ctx().engine()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn is_structured(&self) -> bool {
        self.kind == DocumentKind::Structured
    }

    /// Releases the document now instead of at drop. Pages loaded from it
    /// stay valid; they hold their own references.
    pub fn close(&self) {
        self.handle.close()
    }

    pub fn needs_password(&self) -> VellumResult<bool> {
        Ok(self.engine().needs_password(self.handle.get()?)?)
    }

    /// Attempts to unlock an encrypted document. Returns true on success.
    pub fn authenticate_password(&self, password: &str) -> VellumResult<bool> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let password_ptr = ctx.scratch.string(engine, password)?;
        Ok(engine.authenticate_password(self.handle.get()?, password_ptr)? != 0)
    }

    pub fn has_permission(&self, permission: Permission) -> VellumResult<bool> {
        Ok(self
            .engine()
            .has_permission(self.handle.get()?, permission.as_native())?)
    }

    /// Looks up a metadata entry; `None` when the document has none for
    /// the key.
    pub fn metadata(&self, key: &str) -> VellumResult<Option<String>> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let key_ptr = ctx.scratch.string(engine, key)?;
        let value = engine.lookup_metadata(self.handle.get()?, key_ptr)?;
        if value == 0 {
            return Ok(None);
        }
        Ok(Some(read_string(engine, value)))
    }

    /// Writes a metadata entry. Needs two strings live at once, so both
    /// are allocated outside the rotating scratch slot and freed here.
    pub fn set_metadata(&self, key: &str, value: &str) -> VellumResult<()> {
        let engine = self.engine();
        let key_ptr = alloc_string(engine, key)?;
        let value_ptr = match alloc_string(engine, value) {
            Ok(addr) => addr,
            Err(err) => {
                engine.free(key_ptr);
                return Err(err);
            }
        };
        let result = self
            .engine()
            .set_metadata(self.handle.get()?, key_ptr, value_ptr);
        engine.free(value_ptr);
        engine.free(key_ptr);
        Ok(result?)
    }

    pub fn page_count(&self) -> VellumResult<u32> {
        Ok(self.engine().count_pages(self.handle.get()?)?.max(0) as u32)
    }

    /// Loads a page by zero-based index. The page is tagged structured or
    /// generic by probing the returned handle, never by the document's own
    /// tag.
    pub fn load_page(&self, index: u32) -> VellumResult<Page> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let raw = engine.load_page(self.handle.get()?, index as i32)?;
        Page::from_raw(ctx.clone(), raw)
    }

    /// The document outline (bookmark tree), or `None` when there is
    /// none.
    pub fn outline(&self) -> VellumResult<Option<Vec<OutlineItem>>> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let root = engine.load_outline(self.handle.get()?)?;
        if root == 0 {
            return Ok(None);
        }
        // Wrap the root so the whole chain is released after traversal;
        // child and sibling nodes are borrowed from it while we walk.
        let root = OwnedHandle::new(ctx.clone(), HandleKind::Outline, root)?;
        let items = self.collect_outline(root.get()?)?;
        Ok(Some(items))
    }

    fn collect_outline(&self, first: u32) -> VellumResult<Vec<OutlineItem>> {
        let engine = self.engine();
        let document = self.handle.get()?;
        let mut items = Vec::new();
        let mut node = first;
        while node != 0 {
            let title_ptr = engine.outline_title(node)?;
            let title = if title_ptr != 0 {
                Some(read_string(engine, title_ptr))
            } else {
                None
            };
            let uri_ptr = engine.outline_uri(node)?;
            let uri = if uri_ptr != 0 {
                Some(read_string(engine, uri_ptr))
            } else {
                None
            };
            let page = engine.outline_page(document, node)?;
            let page = if page >= 0 { Some(page as u32) } else { None };
            let down = engine.outline_down(node)?;
            let children = if down != 0 {
                self.collect_outline(down)?
            } else {
                Vec::new()
            };
            items.push(OutlineItem {
                title,
                uri,
                page,
                children,
            });
            node = engine.outline_next(node)?;
        }
        Ok(items)
    }

    /// Resolves a link URI to a page index, when it points inside the
    /// document.
    pub fn resolve_link(&self, uri: &str) -> VellumResult<Option<u32>> {
        let ctx = self.handle.ctx();
        let engine = ctx.engine();
        let uri_ptr = ctx.scratch.string(engine, uri)?;
        let page = engine.resolve_link(self.handle.get()?, uri_ptr)?;
        Ok(if page >= 0 { Some(page as u32) } else { None })
    }
}
