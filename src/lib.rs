//! # Vellum: host bindings for a sandboxed document-rendering engine
//!
//! Vellum exposes a native document-rendering engine, compiled to a
//! portable low-level module with linear memory and a numeric-handle
//! calling convention, as a safe Rust API. The engine owns all parsing,
//! layout and rasterization; this crate owns everything that crosses the
//! boundary:
//!
//! - **Resource ownership**: every engine object is manually reference
//!   counted. Wrappers release their handle exactly once, explicitly or at
//!   drop, and fail deterministically when used after release.
//! - **Marshaling**: points, rectangles, matrices, quads, colors and UTF-8
//!   strings travel through a fixed scratch region in engine linear
//!   memory, written immediately before each native call.
//! - **The document graph**: documents, pages, annotations, widgets, links
//!   and outlines, with generic vs. structured (editable) variants
//!   resolved by probing the engine at load time.
//! - **Progressive loading**: remote documents are streamed block by block
//!   over HTTP range requests, on demand and out of order, with
//!   deduplication and sequential prefetch.
//!
//! ## Opening a document
//!
//! ```no_run
//! use vellum::{Runtime, TestEngine, Matrix};
//!
//! # fn main() -> vellum::VellumResult<()> {
//! let runtime = Runtime::initialize(TestEngine::new())?;
//! let data = std::fs::read("document.pdf").unwrap();
//! let document = runtime.open_document(data.as_slice(), "application/pdf")?;
//!
//! let page = document.load_page(0)?;
//! let pixmap = page.to_pixmap(&Matrix::scale(2.0, 2.0), runtime.device_rgb(), false, true)?;
//! let png = pixmap.to_png()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Progressive remote documents
//!
//! ```no_run
//! use vellum::{Runtime, TestEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> vellum::VellumResult<()> {
//! let runtime = Runtime::initialize(TestEngine::new())?;
//! runtime.attach_http_fetcher()?;
//!
//! // 64 KiB blocks, sequential prefetch enabled.
//! let stream = runtime.open_remote_stream("https://example.com/big.pdf", 10_000_000, 65536, true)?;
//! let document = runtime.open_document(&stream, "application/pdf")?;
//! # Ok(())
//! # }
//! ```
//!
//! Operations that touch bytes that have not arrived yet fail with
//! [`VellumError::NotReady`]; retry them once more blocks are in. All
//! other errors are final for that call.

pub mod core;
pub mod document;
pub mod resources;

pub use crate::core::engine::{
    Address, Capabilities, FetchHooks, HandleKind, NativeEngine, NativeError, NativeResult,
    RawHandle, StreamId,
};
pub use crate::core::error::{VellumError, VellumResult};
pub use crate::core::fetch::{
    BlockFetcher, BlockState, BoxFuture, RangeBody, RangeTransport, TransportError, TransportResult,
};
pub use crate::core::geometry::{Matrix, Point, Quad, Rect};
pub use crate::core::handle::OwnedHandle;
pub use crate::core::runtime::Runtime;
pub use crate::core::test_engine::{TestEngine, TestOutline};
pub use crate::document::{
    Annotation, AnnotationType, Document, DocumentKind, DocumentSource, Link, OutlineItem, Page,
    Permission, RedactImageMethod, Widget, WidgetFieldType,
};
pub use crate::resources::{
    BlendMode, Buffer, ColorSpace, ColorSpaceType, Cookie, Device, DisplayList, Font, Image,
    LineCap, LineJoin, Path, Pixmap, RemoteStream, StrokeState, StructuredText, Text,
};

#[cfg(feature = "http")]
pub use crate::core::fetch::HttpTransport;
