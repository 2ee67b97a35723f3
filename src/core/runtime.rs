//! Module lifecycle and the shared binding context.
//!
//! [`Runtime::initialize`] performs the one-time startup sequence: boot the
//! engine (idempotent on the engine side, so redundant initialization is a
//! safe no-op), allocate the marshaling scratch region, adopt the device
//! colorspace singletons and record the negotiated capabilities. Every
//! resource constructor hangs off the runtime afterwards.

use crate::core::engine::{Capabilities, HandleKind, NativeEngine, StreamId};
use crate::core::error::{VellumError, VellumResult};
use crate::core::fetch::{BlockFetcher, RangeTransport};
use crate::core::geometry::{Matrix, Rect};
use crate::core::handle::OwnedHandle;
use crate::core::marshal::Scratch;
use crate::document::{Document, DocumentKind, DocumentSource};
use crate::resources::buffer::Buffer;
use crate::resources::colorspace::ColorSpace;
use crate::resources::cookie::Cookie;
use crate::resources::device::{Device, StrokeState};
use crate::resources::display_list::DisplayList;
use crate::resources::font::Font;
use crate::resources::image::Image;
use crate::resources::path::Path;
use crate::resources::pixmap::Pixmap;
use crate::resources::stream::RemoteStream;
use crate::resources::text::Text;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Shared state behind every wrapper: the engine, the scratch region and
/// the negotiated capabilities.
pub struct Context {
    engine: Arc<dyn NativeEngine>,
    pub(crate) scratch: Scratch,
    pub(crate) capabilities: Capabilities,
}

impl Context {
    pub(crate) fn new(engine: Arc<dyn NativeEngine>) -> VellumResult<Arc<Context>> {
        let scratch = Scratch::allocate(engine.as_ref())?;
        let capabilities = engine.capabilities();
        Ok(Arc::new(Context {
            engine,
            scratch,
            capabilities,
        }))
    }

    pub(crate) fn engine(&self) -> &dyn NativeEngine {
        self.engine.as_ref()
    }

    pub(crate) fn engine_arc(&self) -> Arc<dyn NativeEngine> {
        self.engine.clone()
    }
}

/// An initialized binding to one engine instance.
pub struct Runtime {
    ctx: Arc<Context>,
    device_gray: ColorSpace,
    device_rgb: ColorSpace,
    device_bgr: ColorSpace,
    device_cmyk: ColorSpace,
    device_lab: ColorSpace,
    fetcher: Mutex<Option<Arc<BlockFetcher>>>,
}

impl Runtime {
    /// Boots the engine and builds the binding context. The engine's
    /// startup entry point is idempotent, so initializing twice against the
    /// same engine is safe.
    pub fn initialize<E: NativeEngine + 'static>(engine: E) -> VellumResult<Runtime> {
        Runtime::initialize_shared(Arc::new(engine))
    }

    /// Like [`Runtime::initialize`] but for an engine that is already
    /// shared.
    pub fn initialize_shared(engine: Arc<dyn NativeEngine>) -> VellumResult<Runtime> {
        engine.boot()?;
        let ctx = Context::new(engine)?;
        let engine = ctx.engine();

        let device_gray = ColorSpace::adopt(ctx.clone(), engine.device_gray()?)?;
        let device_rgb = ColorSpace::adopt(ctx.clone(), engine.device_rgb()?)?;
        let device_bgr = ColorSpace::adopt(ctx.clone(), engine.device_bgr()?)?;
        let device_cmyk = ColorSpace::adopt(ctx.clone(), engine.device_cmyk()?)?;
        let device_lab = ColorSpace::adopt(ctx.clone(), engine.device_lab()?)?;

        debug!(
            shared_memory = ctx.capabilities.shared_memory,
            "engine initialized"
        );

        Ok(Runtime {
            ctx,
            device_gray,
            device_rgb,
            device_bgr,
            device_cmyk,
            device_lab,
            fetcher: Mutex::new(None),
        })
    }

    /// Capabilities negotiated at startup.
    pub fn capabilities(&self) -> Capabilities {
        self.ctx.capabilities
    }

    // --- colorspace singletons ---

    pub fn device_gray(&self) -> &ColorSpace {
        &self.device_gray
    }

    pub fn device_rgb(&self) -> &ColorSpace {
        &self.device_rgb
    }

    pub fn device_bgr(&self) -> &ColorSpace {
        &self.device_bgr
    }

    pub fn device_cmyk(&self) -> &ColorSpace {
        &self.device_cmyk
    }

    pub fn device_lab(&self) -> &ColorSpace {
        &self.device_lab
    }

    // --- resource constructors ---

    /// An empty growable byte buffer.
    pub fn new_buffer(&self) -> VellumResult<Buffer> {
        self.buffer_with_capacity(1024)
    }

    pub fn buffer_with_capacity(&self, capacity: usize) -> VellumResult<Buffer> {
        let raw = self.ctx.engine().new_buffer(capacity)?;
        Buffer::own(self.ctx.clone(), raw)
    }

    /// Copies `bytes` into engine memory and wraps them in a buffer. The
    /// intermediate allocation is owned by the buffer on success and freed
    /// here on failure.
    pub fn buffer_from_bytes(&self, bytes: &[u8]) -> VellumResult<Buffer> {
        let engine = self.ctx.engine();
        let data = engine.malloc(bytes.len())?;
        engine.write_bytes(data, bytes);
        match engine.new_buffer_from_data(data, bytes.len()) {
            Ok(raw) => Buffer::own(self.ctx.clone(), raw),
            Err(err) => {
                engine.free(data);
                Err(err.into())
            }
        }
    }

    pub fn buffer_from_str(&self, text: &str) -> VellumResult<Buffer> {
        self.buffer_from_bytes(text.as_bytes())
    }

    /// One of the fourteen built-in fonts, by name.
    pub fn base14_font(&self, name: &str) -> VellumResult<Font> {
        let engine = self.ctx.engine();
        let name_ptr = self.ctx.scratch.string(engine, name)?;
        let raw = engine.new_base14_font(name_ptr)?;
        Font::own(self.ctx.clone(), raw)
    }

    pub fn font_from_buffer(&self, buffer: &Buffer, index: i32) -> VellumResult<Font> {
        let engine = self.ctx.engine();
        let raw = engine.new_font_from_buffer(buffer.handle().get()?, index)?;
        Font::own(self.ctx.clone(), raw)
    }

    pub fn image_from_pixmap(&self, pixmap: &Pixmap) -> VellumResult<Image> {
        let raw = self.ctx.engine().new_image_from_pixmap(pixmap.handle().get()?)?;
        Image::own(self.ctx.clone(), raw)
    }

    pub fn image_from_buffer(&self, buffer: &Buffer) -> VellumResult<Image> {
        let raw = self.ctx.engine().new_image_from_buffer(buffer.handle().get()?)?;
        Image::own(self.ctx.clone(), raw)
    }

    pub fn new_path(&self) -> VellumResult<Path> {
        let raw = self.ctx.engine().new_path()?;
        Path::own(self.ctx.clone(), raw)
    }

    pub fn new_text(&self) -> VellumResult<Text> {
        let raw = self.ctx.engine().new_text()?;
        Text::own(self.ctx.clone(), raw)
    }

    pub fn new_pixmap(
        &self,
        colorspace: &ColorSpace,
        bbox: &Rect,
        alpha: bool,
    ) -> VellumResult<Pixmap> {
        let engine = self.ctx.engine();
        let bbox_ptr = self.ctx.scratch.rect(engine, bbox);
        let raw = engine.new_pixmap_with_bbox(colorspace.handle().get()?, bbox_ptr, alpha)?;
        Pixmap::own(self.ctx.clone(), raw)
    }

    pub fn new_display_list(&self, mediabox: &Rect) -> VellumResult<DisplayList> {
        let engine = self.ctx.engine();
        let mediabox_ptr = self.ctx.scratch.rect(engine, mediabox);
        let raw = engine.new_display_list(mediabox_ptr)?;
        DisplayList::own(self.ctx.clone(), raw)
    }

    /// A device rasterizing into `pixmap` under the given transform.
    pub fn draw_device(&self, ctm: &Matrix, pixmap: &Pixmap) -> VellumResult<Device> {
        let engine = self.ctx.engine();
        let ctm_ptr = self.ctx.scratch.matrix(engine, ctm);
        let raw = engine.new_draw_device(ctm_ptr, pixmap.handle().get()?)?;
        Device::own(self.ctx.clone(), raw)
    }

    /// A device recording into `list`.
    pub fn display_list_device(&self, list: &DisplayList) -> VellumResult<Device> {
        let raw = self.ctx.engine().new_display_list_device(list.handle().get()?)?;
        Device::own(self.ctx.clone(), raw)
    }

    pub fn new_stroke_state(&self) -> VellumResult<StrokeState> {
        let raw = self.ctx.engine().new_stroke_state()?;
        StrokeState::own(self.ctx.clone(), raw)
    }

    /// A cancellation/progress token polled by long-running renders.
    pub fn new_cookie(&self) -> VellumResult<Cookie> {
        let raw = self.ctx.engine().new_cookie()?;
        Cookie::own(self.ctx.clone(), raw)
    }

    // --- documents ---

    /// Opens a document from in-memory bytes, an existing buffer, or a
    /// progressive remote stream. `magic` hints the format (a file
    /// extension or MIME type). The returned document is tagged generic or
    /// structured by probing the engine, never by the caller's intent.
    pub fn open_document<'a>(
        &self,
        source: impl Into<DocumentSource<'a>>,
        magic: &str,
    ) -> VellumResult<Document> {
        let engine = self.ctx.engine();
        let owned_buffer;
        let raw = match source.into() {
            DocumentSource::Bytes(bytes) => {
                owned_buffer = self.buffer_from_bytes(bytes)?;
                let magic_ptr = self.ctx.scratch.string(engine, magic)?;
                engine.open_document_with_buffer(magic_ptr, owned_buffer.handle().get()?)?
            }
            DocumentSource::Buffer(buffer) => {
                let magic_ptr = self.ctx.scratch.string(engine, magic)?;
                engine.open_document_with_buffer(magic_ptr, buffer.handle().get()?)?
            }
            DocumentSource::Stream(stream) => {
                let magic_ptr = self.ctx.scratch.string(engine, magic)?;
                engine.open_document_with_stream(magic_ptr, stream.handle().get()?)?
            }
        };
        // Wrap before probing so the handle is released if the probe fails.
        let handle = OwnedHandle::new(self.ctx.clone(), HandleKind::Document, raw)?;
        let kind = if engine.structured_document_handle(handle.get()?)? != 0 {
            DocumentKind::Structured
        } else {
            DocumentKind::Generic
        };
        Ok(Document::from_parts(handle, kind))
    }

    /// Creates an empty structured document.
    pub fn create_document(&self) -> VellumResult<Document> {
        let raw = self.ctx.engine().new_structured_document()?;
        let handle = OwnedHandle::new(self.ctx.clone(), HandleKind::Document, raw)?;
        Ok(Document::from_parts(handle, DocumentKind::Structured))
    }

    // --- progressive streams ---

    /// Opens a virtual stream over a remote resource. Bytes are fetched in
    /// blocks on demand; `block_size` must be a power of two between 2^10
    /// and 2^24. A fetcher must be attached first or the engine's block
    /// requests will go unanswered.
    pub fn open_remote_stream(
        &self,
        url: &str,
        content_length: u64,
        block_size: u32,
        prefetch: bool,
    ) -> VellumResult<RemoteStream> {
        if !block_size.is_power_of_two() {
            return Err(VellumError::InvalidBlockSize(block_size));
        }
        let shift = block_size.trailing_zeros();
        if !(10..=24).contains(&shift) {
            return Err(VellumError::InvalidBlockSize(block_size));
        }

        let engine = self.ctx.engine();
        let url_ptr = self.ctx.scratch.string(engine, url)?;
        let raw = engine.open_stream_from_url(url_ptr, content_length, block_size, prefetch)?;
        debug!(url, content_length, block_size, prefetch, "opened remote stream");
        RemoteStream::own(self.ctx.clone(), raw)
    }

    /// Builds a block fetcher over `transport` and installs it as the
    /// engine's fetch hooks. Must run inside an async runtime.
    pub fn attach_fetcher(
        &self,
        transport: Box<dyn RangeTransport>,
    ) -> VellumResult<Arc<BlockFetcher>> {
        let fetcher = BlockFetcher::new(self.ctx.engine_arc(), transport)?;
        self.ctx.engine().install_fetch_hooks(fetcher.clone());
        *self.fetcher.lock().unwrap() = Some(fetcher.clone());
        Ok(fetcher)
    }

    /// Attaches a fetcher backed by the HTTP range-request transport.
    #[cfg(feature = "http")]
    pub fn attach_http_fetcher(&self) -> VellumResult<Arc<BlockFetcher>> {
        self.attach_fetcher(Box::new(crate::core::fetch::HttpTransport::new()?))
    }

    /// The currently attached fetcher, if any.
    pub fn fetcher(&self) -> Option<Arc<BlockFetcher>> {
        self.fetcher.lock().unwrap().clone()
    }

    /// The fetch id of a remote stream, for progress queries.
    pub fn stream_fetch_id(&self, stream: &RemoteStream) -> VellumResult<StreamId> {
        Ok(self.ctx.engine().stream_fetch_id(stream.handle().get()?)?)
    }
}
