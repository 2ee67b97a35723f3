//! The native engine boundary.
//!
//! The rendering engine is an external collaborator compiled to a portable
//! low-level module: it owns all parsing, layout and rasterization, and is
//! reachable only through a numeric-handle calling convention. Every entry
//! point takes and returns plain integers: opaque reference-counted handles
//! and raw addresses into the module's linear memory. Composite arguments
//! (rectangles, matrices, colors, strings) are passed as addresses written by
//! the marshaling codec.
//!
//! [`NativeEngine`] captures that contract as an object-safe trait. Feature
//! entry points default to an `Unsupported` error so partial engines (and
//! the scripted [`TestEngine`](crate::core::test_engine::TestEngine)) only
//! implement what they serve.

use std::sync::Arc;

/// An opaque non-zero reference to an engine-owned, reference-counted
/// object. Zero is never a valid handle; it signals "absent" at the
/// boundary (no colorspace, no next sibling, not a structured document).
pub type RawHandle = u32;

/// A byte address into the engine's linear memory.
pub type Address = u32;

/// Identifier of an open progressive stream, assigned by the engine.
pub type StreamId = u32;

/// The resource kinds with engine-side keep/drop pairs.
///
/// The release entry point is bound once per kind; every wrapper of that
/// kind shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Buffer,
    ColorSpace,
    Font,
    Image,
    Path,
    Text,
    Pixmap,
    DisplayList,
    StructuredText,
    Device,
    StrokeState,
    Document,
    Page,
    Link,
    Outline,
    Annotation,
    Stream,
    Cookie,
}

impl HandleKind {
    pub fn name(self) -> &'static str {
        match self {
            HandleKind::Buffer => "buffer",
            HandleKind::ColorSpace => "colorspace",
            HandleKind::Font => "font",
            HandleKind::Image => "image",
            HandleKind::Path => "path",
            HandleKind::Text => "text",
            HandleKind::Pixmap => "pixmap",
            HandleKind::DisplayList => "display list",
            HandleKind::StructuredText => "structured text",
            HandleKind::Device => "device",
            HandleKind::StrokeState => "stroke state",
            HandleKind::Document => "document",
            HandleKind::Page => "page",
            HandleKind::Link => "link",
            HandleKind::Outline => "outline",
            HandleKind::Annotation => "annotation",
            HandleKind::Stream => "stream",
            HandleKind::Cookie => "cookie",
        }
    }
}

/// Failure reported by a native entry point.
#[derive(Debug, Clone)]
pub enum NativeError {
    /// The operation depends on bytes that have not been fetched yet.
    /// Retryable; progressive documents surface this while blocks are in
    /// flight.
    TryLater,

    /// Hard failure (malformed document, allocation failure, ...).
    Failed(String),

    /// The engine build does not expose this entry point.
    Unsupported(&'static str),
}

/// Result type for native entry points
pub type NativeResult<T> = Result<T, NativeError>;

/// Capabilities negotiated once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the module was built against shared linear memory and can
    /// run engine-internal threads.
    pub shared_memory: bool,
}

/// Host callbacks driving the progressive fetch protocol.
///
/// The engine calls `open` when a remote stream is created, `read` whenever
/// a consumer touches a block that is not resident, and `close` when the
/// stream handle is finally dropped. The host answers with
/// [`NativeEngine::deliver_block`] once the bytes arrive.
pub trait FetchHooks: Send + Sync {
    fn open(&self, id: StreamId, url: &str, content_length: u64, block_shift: u32, prefetch: bool);
    fn read(&self, id: StreamId, block: u32);
    fn close(&self, id: StreamId);
}

/// The full engine calling convention.
///
/// Required methods cover lifecycle, linear memory, reference counting and
/// the fetch protocol; per-feature entry points default to
/// [`NativeError::Unsupported`].
#[allow(unused_variables)]
pub trait NativeEngine: Send + Sync {
    // --- lifecycle ---

    /// One-time startup. Must run before any other entry point. Idempotent:
    /// redundant calls are safe no-ops.
    fn boot(&self) -> NativeResult<()>;

    /// Capability flags, valid after `boot`.
    fn capabilities(&self) -> Capabilities;

    // --- linear memory ---

    fn malloc(&self, size: usize) -> NativeResult<Address>;
    fn free(&self, addr: Address);
    fn read_bytes(&self, addr: Address, len: usize) -> Vec<u8>;
    fn write_bytes(&self, addr: Address, bytes: &[u8]);
    fn read_f32(&self, addr: Address) -> f32;
    fn write_f32(&self, addr: Address, value: f32);
    fn read_i32(&self, addr: Address) -> i32;
    /// Reads a NUL-terminated UTF-8 string.
    fn read_cstring(&self, addr: Address) -> String;

    // --- reference counting ---

    /// Increments the refcount of `handle` and returns it. Wrapping a handle
    /// the binding did not originate must go through keep first.
    fn keep(&self, kind: HandleKind, handle: RawHandle) -> NativeResult<RawHandle>;

    /// Decrements the refcount of `handle`, freeing it at zero.
    fn drop_handle(&self, kind: HandleKind, handle: RawHandle);

    // --- fetch protocol ---

    /// Installs the host side of the fetch callback protocol.
    fn install_fetch_hooks(&self, hooks: Arc<dyn FetchHooks>);

    /// Delivers fetched bytes for one block of a progressive stream. The
    /// engine copies from `data` into the location it associates with the
    /// block and marks it resident.
    fn deliver_block(
        &self,
        id: StreamId,
        block: u32,
        data: Address,
        len: usize,
    ) -> NativeResult<()>;

    // --- buffers ---

    fn new_buffer(&self, capacity: usize) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_buffer"))
    }
    /// Takes ownership of the `data` allocation.
    fn new_buffer_from_data(&self, data: Address, len: usize) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_buffer_from_data"))
    }
    fn buffer_data(&self, buffer: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("buffer_data"))
    }
    fn buffer_size(&self, buffer: RawHandle) -> NativeResult<usize> {
        Err(NativeError::Unsupported("buffer_size"))
    }
    fn append_string(&self, buffer: RawHandle, text: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("append_string"))
    }
    fn append_byte(&self, buffer: RawHandle, byte: u32) -> NativeResult<()> {
        Err(NativeError::Unsupported("append_byte"))
    }
    fn append_buffer(&self, buffer: RawHandle, other: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("append_buffer"))
    }

    // --- colorspaces ---

    fn device_gray(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("device_gray"))
    }
    fn device_rgb(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("device_rgb"))
    }
    fn device_bgr(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("device_bgr"))
    }
    fn device_cmyk(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("device_cmyk"))
    }
    fn device_lab(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("device_lab"))
    }
    /// Static string; the result must not be freed.
    fn colorspace_name(&self, colorspace: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("colorspace_name"))
    }
    fn colorspace_type(&self, colorspace: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("colorspace_type"))
    }
    fn colorspace_components(&self, colorspace: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("colorspace_components"))
    }

    // --- fonts ---

    fn new_base14_font(&self, name: Address) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_base14_font"))
    }
    fn new_font_from_buffer(&self, buffer: RawHandle, index: i32) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_font_from_buffer"))
    }
    /// Static string; the result must not be freed.
    fn font_name(&self, font: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("font_name"))
    }
    fn encode_character(&self, font: RawHandle, unicode: u32) -> NativeResult<i32> {
        Err(NativeError::Unsupported("encode_character"))
    }
    fn advance_glyph(&self, font: RawHandle, glyph: i32, wmode: i32) -> NativeResult<f32> {
        Err(NativeError::Unsupported("advance_glyph"))
    }

    // --- images ---

    fn new_image_from_pixmap(&self, pixmap: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_image_from_pixmap"))
    }
    fn new_image_from_buffer(&self, buffer: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_image_from_buffer"))
    }
    fn image_width(&self, image: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("image_width"))
    }
    fn image_height(&self, image: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("image_height"))
    }
    fn image_components(&self, image: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("image_components"))
    }
    fn image_bits_per_component(&self, image: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("image_bits_per_component"))
    }
    fn image_xres(&self, image: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("image_xres"))
    }
    fn image_yres(&self, image: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("image_yres"))
    }
    fn image_is_mask(&self, image: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("image_is_mask"))
    }
    /// Borrowed; zero when the image has no colorspace.
    fn image_colorspace(&self, image: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("image_colorspace"))
    }
    /// Borrowed; zero when the image has no mask.
    fn image_mask(&self, image: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("image_mask"))
    }
    fn image_to_pixmap(&self, image: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("image_to_pixmap"))
    }

    // --- paths ---

    fn new_path(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_path"))
    }
    fn path_move_to(&self, path: RawHandle, x: f32, y: f32) -> NativeResult<()> {
        Err(NativeError::Unsupported("path_move_to"))
    }
    fn path_line_to(&self, path: RawHandle, x: f32, y: f32) -> NativeResult<()> {
        Err(NativeError::Unsupported("path_line_to"))
    }
    #[allow(clippy::too_many_arguments)]
    fn path_curve_to(
        &self,
        path: RawHandle,
        c1x: f32,
        c1y: f32,
        c2x: f32,
        c2y: f32,
        ex: f32,
        ey: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("path_curve_to"))
    }
    fn path_curve_to_v(
        &self,
        path: RawHandle,
        cx: f32,
        cy: f32,
        ex: f32,
        ey: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("path_curve_to_v"))
    }
    fn path_curve_to_y(
        &self,
        path: RawHandle,
        cx: f32,
        cy: f32,
        ex: f32,
        ey: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("path_curve_to_y"))
    }
    fn path_rect(&self, path: RawHandle, x0: f32, y0: f32, x1: f32, y1: f32) -> NativeResult<()> {
        Err(NativeError::Unsupported("path_rect"))
    }
    fn path_close(&self, path: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("path_close"))
    }
    fn transform_path(&self, path: RawHandle, matrix: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("transform_path"))
    }
    /// Writes into an engine-owned temporary; read before the next call.
    fn bound_path(&self, path: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("bound_path"))
    }

    // --- text ---

    fn new_text(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_text"))
    }
    fn bound_text(&self, text: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("bound_text"))
    }
    #[allow(clippy::too_many_arguments)]
    fn show_glyph(
        &self,
        text: RawHandle,
        font: RawHandle,
        trm: Address,
        glyph: i32,
        unicode: u32,
        wmode: i32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("show_glyph"))
    }
    /// Returns the address of the advanced text matrix.
    fn show_string(
        &self,
        text: RawHandle,
        font: RawHandle,
        trm: Address,
        string: Address,
        wmode: i32,
    ) -> NativeResult<Address> {
        Err(NativeError::Unsupported("show_string"))
    }

    // --- pixmaps ---

    fn new_pixmap_with_bbox(
        &self,
        colorspace: RawHandle,
        bbox: Address,
        alpha: bool,
    ) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_pixmap_with_bbox"))
    }
    fn pixmap_x(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("pixmap_x"))
    }
    fn pixmap_y(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("pixmap_y"))
    }
    fn pixmap_width(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("pixmap_width"))
    }
    fn pixmap_height(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("pixmap_height"))
    }
    fn pixmap_stride(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("pixmap_stride"))
    }
    fn pixmap_components(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("pixmap_components"))
    }
    fn pixmap_xres(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("pixmap_xres"))
    }
    fn pixmap_yres(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("pixmap_yres"))
    }
    fn pixmap_set_xres(&self, pixmap: RawHandle, xres: i32) -> NativeResult<()> {
        Err(NativeError::Unsupported("pixmap_set_xres"))
    }
    fn pixmap_set_yres(&self, pixmap: RawHandle, yres: i32) -> NativeResult<()> {
        Err(NativeError::Unsupported("pixmap_set_yres"))
    }
    /// Borrowed; zero when the pixmap is alpha-only.
    fn pixmap_colorspace(&self, pixmap: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("pixmap_colorspace"))
    }
    fn pixmap_samples(&self, pixmap: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("pixmap_samples"))
    }
    fn clear_pixmap(&self, pixmap: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("clear_pixmap"))
    }
    fn clear_pixmap_with_value(&self, pixmap: RawHandle, value: i32) -> NativeResult<()> {
        Err(NativeError::Unsupported("clear_pixmap_with_value"))
    }
    /// Returns a new buffer handle owned by the caller.
    fn pixmap_as_png(&self, pixmap: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("pixmap_as_png"))
    }

    // --- display lists ---

    fn new_display_list(&self, mediabox: Address) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_display_list"))
    }
    fn bound_display_list(&self, list: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("bound_display_list"))
    }
    fn run_display_list(&self, list: RawHandle, device: RawHandle, ctm: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("run_display_list"))
    }
    fn pixmap_from_display_list(
        &self,
        list: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        alpha: bool,
    ) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("pixmap_from_display_list"))
    }
    fn stext_from_display_list(&self, list: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("stext_from_display_list"))
    }

    // --- structured text ---

    /// Returns a newly allocated string; the caller must free it.
    fn stext_as_json(&self, stext: RawHandle, scale: f32) -> NativeResult<Address> {
        Err(NativeError::Unsupported("stext_as_json"))
    }

    // --- devices ---

    fn new_draw_device(&self, ctm: Address, pixmap: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_draw_device"))
    }
    fn new_display_list_device(&self, list: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_display_list_device"))
    }
    fn close_device(&self, device: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("close_device"))
    }
    #[allow(clippy::too_many_arguments)]
    fn fill_path(
        &self,
        device: RawHandle,
        path: RawHandle,
        even_odd: bool,
        ctm: Address,
        colorspace: RawHandle,
        color: Address,
        alpha: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("fill_path"))
    }
    #[allow(clippy::too_many_arguments)]
    fn stroke_path(
        &self,
        device: RawHandle,
        path: RawHandle,
        stroke: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        color: Address,
        alpha: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("stroke_path"))
    }
    fn clip_path(
        &self,
        device: RawHandle,
        path: RawHandle,
        even_odd: bool,
        ctm: Address,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("clip_path"))
    }
    fn clip_stroke_path(
        &self,
        device: RawHandle,
        path: RawHandle,
        stroke: RawHandle,
        ctm: Address,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("clip_stroke_path"))
    }
    #[allow(clippy::too_many_arguments)]
    fn fill_text(
        &self,
        device: RawHandle,
        text: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        color: Address,
        alpha: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("fill_text"))
    }
    #[allow(clippy::too_many_arguments)]
    fn stroke_text(
        &self,
        device: RawHandle,
        text: RawHandle,
        stroke: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        color: Address,
        alpha: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("stroke_text"))
    }
    fn clip_text(&self, device: RawHandle, text: RawHandle, ctm: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("clip_text"))
    }
    fn clip_stroke_text(
        &self,
        device: RawHandle,
        text: RawHandle,
        stroke: RawHandle,
        ctm: Address,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("clip_stroke_text"))
    }
    fn ignore_text(&self, device: RawHandle, text: RawHandle, ctm: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("ignore_text"))
    }
    fn fill_image(
        &self,
        device: RawHandle,
        image: RawHandle,
        ctm: Address,
        alpha: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("fill_image"))
    }
    #[allow(clippy::too_many_arguments)]
    fn fill_image_mask(
        &self,
        device: RawHandle,
        image: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        color: Address,
        alpha: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("fill_image_mask"))
    }
    fn clip_image_mask(
        &self,
        device: RawHandle,
        image: RawHandle,
        ctm: Address,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("clip_image_mask"))
    }
    fn pop_clip(&self, device: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("pop_clip"))
    }
    fn begin_mask(
        &self,
        device: RawHandle,
        area: Address,
        luminosity: bool,
        colorspace: RawHandle,
        color: Address,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("begin_mask"))
    }
    fn end_mask(&self, device: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("end_mask"))
    }
    #[allow(clippy::too_many_arguments)]
    fn begin_group(
        &self,
        device: RawHandle,
        area: Address,
        colorspace: RawHandle,
        isolated: bool,
        knockout: bool,
        blend_mode: i32,
        alpha: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("begin_group"))
    }
    fn end_group(&self, device: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("end_group"))
    }
    #[allow(clippy::too_many_arguments)]
    fn begin_tile(
        &self,
        device: RawHandle,
        area: Address,
        view: Address,
        xstep: f32,
        ystep: f32,
        ctm: Address,
        id: i32,
    ) -> NativeResult<i32> {
        Err(NativeError::Unsupported("begin_tile"))
    }
    fn end_tile(&self, device: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("end_tile"))
    }
    fn begin_layer(&self, device: RawHandle, name: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("begin_layer"))
    }
    fn end_layer(&self, device: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("end_layer"))
    }

    // --- stroke state ---

    fn new_stroke_state(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_stroke_state"))
    }
    fn stroke_state_line_width(&self, stroke: RawHandle) -> NativeResult<f32> {
        Err(NativeError::Unsupported("stroke_state_line_width"))
    }
    fn stroke_state_set_line_width(&self, stroke: RawHandle, width: f32) -> NativeResult<()> {
        Err(NativeError::Unsupported("stroke_state_set_line_width"))
    }
    fn stroke_state_set_miter_limit(&self, stroke: RawHandle, limit: f32) -> NativeResult<()> {
        Err(NativeError::Unsupported("stroke_state_set_miter_limit"))
    }
    fn stroke_state_set_line_cap(&self, stroke: RawHandle, cap: i32) -> NativeResult<()> {
        Err(NativeError::Unsupported("stroke_state_set_line_cap"))
    }
    fn stroke_state_set_line_join(&self, stroke: RawHandle, join: i32) -> NativeResult<()> {
        Err(NativeError::Unsupported("stroke_state_set_line_join"))
    }

    // --- documents ---

    fn open_document_with_buffer(&self, magic: Address, buffer: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("open_document_with_buffer"))
    }
    fn open_document_with_stream(&self, magic: Address, stream: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("open_document_with_stream"))
    }
    fn new_structured_document(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_structured_document"))
    }
    /// Capability probe: zero when the document has no structured
    /// (editable) object format.
    fn structured_document_handle(&self, document: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("structured_document_handle"))
    }
    fn needs_password(&self, document: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("needs_password"))
    }
    fn authenticate_password(&self, document: RawHandle, password: Address) -> NativeResult<i32> {
        Err(NativeError::Unsupported("authenticate_password"))
    }
    fn has_permission(&self, document: RawHandle, permission: i32) -> NativeResult<bool> {
        Err(NativeError::Unsupported("has_permission"))
    }
    /// Static buffer; zero when the key is absent.
    fn lookup_metadata(&self, document: RawHandle, key: Address) -> NativeResult<Address> {
        Err(NativeError::Unsupported("lookup_metadata"))
    }
    fn set_metadata(&self, document: RawHandle, key: Address, value: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_metadata"))
    }
    fn count_pages(&self, document: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("count_pages"))
    }
    fn load_page(&self, document: RawHandle, index: i32) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("load_page"))
    }
    /// Capability probe: zero when the page is not structured.
    fn structured_page_handle(&self, page: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("structured_page_handle"))
    }
    /// Owned outline root; zero when the document has no outline.
    fn load_outline(&self, document: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("load_outline"))
    }
    /// Static string; zero when the node has no title.
    fn outline_title(&self, outline: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("outline_title"))
    }
    /// Static string; zero when the node has no target.
    fn outline_uri(&self, outline: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("outline_uri"))
    }
    fn outline_next(&self, outline: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("outline_next"))
    }
    fn outline_down(&self, outline: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("outline_down"))
    }
    /// Page index the node points at; negative when it has none.
    fn outline_page(&self, document: RawHandle, outline: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("outline_page"))
    }
    /// Page index a URI resolves to; negative when unresolved.
    fn resolve_link(&self, document: RawHandle, uri: Address) -> NativeResult<i32> {
        Err(NativeError::Unsupported("resolve_link"))
    }

    // --- pages ---

    fn bound_page(&self, page: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("bound_page"))
    }
    /// Static string.
    fn page_label(&self, page: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("page_label"))
    }
    fn run_page(
        &self,
        page: RawHandle,
        device: RawHandle,
        ctm: Address,
        cookie: RawHandle,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("run_page"))
    }
    fn run_page_contents(
        &self,
        page: RawHandle,
        device: RawHandle,
        ctm: Address,
        cookie: RawHandle,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("run_page_contents"))
    }
    fn run_page_annotations(
        &self,
        page: RawHandle,
        device: RawHandle,
        ctm: Address,
        cookie: RawHandle,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("run_page_annotations"))
    }
    fn run_page_widgets(
        &self,
        page: RawHandle,
        device: RawHandle,
        ctm: Address,
        cookie: RawHandle,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("run_page_widgets"))
    }
    fn pixmap_from_page(
        &self,
        page: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        alpha: bool,
        show_extras: bool,
    ) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("pixmap_from_page"))
    }
    fn display_list_from_page(&self, page: RawHandle, show_extras: bool) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("display_list_from_page"))
    }
    fn stext_from_page(&self, page: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("stext_from_page"))
    }
    /// Owned head of the page's link list; zero when there are none.
    fn load_links(&self, page: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("load_links"))
    }
    fn link_rect(&self, link: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("link_rect"))
    }
    /// Static string.
    fn link_uri(&self, link: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("link_uri"))
    }
    fn link_next(&self, link: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("link_next"))
    }
    /// Writes up to `max_hits` quads and group-boundary marks into the two
    /// caller-allocated arrays; returns the hit count.
    fn search_page(
        &self,
        page: RawHandle,
        needle: Address,
        marks: Address,
        hits: Address,
        max_hits: u32,
    ) -> NativeResult<i32> {
        Err(NativeError::Unsupported("search_page"))
    }
    fn create_link(&self, page: RawHandle, bbox: Address, uri: Address) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("create_link"))
    }

    // --- structured pages and annotations ---

    /// Borrowed; zero when the page has no annotations.
    fn first_annotation(&self, page: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("first_annotation"))
    }
    /// Borrowed; zero at the end of the list.
    fn next_annotation(&self, annotation: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("next_annotation"))
    }
    /// Borrowed; zero when the page has no widgets.
    fn first_widget(&self, page: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("first_widget"))
    }
    fn next_widget(&self, annotation: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("next_widget"))
    }
    /// Owned.
    fn create_annotation(&self, page: RawHandle, kind: i32) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("create_annotation"))
    }
    fn delete_annotation(&self, page: RawHandle, annotation: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("delete_annotation"))
    }
    fn update_page(&self, page: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("update_page"))
    }
    fn redact_page(&self, page: RawHandle, black_boxes: bool, image_method: i32) -> NativeResult<()> {
        Err(NativeError::Unsupported("redact_page"))
    }
    fn update_annotation(&self, annotation: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("update_annotation"))
    }
    fn bound_annotation(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("bound_annotation"))
    }
    fn run_annotation(
        &self,
        annotation: RawHandle,
        device: RawHandle,
        ctm: Address,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("run_annotation"))
    }
    fn pixmap_from_annotation(
        &self,
        annotation: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        alpha: bool,
    ) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("pixmap_from_annotation"))
    }
    fn display_list_from_annotation(&self, annotation: RawHandle) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("display_list_from_annotation"))
    }
    fn annotation_type(&self, annotation: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("annotation_type"))
    }
    fn annotation_flags(&self, annotation: RawHandle) -> NativeResult<u32> {
        Err(NativeError::Unsupported("annotation_flags"))
    }
    fn set_annotation_flags(&self, annotation: RawHandle, flags: u32) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_flags"))
    }
    /// Newly allocated string; the caller must free it.
    fn annotation_contents(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("annotation_contents"))
    }
    fn set_annotation_contents(&self, annotation: RawHandle, text: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_contents"))
    }
    fn annotation_has_author(&self, annotation: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("annotation_has_author"))
    }
    /// Newly allocated string; the caller must free it.
    fn annotation_author(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("annotation_author"))
    }
    fn set_annotation_author(&self, annotation: RawHandle, name: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_author"))
    }
    fn annotation_opacity(&self, annotation: RawHandle) -> NativeResult<f32> {
        Err(NativeError::Unsupported("annotation_opacity"))
    }
    fn set_annotation_opacity(&self, annotation: RawHandle, opacity: f32) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_opacity"))
    }
    fn annotation_has_rect(&self, annotation: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("annotation_has_rect"))
    }
    fn annotation_rect(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("annotation_rect"))
    }
    fn set_annotation_rect(&self, annotation: RawHandle, rect: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_rect"))
    }
    fn annotation_has_open(&self, annotation: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("annotation_has_open"))
    }
    fn annotation_is_open(&self, annotation: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("annotation_is_open"))
    }
    fn set_annotation_is_open(&self, annotation: RawHandle, open: bool) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_is_open"))
    }
    fn annotation_has_icon_name(&self, annotation: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("annotation_has_icon_name"))
    }
    /// Static string.
    fn annotation_icon_name(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("annotation_icon_name"))
    }
    fn set_annotation_icon_name(&self, annotation: RawHandle, name: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_icon_name"))
    }
    fn annotation_border_width(&self, annotation: RawHandle) -> NativeResult<f32> {
        Err(NativeError::Unsupported("annotation_border_width"))
    }
    fn set_annotation_border_width(&self, annotation: RawHandle, width: f32) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_border_width"))
    }
    /// Static string.
    fn annotation_language(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("annotation_language"))
    }
    fn set_annotation_language(&self, annotation: RawHandle, lang: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_language"))
    }
    fn annotation_has_line(&self, annotation: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("annotation_has_line"))
    }
    /// Address of two packed points (4 floats).
    fn annotation_line(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("annotation_line"))
    }
    #[allow(clippy::too_many_arguments)]
    fn set_annotation_line(
        &self,
        annotation: RawHandle,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_line"))
    }
    fn annotation_has_vertices(&self, annotation: RawHandle) -> NativeResult<bool> {
        Err(NativeError::Unsupported("annotation_has_vertices"))
    }
    fn annotation_vertex_count(&self, annotation: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("annotation_vertex_count"))
    }
    fn annotation_vertex(&self, annotation: RawHandle, index: i32) -> NativeResult<Address> {
        Err(NativeError::Unsupported("annotation_vertex"))
    }
    fn add_annotation_vertex(&self, annotation: RawHandle, x: f32, y: f32) -> NativeResult<()> {
        Err(NativeError::Unsupported("add_annotation_vertex"))
    }
    fn set_annotation_vertex(
        &self,
        annotation: RawHandle,
        index: i32,
        x: f32,
        y: f32,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_vertex"))
    }
    fn clear_annotation_vertices(&self, annotation: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("clear_annotation_vertices"))
    }
    /// Seconds since the Unix epoch.
    fn annotation_creation_date(&self, annotation: RawHandle) -> NativeResult<i64> {
        Err(NativeError::Unsupported("annotation_creation_date"))
    }
    fn set_annotation_creation_date(&self, annotation: RawHandle, seconds: i64) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_creation_date"))
    }
    /// Seconds since the Unix epoch.
    fn annotation_modification_date(&self, annotation: RawHandle) -> NativeResult<i64> {
        Err(NativeError::Unsupported("annotation_modification_date"))
    }
    fn set_annotation_modification_date(
        &self,
        annotation: RawHandle,
        seconds: i64,
    ) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_modification_date"))
    }
    fn annotation_popup(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("annotation_popup"))
    }
    fn set_annotation_popup(&self, annotation: RawHandle, rect: Address) -> NativeResult<()> {
        Err(NativeError::Unsupported("set_annotation_popup"))
    }

    // --- widgets ---

    fn widget_field_type(&self, annotation: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("widget_field_type"))
    }
    fn widget_field_flags(&self, annotation: RawHandle) -> NativeResult<u32> {
        Err(NativeError::Unsupported("widget_field_flags"))
    }
    /// Newly allocated string; the caller must free it.
    fn widget_field_value(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("widget_field_value"))
    }
    /// Newly allocated string; the caller must free it.
    fn widget_field_label(&self, annotation: RawHandle) -> NativeResult<Address> {
        Err(NativeError::Unsupported("widget_field_label"))
    }

    // --- progressive streams ---

    /// Creates a virtual seekable stream backed by ranged fetches. The
    /// engine assigns a stream id and reports it through
    /// [`FetchHooks::open`] before returning.
    fn open_stream_from_url(
        &self,
        url: Address,
        content_length: u64,
        block_size: u32,
        prefetch: bool,
    ) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("open_stream_from_url"))
    }
    fn stream_fetch_id(&self, stream: RawHandle) -> NativeResult<StreamId> {
        Err(NativeError::Unsupported("stream_fetch_id"))
    }

    // --- cookies ---

    fn new_cookie(&self) -> NativeResult<RawHandle> {
        Err(NativeError::Unsupported("new_cookie"))
    }
    fn cookie_abort(&self, cookie: RawHandle) -> NativeResult<()> {
        Err(NativeError::Unsupported("cookie_abort"))
    }
    fn cookie_progress(&self, cookie: RawHandle) -> NativeResult<i32> {
        Err(NativeError::Unsupported("cookie_progress"))
    }
}
