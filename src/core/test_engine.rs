//! A scripted in-memory engine for tests.
//!
//! `TestEngine` implements the full boundary trait against plain host
//! memory: linear memory is a `Vec<u8>`, handles are counters with explicit
//! refcounts, and document structure (pages, annotations, links, outline,
//! search hits) is scripted by the test. Operations append their name to a
//! call log so tests can assert exactly which entry points ran, and any
//! entry point can be scripted to fail, either hard or with the retryable
//! try-later marker.
//!
//! The engine is `Clone`; clones share state, so a test can hand one copy
//! to the runtime and keep another for assertions.

use crate::core::engine::{
    Address, Capabilities, FetchHooks, HandleKind, NativeEngine, NativeError, NativeResult,
    RawHandle, StreamId,
};
use rustc_hash::FxHashMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// A scripted outline node.
#[derive(Clone, Default)]
pub struct TestOutline {
    pub title: String,
    pub uri: String,
    pub page: i32,
    pub children: Vec<TestOutline>,
}

struct OutlineNode {
    title: String,
    uri: String,
    page: i32,
    next: RawHandle,
    down: RawHandle,
}

#[derive(Default)]
struct EngineState {
    boot_calls: u32,
    shared_memory: bool,

    memory: Vec<u8>,
    freed: Vec<Address>,

    next_handle: RawHandle,
    refcounts: FxHashMap<RawHandle, i32>,
    drops: FxHashMap<RawHandle, u32>,
    drop_log: Vec<(HandleKind, RawHandle)>,

    calls: Vec<String>,
    fail_ops: HashSet<String>,
    try_later_ops: HashSet<String>,

    out_rect: Address,
    out_matrix: Address,
    out_point: Address,
    colorspaces: [RawHandle; 5],

    structured_documents: bool,
    structured_pages: bool,
    page_count: i32,
    password: Option<String>,
    permissions: HashSet<i32>,
    metadata: FxHashMap<String, String>,
    resolved_links: FxHashMap<String, i32>,

    initial_annotation_types: Vec<i32>,
    annotations: FxHashMap<RawHandle, Vec<RawHandle>>,
    annotation_types: FxHashMap<RawHandle, i32>,
    annotation_contents: FxHashMap<RawHandle, String>,
    annotation_authors: FxHashMap<RawHandle, String>,
    annotation_flags: FxHashMap<RawHandle, u32>,
    annotation_rects: FxHashMap<RawHandle, [f32; 4]>,
    annotation_opacity: FxHashMap<RawHandle, f32>,
    annotation_open: FxHashMap<RawHandle, bool>,
    annotation_icons: FxHashMap<RawHandle, String>,
    annotation_languages: FxHashMap<RawHandle, String>,
    annotation_borders: FxHashMap<RawHandle, f32>,
    annotation_lines: FxHashMap<RawHandle, [f32; 4]>,
    annotation_vertices: FxHashMap<RawHandle, Vec<(f32, f32)>>,
    annotation_dates: FxHashMap<RawHandle, (i64, i64)>,

    widget_field_types_script: Vec<i32>,
    widgets: FxHashMap<RawHandle, Vec<RawHandle>>,
    widget_field_types: FxHashMap<RawHandle, i32>,

    link_uris_script: Vec<String>,
    link_next: FxHashMap<RawHandle, RawHandle>,
    link_uris: FxHashMap<RawHandle, String>,

    outline_script: Vec<TestOutline>,
    outline_nodes: FxHashMap<RawHandle, OutlineNode>,

    search_quads: Vec<[f32; 8]>,
    search_marks: Vec<i32>,

    buffers: FxHashMap<RawHandle, Vec<u8>>,
    pixmaps: FxHashMap<RawHandle, (i32, i32)>,
    font_names: FxHashMap<RawHandle, String>,
    stroke_widths: FxHashMap<RawHandle, f32>,
    cookies: FxHashMap<RawHandle, (bool, i32)>,

    streams: FxHashMap<RawHandle, StreamId>,
    next_stream_id: StreamId,
    delivered: Vec<(StreamId, u32, Vec<u8>)>,
}

fn alloc(st: &mut EngineState, size: usize) -> Address {
    if st.memory.is_empty() {
        // Keep address zero invalid.
        st.memory.resize(8, 0);
    }
    while st.memory.len() % 4 != 0 {
        st.memory.push(0);
    }
    let addr = st.memory.len() as Address;
    st.memory.resize(st.memory.len() + size.max(1), 0);
    addr
}

fn fresh(st: &mut EngineState) -> RawHandle {
    fresh_with(st, 1)
}

fn fresh_with(st: &mut EngineState, refcount: i32) -> RawHandle {
    st.next_handle += 1;
    let handle = st.next_handle;
    st.refcounts.insert(handle, refcount);
    handle
}

fn write_f32s(st: &mut EngineState, addr: Address, values: &[f32]) {
    for (i, value) in values.iter().enumerate() {
        let at = addr as usize + i * 4;
        st.memory[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
}

fn write_i32(st: &mut EngineState, addr: Address, value: i32) {
    let at = addr as usize;
    st.memory[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn cstring_at(st: &EngineState, addr: Address) -> String {
    let mut end = addr as usize;
    while end < st.memory.len() && st.memory[end] != 0 {
        end += 1;
    }
    String::from_utf8_lossy(&st.memory[addr as usize..end]).into_owned()
}

fn alloc_cstring(st: &mut EngineState, text: &str) -> Address {
    let addr = alloc(st, text.len() + 1);
    let at = addr as usize;
    st.memory[at..at + text.len()].copy_from_slice(text.as_bytes());
    addr
}

fn out_rect(st: &mut EngineState, values: [f32; 4]) -> Address {
    let addr = st.out_rect;
    write_f32s(st, addr, &values);
    addr
}

fn build_outline(st: &mut EngineState, items: &[TestOutline]) -> RawHandle {
    let mut first = 0;
    let mut prev = 0;
    for item in items {
        let handle = fresh_with(st, 0);
        let down = build_outline(st, &item.children);
        st.outline_nodes.insert(
            handle,
            OutlineNode {
                title: item.title.clone(),
                uri: item.uri.clone(),
                page: item.page,
                next: 0,
                down,
            },
        );
        if first == 0 {
            first = handle;
        }
        if prev != 0 {
            if let Some(node) = st.outline_nodes.get_mut(&prev) {
                node.next = handle;
            }
        }
        prev = handle;
    }
    first
}

/// Scripted engine; see the module docs.
#[derive(Clone, Default)]
pub struct TestEngine {
    state: Arc<Mutex<EngineState>>,
    hooks: Arc<Mutex<Option<Arc<dyn FetchHooks>>>>,
}

impl TestEngine {
    pub fn new() -> TestEngine {
        TestEngine::default()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }

    /// Scripted failure / try-later check, plus the call log.
    fn enter(st: &mut EngineState, op: &str) -> NativeResult<()> {
        st.calls.push(op.to_string());
        if st.try_later_ops.contains(op) {
            return Err(NativeError::TryLater);
        }
        if st.fail_ops.contains(op) {
            return Err(NativeError::Failed(format!("scripted failure: {}", op)));
        }
        Ok(())
    }

    fn hooks(&self) -> Option<Arc<dyn FetchHooks>> {
        self.hooks.lock().unwrap().clone()
    }

    // --- scripting ---

    pub fn set_shared_memory(&self, value: bool) {
        self.lock().shared_memory = value;
    }

    pub fn set_structured_documents(&self, value: bool) {
        self.lock().structured_documents = value;
    }

    pub fn set_structured_pages(&self, value: bool) {
        self.lock().structured_pages = value;
    }

    pub fn set_page_count(&self, count: i32) {
        self.lock().page_count = count;
    }

    pub fn set_password(&self, password: &str) {
        self.lock().password = Some(password.to_string());
    }

    pub fn set_permissions(&self, permissions: &[i32]) {
        self.lock().permissions = permissions.iter().copied().collect();
    }

    /// Annotation type codes seeded onto every loaded page.
    pub fn set_initial_annotations(&self, types: &[i32]) {
        self.lock().initial_annotation_types = types.to_vec();
    }

    /// Widget field type codes seeded onto every loaded page.
    pub fn set_widget_field_types(&self, types: &[i32]) {
        self.lock().widget_field_types_script = types.to_vec();
    }

    pub fn set_link_uris(&self, uris: &[&str]) {
        self.lock().link_uris_script = uris.iter().map(|u| u.to_string()).collect();
    }

    pub fn set_outline(&self, items: Vec<TestOutline>) {
        self.lock().outline_script = items;
    }

    pub fn set_resolved_link(&self, uri: &str, page: i32) {
        self.lock().resolved_links.insert(uri.to_string(), page);
    }

    pub fn set_search_results(&self, quads: Vec<[f32; 8]>, marks: Vec<i32>) {
        let mut st = self.lock();
        st.search_quads = quads;
        st.search_marks = marks;
    }

    /// Makes `op` fail with a hard error.
    pub fn script_failure(&self, op: &str) {
        self.lock().fail_ops.insert(op.to_string());
    }

    /// Makes `op` fail with the retryable try-later marker.
    pub fn script_try_later(&self, op: &str) {
        self.lock().try_later_ops.insert(op.to_string());
    }

    /// Simulates the engine requesting a block of a progressive stream.
    pub fn request_block(&self, id: StreamId, block: u32) {
        if let Some(hooks) = self.hooks() {
            hooks.read(id, block);
        }
    }

    /// Registers a loose owned handle, for wrapper tests.
    pub fn register_handle(&self, _kind: HandleKind) -> RawHandle {
        fresh(&mut self.lock())
    }

    // --- assertions ---

    pub fn boot_calls(&self) -> u32 {
        self.lock().boot_calls
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == op).count()
    }

    pub fn delivered(&self) -> Vec<(StreamId, u32, Vec<u8>)> {
        self.lock().delivered.clone()
    }

    pub fn freed_addresses(&self) -> Vec<Address> {
        self.lock().freed.clone()
    }

    pub fn drop_count(&self, handle: RawHandle) -> u32 {
        self.lock().drops.get(&handle).copied().unwrap_or(0)
    }

    pub fn drop_log(&self) -> Vec<(HandleKind, RawHandle)> {
        self.lock().drop_log.clone()
    }

    pub fn refcount(&self, handle: RawHandle) -> i32 {
        self.lock().refcounts.get(&handle).copied().unwrap_or(0)
    }

    /// Handles with a positive refcount.
    pub fn live_handles(&self) -> usize {
        self.lock().refcounts.values().filter(|rc| **rc > 0).count()
    }

    pub fn last_handle(&self) -> RawHandle {
        self.lock().next_handle
    }
}

#[allow(unused_variables)]
impl NativeEngine for TestEngine {
    fn boot(&self) -> NativeResult<()> {
        let mut st = self.lock();
        st.boot_calls += 1;
        if st.boot_calls > 1 {
            return Ok(());
        }
        let out_rect = alloc(&mut st, 16);
        let out_matrix = alloc(&mut st, 24);
        let out_point = alloc(&mut st, 16);
        st.out_rect = out_rect;
        st.out_matrix = out_matrix;
        st.out_point = out_point;
        for slot in 0..5 {
            let handle = fresh(&mut st);
            st.colorspaces[slot] = handle;
        }
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            shared_memory: self.lock().shared_memory,
        }
    }

    fn malloc(&self, size: usize) -> NativeResult<Address> {
        let mut st = self.lock();
        if st.fail_ops.contains("malloc") {
            return Err(NativeError::Failed("scripted failure: malloc".to_string()));
        }
        Ok(alloc(&mut st, size))
    }

    fn free(&self, addr: Address) {
        self.lock().freed.push(addr);
    }

    fn read_bytes(&self, addr: Address, len: usize) -> Vec<u8> {
        let st = self.lock();
        st.memory[addr as usize..addr as usize + len].to_vec()
    }

    fn write_bytes(&self, addr: Address, bytes: &[u8]) {
        let mut st = self.lock();
        let at = addr as usize;
        st.memory[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn read_f32(&self, addr: Address) -> f32 {
        let st = self.lock();
        let at = addr as usize;
        f32::from_le_bytes(st.memory[at..at + 4].try_into().unwrap())
    }

    fn write_f32(&self, addr: Address, value: f32) {
        write_f32s(&mut self.lock(), addr, &[value]);
    }

    fn read_i32(&self, addr: Address) -> i32 {
        let st = self.lock();
        let at = addr as usize;
        i32::from_le_bytes(st.memory[at..at + 4].try_into().unwrap())
    }

    fn read_cstring(&self, addr: Address) -> String {
        cstring_at(&self.lock(), addr)
    }

    fn keep(&self, kind: HandleKind, handle: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        *st.refcounts.entry(handle).or_insert(0) += 1;
        Ok(handle)
    }

    fn drop_handle(&self, kind: HandleKind, handle: RawHandle) {
        let closed_stream = {
            let mut st = self.lock();
            *st.refcounts.entry(handle).or_insert(0) -= 1;
            *st.drops.entry(handle).or_insert(0) += 1;
            st.drop_log.push((kind, handle));
            if kind == HandleKind::Stream {
                st.streams.get(&handle).copied()
            } else {
                None
            }
        };
        if let Some(id) = closed_stream {
            if let Some(hooks) = self.hooks() {
                hooks.close(id);
            }
        }
    }

    fn install_fetch_hooks(&self, hooks: Arc<dyn FetchHooks>) {
        *self.hooks.lock().unwrap() = Some(hooks);
    }

    fn deliver_block(
        &self,
        id: StreamId,
        block: u32,
        data: Address,
        len: usize,
    ) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "deliver_block")?;
        let bytes = st.memory[data as usize..data as usize + len].to_vec();
        st.delivered.push((id, block, bytes));
        Ok(())
    }

    // --- buffers ---

    fn new_buffer(&self, capacity: usize) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_buffer")?;
        let handle = fresh(&mut st);
        st.buffers.insert(handle, Vec::new());
        Ok(handle)
    }

    fn new_buffer_from_data(&self, data: Address, len: usize) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_buffer_from_data")?;
        let bytes = st.memory[data as usize..data as usize + len].to_vec();
        let handle = fresh(&mut st);
        st.buffers.insert(handle, bytes);
        Ok(handle)
    }

    fn buffer_data(&self, buffer: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "buffer_data")?;
        let bytes = st.buffers.get(&buffer).cloned().unwrap_or_default();
        let addr = alloc(&mut st, bytes.len().max(1));
        let at = addr as usize;
        st.memory[at..at + bytes.len()].copy_from_slice(&bytes);
        Ok(addr)
    }

    fn buffer_size(&self, buffer: RawHandle) -> NativeResult<usize> {
        let mut st = self.lock();
        Self::enter(&mut st, "buffer_size")?;
        Ok(st.buffers.get(&buffer).map(|b| b.len()).unwrap_or(0))
    }

    fn append_string(&self, buffer: RawHandle, text: Address) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "append_string")?;
        let text = cstring_at(&st, text);
        st.buffers.entry(buffer).or_default().extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn append_byte(&self, buffer: RawHandle, byte: u32) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "append_byte")?;
        st.buffers.entry(buffer).or_default().push(byte as u8);
        Ok(())
    }

    fn append_buffer(&self, buffer: RawHandle, other: RawHandle) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "append_buffer")?;
        let bytes = st.buffers.get(&other).cloned().unwrap_or_default();
        st.buffers.entry(buffer).or_default().extend_from_slice(&bytes);
        Ok(())
    }

    // --- colorspaces ---

    fn device_gray(&self) -> NativeResult<RawHandle> {
        Ok(self.lock().colorspaces[0])
    }

    fn device_rgb(&self) -> NativeResult<RawHandle> {
        Ok(self.lock().colorspaces[1])
    }

    fn device_bgr(&self) -> NativeResult<RawHandle> {
        Ok(self.lock().colorspaces[2])
    }

    fn device_cmyk(&self) -> NativeResult<RawHandle> {
        Ok(self.lock().colorspaces[3])
    }

    fn device_lab(&self) -> NativeResult<RawHandle> {
        Ok(self.lock().colorspaces[4])
    }

    fn colorspace_name(&self, colorspace: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "colorspace_name")?;
        let index = st.colorspaces.iter().position(|c| *c == colorspace);
        let name = match index {
            Some(0) => "DeviceGray",
            Some(1) => "DeviceRGB",
            Some(2) => "DeviceBGR",
            Some(3) => "DeviceCMYK",
            Some(4) => "Lab",
            _ => "Unknown",
        };
        Ok(alloc_cstring(&mut st, name))
    }

    fn colorspace_type(&self, colorspace: RawHandle) -> NativeResult<i32> {
        let st = self.lock();
        let index = st.colorspaces.iter().position(|c| *c == colorspace);
        Ok(match index {
            Some(0) => 1, // gray
            Some(1) => 2, // rgb
            Some(2) => 3, // bgr
            Some(3) => 4, // cmyk
            Some(4) => 5, // lab
            _ => 0,
        })
    }

    fn colorspace_components(&self, colorspace: RawHandle) -> NativeResult<i32> {
        let kind = self.colorspace_type(colorspace)?;
        Ok(match kind {
            1 => 1,
            2 | 3 | 5 => 3,
            4 => 4,
            _ => 0,
        })
    }

    // --- fonts ---

    fn new_base14_font(&self, name: Address) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_base14_font")?;
        let name = cstring_at(&st, name);
        let handle = fresh(&mut st);
        st.font_names.insert(handle, name);
        Ok(handle)
    }

    fn new_font_from_buffer(&self, buffer: RawHandle, index: i32) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_font_from_buffer")?;
        let handle = fresh(&mut st);
        st.font_names.insert(handle, "Embedded".to_string());
        Ok(handle)
    }

    fn font_name(&self, font: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "font_name")?;
        let name = st.font_names.get(&font).cloned().unwrap_or_default();
        Ok(alloc_cstring(&mut st, &name))
    }

    fn encode_character(&self, font: RawHandle, unicode: u32) -> NativeResult<i32> {
        Ok(unicode as i32)
    }

    fn advance_glyph(&self, font: RawHandle, glyph: i32, wmode: i32) -> NativeResult<f32> {
        Ok(0.5)
    }

    // --- images ---

    fn new_image_from_pixmap(&self, pixmap: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_image_from_pixmap")?;
        Ok(fresh(&mut st))
    }

    fn new_image_from_buffer(&self, buffer: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_image_from_buffer")?;
        Ok(fresh(&mut st))
    }

    fn image_width(&self, image: RawHandle) -> NativeResult<i32> {
        Ok(100)
    }

    fn image_height(&self, image: RawHandle) -> NativeResult<i32> {
        Ok(50)
    }

    fn image_components(&self, image: RawHandle) -> NativeResult<i32> {
        Ok(3)
    }

    fn image_bits_per_component(&self, image: RawHandle) -> NativeResult<i32> {
        Ok(8)
    }

    fn image_xres(&self, image: RawHandle) -> NativeResult<i32> {
        Ok(96)
    }

    fn image_yres(&self, image: RawHandle) -> NativeResult<i32> {
        Ok(96)
    }

    fn image_is_mask(&self, image: RawHandle) -> NativeResult<bool> {
        Ok(false)
    }

    fn image_colorspace(&self, image: RawHandle) -> NativeResult<RawHandle> {
        Ok(self.lock().colorspaces[1])
    }

    fn image_mask(&self, image: RawHandle) -> NativeResult<RawHandle> {
        Ok(0)
    }

    fn image_to_pixmap(&self, image: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "image_to_pixmap")?;
        let handle = fresh(&mut st);
        st.pixmaps.insert(handle, (100, 50));
        Ok(handle)
    }

    // --- paths ---

    fn new_path(&self) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_path")?;
        Ok(fresh(&mut st))
    }

    fn path_move_to(&self, path: RawHandle, x: f32, y: f32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "path_move_to")
    }

    fn path_line_to(&self, path: RawHandle, x: f32, y: f32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "path_line_to")
    }

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
        Self::enter(&mut self.lock(), "path_curve_to")
    }

    fn path_curve_to_v(
        &self,
        path: RawHandle,
        cx: f32,
        cy: f32,
        ex: f32,
        ey: f32,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "path_curve_to_v")
    }

    fn path_curve_to_y(
        &self,
        path: RawHandle,
        cx: f32,
        cy: f32,
        ex: f32,
        ey: f32,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "path_curve_to_y")
    }

    fn path_rect(&self, path: RawHandle, x0: f32, y0: f32, x1: f32, y1: f32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "path_rect")
    }

    fn path_close(&self, path: RawHandle) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "path_close")
    }

    fn transform_path(&self, path: RawHandle, matrix: Address) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "transform_path")
    }

    fn bound_path(&self, path: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "bound_path")?;
        Ok(out_rect(&mut st, [0.0, 0.0, 100.0, 100.0]))
    }

    // --- text ---

    fn new_text(&self) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_text")?;
        Ok(fresh(&mut st))
    }

    fn bound_text(&self, text: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "bound_text")?;
        Ok(out_rect(&mut st, [0.0, 0.0, 200.0, 20.0]))
    }

    fn show_glyph(
        &self,
        text: RawHandle,
        font: RawHandle,
        trm: Address,
        glyph: i32,
        unicode: u32,
        wmode: i32,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "show_glyph")
    }

    fn show_string(
        &self,
        text: RawHandle,
        font: RawHandle,
        trm: Address,
        string: Address,
        wmode: i32,
    ) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "show_string")?;
        // Advance the text matrix translation by a fixed amount.
        let mut values = [0.0f32; 6];
        for (i, value) in values.iter_mut().enumerate() {
            let at = trm as usize + i * 4;
            *value = f32::from_le_bytes(st.memory[at..at + 4].try_into().unwrap());
        }
        values[4] += 10.0;
        let addr = st.out_matrix;
        write_f32s(&mut st, addr, &values);
        Ok(addr)
    }

    // --- pixmaps ---

    fn new_pixmap_with_bbox(
        &self,
        colorspace: RawHandle,
        bbox: Address,
        alpha: bool,
    ) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_pixmap_with_bbox")?;
        let at = bbox as usize;
        let x0 = f32::from_le_bytes(st.memory[at..at + 4].try_into().unwrap());
        let y0 = f32::from_le_bytes(st.memory[at + 4..at + 8].try_into().unwrap());
        let x1 = f32::from_le_bytes(st.memory[at + 8..at + 12].try_into().unwrap());
        let y1 = f32::from_le_bytes(st.memory[at + 12..at + 16].try_into().unwrap());
        let handle = fresh(&mut st);
        st.pixmaps.insert(handle, ((x1 - x0) as i32, (y1 - y0) as i32));
        Ok(handle)
    }

    fn pixmap_x(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Ok(0)
    }

    fn pixmap_y(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Ok(0)
    }

    fn pixmap_width(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Ok(self.lock().pixmaps.get(&pixmap).map(|d| d.0).unwrap_or(0))
    }

    fn pixmap_height(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Ok(self.lock().pixmaps.get(&pixmap).map(|d| d.1).unwrap_or(0))
    }

    fn pixmap_stride(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Ok(self.pixmap_width(pixmap)? * 3)
    }

    fn pixmap_components(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Ok(3)
    }

    fn pixmap_xres(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Ok(96)
    }

    fn pixmap_yres(&self, pixmap: RawHandle) -> NativeResult<i32> {
        Ok(96)
    }

    fn pixmap_set_xres(&self, pixmap: RawHandle, xres: i32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "pixmap_set_xres")
    }

    fn pixmap_set_yres(&self, pixmap: RawHandle, yres: i32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "pixmap_set_yres")
    }

    fn pixmap_colorspace(&self, pixmap: RawHandle) -> NativeResult<RawHandle> {
        Ok(self.lock().colorspaces[1])
    }

    fn pixmap_samples(&self, pixmap: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "pixmap_samples")?;
        let (w, h) = st.pixmaps.get(&pixmap).copied().unwrap_or((0, 0));
        let size = (w * 3 * h).max(0) as usize;
        let addr = alloc(&mut st, size.max(1));
        for i in 0..size {
            st.memory[addr as usize + i] = 0xAB;
        }
        Ok(addr)
    }

    fn clear_pixmap(&self, pixmap: RawHandle) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "clear_pixmap")
    }

    fn clear_pixmap_with_value(&self, pixmap: RawHandle, value: i32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "clear_pixmap_with_value")
    }

    fn pixmap_as_png(&self, pixmap: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "pixmap_as_png")?;
        let handle = fresh(&mut st);
        st.buffers.insert(handle, b"\x89PNG\r\n\x1a\n".to_vec());
        Ok(handle)
    }

    // --- display lists ---

    fn new_display_list(&self, mediabox: Address) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_display_list")?;
        Ok(fresh(&mut st))
    }

    fn bound_display_list(&self, list: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "bound_display_list")?;
        Ok(out_rect(&mut st, [0.0, 0.0, 612.0, 792.0]))
    }

    fn run_display_list(&self, list: RawHandle, device: RawHandle, ctm: Address) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "run_display_list")
    }

    fn pixmap_from_display_list(
        &self,
        list: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        alpha: bool,
    ) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "pixmap_from_display_list")?;
        let handle = fresh(&mut st);
        st.pixmaps.insert(handle, (612, 792));
        Ok(handle)
    }

    fn stext_from_display_list(&self, list: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "stext_from_display_list")?;
        Ok(fresh(&mut st))
    }

    // --- structured text ---

    fn stext_as_json(&self, stext: RawHandle, scale: f32) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "stext_as_json")?;
        Ok(alloc_cstring(&mut st, "{\"blocks\":[]}"))
    }

    // --- devices ---

    fn new_draw_device(&self, ctm: Address, pixmap: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_draw_device")?;
        Ok(fresh(&mut st))
    }

    fn new_display_list_device(&self, list: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_display_list_device")?;
        Ok(fresh(&mut st))
    }

    fn close_device(&self, device: RawHandle) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "close_device")
    }

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
        Self::enter(&mut self.lock(), "fill_path")
    }

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
        Self::enter(&mut self.lock(), "stroke_path")
    }

    fn clip_path(
        &self,
        device: RawHandle,
        path: RawHandle,
        even_odd: bool,
        ctm: Address,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "clip_path")
    }

    fn clip_stroke_path(
        &self,
        device: RawHandle,
        path: RawHandle,
        stroke: RawHandle,
        ctm: Address,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "clip_stroke_path")
    }

    fn fill_text(
        &self,
        device: RawHandle,
        text: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        color: Address,
        alpha: f32,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "fill_text")
    }

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
        Self::enter(&mut self.lock(), "stroke_text")
    }

    fn clip_text(&self, device: RawHandle, text: RawHandle, ctm: Address) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "clip_text")
    }

    fn clip_stroke_text(
        &self,
        device: RawHandle,
        text: RawHandle,
        stroke: RawHandle,
        ctm: Address,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "clip_stroke_text")
    }

    fn ignore_text(&self, device: RawHandle, text: RawHandle, ctm: Address) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "ignore_text")
    }

    fn fill_image(
        &self,
        device: RawHandle,
        image: RawHandle,
        ctm: Address,
        alpha: f32,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "fill_image")
    }

    fn fill_image_mask(
        &self,
        device: RawHandle,
        image: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        color: Address,
        alpha: f32,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "fill_image_mask")
    }

    fn clip_image_mask(
        &self,
        device: RawHandle,
        image: RawHandle,
        ctm: Address,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "clip_image_mask")
    }

    fn pop_clip(&self, device: RawHandle) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "pop_clip")
    }

    fn begin_mask(
        &self,
        device: RawHandle,
        area: Address,
        luminosity: bool,
        colorspace: RawHandle,
        color: Address,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "begin_mask")
    }

    fn end_mask(&self, device: RawHandle) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "end_mask")
    }

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
        Self::enter(&mut self.lock(), "begin_group")
    }

    fn end_group(&self, device: RawHandle) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "end_group")
    }

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
        Self::enter(&mut self.lock(), "begin_tile")?;
        Ok(1)
    }

    fn end_tile(&self, device: RawHandle) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "end_tile")
    }

    fn begin_layer(&self, device: RawHandle, name: Address) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "begin_layer")
    }

    fn end_layer(&self, device: RawHandle) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "end_layer")
    }

    // --- stroke state ---

    fn new_stroke_state(&self) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_stroke_state")?;
        let handle = fresh(&mut st);
        st.stroke_widths.insert(handle, 1.0);
        Ok(handle)
    }

    fn stroke_state_line_width(&self, stroke: RawHandle) -> NativeResult<f32> {
        Ok(self.lock().stroke_widths.get(&stroke).copied().unwrap_or(1.0))
    }

    fn stroke_state_set_line_width(&self, stroke: RawHandle, width: f32) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "stroke_state_set_line_width")?;
        st.stroke_widths.insert(stroke, width);
        Ok(())
    }

    fn stroke_state_set_miter_limit(&self, stroke: RawHandle, limit: f32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "stroke_state_set_miter_limit")
    }

    fn stroke_state_set_line_cap(&self, stroke: RawHandle, cap: i32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "stroke_state_set_line_cap")
    }

    fn stroke_state_set_line_join(&self, stroke: RawHandle, join: i32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "stroke_state_set_line_join")
    }

    // --- documents ---

    fn open_document_with_buffer(&self, magic: Address, buffer: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "open_document_with_buffer")?;
        Ok(fresh(&mut st))
    }

    fn open_document_with_stream(&self, magic: Address, stream: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "open_document_with_stream")?;
        Ok(fresh(&mut st))
    }

    fn new_structured_document(&self) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_structured_document")?;
        Ok(fresh(&mut st))
    }

    fn structured_document_handle(&self, document: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "structured_document_handle")?;
        Ok(if st.structured_documents { document } else { 0 })
    }

    fn needs_password(&self, document: RawHandle) -> NativeResult<bool> {
        Ok(self.lock().password.is_some())
    }

    fn authenticate_password(&self, document: RawHandle, password: Address) -> NativeResult<i32> {
        let mut st = self.lock();
        Self::enter(&mut st, "authenticate_password")?;
        let given = cstring_at(&st, password);
        Ok(match &st.password {
            Some(expected) if *expected == given => 1,
            _ => 0,
        })
    }

    fn has_permission(&self, document: RawHandle, permission: i32) -> NativeResult<bool> {
        Ok(self.lock().permissions.contains(&permission))
    }

    fn lookup_metadata(&self, document: RawHandle, key: Address) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "lookup_metadata")?;
        let key = cstring_at(&st, key);
        match st.metadata.get(&key).cloned() {
            Some(value) => Ok(alloc_cstring(&mut st, &value)),
            None => Ok(0),
        }
    }

    fn set_metadata(&self, document: RawHandle, key: Address, value: Address) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "set_metadata")?;
        let key = cstring_at(&st, key);
        let value = cstring_at(&st, value);
        st.metadata.insert(key, value);
        Ok(())
    }

    fn count_pages(&self, document: RawHandle) -> NativeResult<i32> {
        let mut st = self.lock();
        Self::enter(&mut st, "count_pages")?;
        Ok(st.page_count)
    }

    fn load_page(&self, document: RawHandle, index: i32) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "load_page")?;
        let page = fresh(&mut st);
        let annot_types = st.initial_annotation_types.clone();
        let mut annots = Vec::new();
        for kind in annot_types {
            let annot = fresh_with(&mut st, 0);
            st.annotation_types.insert(annot, kind);
            annots.push(annot);
        }
        st.annotations.insert(page, annots);
        let widget_types = st.widget_field_types_script.clone();
        let mut widgets = Vec::new();
        for field in widget_types {
            let widget = fresh_with(&mut st, 0);
            st.annotation_types.insert(widget, 21); // widget annotation tag
            st.widget_field_types.insert(widget, field);
            widgets.push(widget);
        }
        st.widgets.insert(page, widgets);
        Ok(page)
    }

    fn structured_page_handle(&self, page: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "structured_page_handle")?;
        Ok(if st.structured_pages { page } else { 0 })
    }

    fn load_outline(&self, document: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "load_outline")?;
        if st.outline_script.is_empty() {
            return Ok(0);
        }
        let script = st.outline_script.clone();
        let root = build_outline(&mut st, &script);
        st.refcounts.insert(root, 1);
        Ok(root)
    }

    fn outline_title(&self, outline: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        let title = match st.outline_nodes.get(&outline) {
            Some(node) if !node.title.is_empty() => node.title.clone(),
            _ => return Ok(0),
        };
        Ok(alloc_cstring(&mut st, &title))
    }

    fn outline_uri(&self, outline: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        let uri = match st.outline_nodes.get(&outline) {
            Some(node) if !node.uri.is_empty() => node.uri.clone(),
            _ => return Ok(0),
        };
        Ok(alloc_cstring(&mut st, &uri))
    }

    fn outline_next(&self, outline: RawHandle) -> NativeResult<RawHandle> {
        Ok(self.lock().outline_nodes.get(&outline).map(|n| n.next).unwrap_or(0))
    }

    fn outline_down(&self, outline: RawHandle) -> NativeResult<RawHandle> {
        Ok(self.lock().outline_nodes.get(&outline).map(|n| n.down).unwrap_or(0))
    }

    fn outline_page(&self, document: RawHandle, outline: RawHandle) -> NativeResult<i32> {
        Ok(self.lock().outline_nodes.get(&outline).map(|n| n.page).unwrap_or(-1))
    }

    fn resolve_link(&self, document: RawHandle, uri: Address) -> NativeResult<i32> {
        let mut st = self.lock();
        Self::enter(&mut st, "resolve_link")?;
        let uri = cstring_at(&st, uri);
        Ok(st.resolved_links.get(&uri).copied().unwrap_or(-1))
    }

    // --- pages ---

    fn bound_page(&self, page: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "bound_page")?;
        Ok(out_rect(&mut st, [0.0, 0.0, 612.0, 792.0]))
    }

    fn page_label(&self, page: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "page_label")?;
        Ok(alloc_cstring(&mut st, "1"))
    }

    fn run_page(
        &self,
        page: RawHandle,
        device: RawHandle,
        ctm: Address,
        cookie: RawHandle,
    ) -> NativeResult<()> {
        let op = if cookie != 0 { "run_page(cookie)" } else { "run_page" };
        Self::enter(&mut self.lock(), op)
    }

    fn run_page_contents(
        &self,
        page: RawHandle,
        device: RawHandle,
        ctm: Address,
        cookie: RawHandle,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "run_page_contents")
    }

    fn run_page_annotations(
        &self,
        page: RawHandle,
        device: RawHandle,
        ctm: Address,
        cookie: RawHandle,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "run_page_annotations")
    }

    fn run_page_widgets(
        &self,
        page: RawHandle,
        device: RawHandle,
        ctm: Address,
        cookie: RawHandle,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "run_page_widgets")
    }

    fn pixmap_from_page(
        &self,
        page: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        alpha: bool,
        show_extras: bool,
    ) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        let op = if show_extras {
            "pixmap_from_page"
        } else {
            "pixmap_from_page_contents"
        };
        Self::enter(&mut st, op)?;
        let handle = fresh(&mut st);
        st.pixmaps.insert(handle, (612, 792));
        Ok(handle)
    }

    fn display_list_from_page(&self, page: RawHandle, show_extras: bool) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "display_list_from_page")?;
        Ok(fresh(&mut st))
    }

    fn stext_from_page(&self, page: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "stext_from_page")?;
        Ok(fresh(&mut st))
    }

    fn load_links(&self, page: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "load_links")?;
        if st.link_uris_script.is_empty() {
            return Ok(0);
        }
        let uris = st.link_uris_script.clone();
        let mut head = 0;
        let mut prev = 0;
        for uri in uris {
            // The head carries the list ownership; the tail is borrowed.
            let link = fresh_with(&mut st, if head == 0 { 1 } else { 0 });
            st.link_uris.insert(link, uri);
            if head == 0 {
                head = link;
            }
            if prev != 0 {
                st.link_next.insert(prev, link);
            }
            prev = link;
        }
        Ok(head)
    }

    fn link_rect(&self, link: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "link_rect")?;
        Ok(out_rect(&mut st, [0.0, 0.0, 10.0, 10.0]))
    }

    fn link_uri(&self, link: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "link_uri")?;
        let uri = st.link_uris.get(&link).cloned().unwrap_or_default();
        Ok(alloc_cstring(&mut st, &uri))
    }

    fn link_next(&self, link: RawHandle) -> NativeResult<RawHandle> {
        Ok(self.lock().link_next.get(&link).copied().unwrap_or(0))
    }

    fn search_page(
        &self,
        page: RawHandle,
        needle: Address,
        marks: Address,
        hits: Address,
        max_hits: u32,
    ) -> NativeResult<i32> {
        let mut st = self.lock();
        Self::enter(&mut st, "search_page")?;
        let count = st.search_quads.len().min(max_hits as usize);
        let quads = st.search_quads[..count].to_vec();
        let mark_values = st.search_marks.clone();
        for (i, quad) in quads.iter().enumerate() {
            write_f32s(&mut st, hits + (i * 32) as Address, quad);
            let mark = mark_values.get(i).copied().unwrap_or(0);
            write_i32(&mut st, marks + (i * 4) as Address, mark);
        }
        Ok(count as i32)
    }

    fn create_link(&self, page: RawHandle, bbox: Address, uri: Address) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "create_link")?;
        let uri = cstring_at(&st, uri);
        let link = fresh(&mut st);
        st.link_uris.insert(link, uri);
        Ok(link)
    }

    // --- structured pages and annotations ---

    fn first_annotation(&self, page: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "first_annotation")?;
        Ok(st.annotations.get(&page).and_then(|l| l.first().copied()).unwrap_or(0))
    }

    fn next_annotation(&self, annotation: RawHandle) -> NativeResult<RawHandle> {
        let st = self.lock();
        for list in st.annotations.values() {
            if let Some(pos) = list.iter().position(|a| *a == annotation) {
                return Ok(list.get(pos + 1).copied().unwrap_or(0));
            }
        }
        Ok(0)
    }

    fn first_widget(&self, page: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "first_widget")?;
        Ok(st.widgets.get(&page).and_then(|l| l.first().copied()).unwrap_or(0))
    }

    fn next_widget(&self, annotation: RawHandle) -> NativeResult<RawHandle> {
        let st = self.lock();
        for list in st.widgets.values() {
            if let Some(pos) = list.iter().position(|a| *a == annotation) {
                return Ok(list.get(pos + 1).copied().unwrap_or(0));
            }
        }
        Ok(0)
    }

    fn create_annotation(&self, page: RawHandle, kind: i32) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "create_annotation")?;
        let annot = fresh(&mut st);
        st.annotation_types.insert(annot, kind);
        st.annotations.entry(page).or_default().push(annot);
        Ok(annot)
    }

    fn delete_annotation(&self, page: RawHandle, annotation: RawHandle) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "delete_annotation")?;
        if let Some(list) = st.annotations.get_mut(&page) {
            list.retain(|a| *a != annotation);
        }
        Ok(())
    }

    fn update_page(&self, page: RawHandle) -> NativeResult<bool> {
        Self::enter(&mut self.lock(), "update_page")?;
        Ok(true)
    }

    fn redact_page(&self, page: RawHandle, black_boxes: bool, image_method: i32) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "redact_page")
    }

    fn update_annotation(&self, annotation: RawHandle) -> NativeResult<bool> {
        Self::enter(&mut self.lock(), "update_annotation")?;
        Ok(true)
    }

    fn bound_annotation(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "bound_annotation")?;
        Ok(out_rect(&mut st, [0.0, 0.0, 50.0, 50.0]))
    }

    fn run_annotation(
        &self,
        annotation: RawHandle,
        device: RawHandle,
        ctm: Address,
    ) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "run_annotation")
    }

    fn pixmap_from_annotation(
        &self,
        annotation: RawHandle,
        ctm: Address,
        colorspace: RawHandle,
        alpha: bool,
    ) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "pixmap_from_annotation")?;
        let handle = fresh(&mut st);
        st.pixmaps.insert(handle, (50, 50));
        Ok(handle)
    }

    fn display_list_from_annotation(&self, annotation: RawHandle) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "display_list_from_annotation")?;
        Ok(fresh(&mut st))
    }

    fn annotation_type(&self, annotation: RawHandle) -> NativeResult<i32> {
        Ok(self.lock().annotation_types.get(&annotation).copied().unwrap_or(0))
    }

    fn annotation_flags(&self, annotation: RawHandle) -> NativeResult<u32> {
        Ok(self.lock().annotation_flags.get(&annotation).copied().unwrap_or(0))
    }

    fn set_annotation_flags(&self, annotation: RawHandle, flags: u32) -> NativeResult<()> {
        self.lock().annotation_flags.insert(annotation, flags);
        Ok(())
    }

    fn annotation_contents(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "annotation_contents")?;
        let text = st.annotation_contents.get(&annotation).cloned().unwrap_or_default();
        Ok(alloc_cstring(&mut st, &text))
    }

    fn set_annotation_contents(&self, annotation: RawHandle, text: Address) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "set_annotation_contents")?;
        let text = cstring_at(&st, text);
        st.annotation_contents.insert(annotation, text);
        Ok(())
    }

    fn annotation_has_author(&self, annotation: RawHandle) -> NativeResult<bool> {
        Ok(self.lock().annotation_authors.contains_key(&annotation))
    }

    fn annotation_author(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "annotation_author")?;
        let name = st.annotation_authors.get(&annotation).cloned().unwrap_or_default();
        Ok(alloc_cstring(&mut st, &name))
    }

    fn set_annotation_author(&self, annotation: RawHandle, name: Address) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "set_annotation_author")?;
        let name = cstring_at(&st, name);
        st.annotation_authors.insert(annotation, name);
        Ok(())
    }

    fn annotation_opacity(&self, annotation: RawHandle) -> NativeResult<f32> {
        Ok(self.lock().annotation_opacity.get(&annotation).copied().unwrap_or(1.0))
    }

    fn set_annotation_opacity(&self, annotation: RawHandle, opacity: f32) -> NativeResult<()> {
        self.lock().annotation_opacity.insert(annotation, opacity);
        Ok(())
    }

    fn annotation_has_rect(&self, annotation: RawHandle) -> NativeResult<bool> {
        Ok(true)
    }

    fn annotation_rect(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "annotation_rect")?;
        let rect = st.annotation_rects.get(&annotation).copied().unwrap_or([0.0; 4]);
        Ok(out_rect(&mut st, rect))
    }

    fn set_annotation_rect(&self, annotation: RawHandle, rect: Address) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "set_annotation_rect")?;
        let at = rect as usize;
        let mut values = [0.0f32; 4];
        for (i, value) in values.iter_mut().enumerate() {
            *value = f32::from_le_bytes(st.memory[at + i * 4..at + i * 4 + 4].try_into().unwrap());
        }
        st.annotation_rects.insert(annotation, values);
        Ok(())
    }

    fn annotation_has_open(&self, annotation: RawHandle) -> NativeResult<bool> {
        Ok(true)
    }

    fn annotation_is_open(&self, annotation: RawHandle) -> NativeResult<bool> {
        Ok(self.lock().annotation_open.get(&annotation).copied().unwrap_or(false))
    }

    fn set_annotation_is_open(&self, annotation: RawHandle, open: bool) -> NativeResult<()> {
        self.lock().annotation_open.insert(annotation, open);
        Ok(())
    }

    fn annotation_has_icon_name(&self, annotation: RawHandle) -> NativeResult<bool> {
        Ok(self.lock().annotation_icons.contains_key(&annotation))
    }

    fn annotation_icon_name(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        let name = st.annotation_icons.get(&annotation).cloned().unwrap_or_default();
        Ok(alloc_cstring(&mut st, &name))
    }

    fn set_annotation_icon_name(&self, annotation: RawHandle, name: Address) -> NativeResult<()> {
        let mut st = self.lock();
        let name = cstring_at(&st, name);
        st.annotation_icons.insert(annotation, name);
        Ok(())
    }

    fn annotation_border_width(&self, annotation: RawHandle) -> NativeResult<f32> {
        Ok(self.lock().annotation_borders.get(&annotation).copied().unwrap_or(0.0))
    }

    fn set_annotation_border_width(&self, annotation: RawHandle, width: f32) -> NativeResult<()> {
        self.lock().annotation_borders.insert(annotation, width);
        Ok(())
    }

    fn annotation_language(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        let lang = st.annotation_languages.get(&annotation).cloned().unwrap_or_default();
        Ok(alloc_cstring(&mut st, &lang))
    }

    fn set_annotation_language(&self, annotation: RawHandle, lang: Address) -> NativeResult<()> {
        let mut st = self.lock();
        let lang = cstring_at(&st, lang);
        st.annotation_languages.insert(annotation, lang);
        Ok(())
    }

    fn annotation_has_line(&self, annotation: RawHandle) -> NativeResult<bool> {
        Ok(self.lock().annotation_lines.contains_key(&annotation))
    }

    fn annotation_line(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        let line = st.annotation_lines.get(&annotation).copied().unwrap_or([0.0; 4]);
        let addr = st.out_point;
        write_f32s(&mut st, addr, &line);
        Ok(addr)
    }

    fn set_annotation_line(
        &self,
        annotation: RawHandle,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
    ) -> NativeResult<()> {
        self.lock().annotation_lines.insert(annotation, [ax, ay, bx, by]);
        Ok(())
    }

    fn annotation_has_vertices(&self, annotation: RawHandle) -> NativeResult<bool> {
        Ok(self.lock().annotation_vertices.contains_key(&annotation))
    }

    fn annotation_vertex_count(&self, annotation: RawHandle) -> NativeResult<i32> {
        Ok(self.lock().annotation_vertices.get(&annotation).map(|v| v.len() as i32).unwrap_or(0))
    }

    fn annotation_vertex(&self, annotation: RawHandle, index: i32) -> NativeResult<Address> {
        let mut st = self.lock();
        let vertex = st
            .annotation_vertices
            .get(&annotation)
            .and_then(|v| v.get(index as usize).copied())
            .unwrap_or((0.0, 0.0));
        let addr = st.out_point;
        write_f32s(&mut st, addr, &[vertex.0, vertex.1]);
        Ok(addr)
    }

    fn add_annotation_vertex(&self, annotation: RawHandle, x: f32, y: f32) -> NativeResult<()> {
        self.lock().annotation_vertices.entry(annotation).or_default().push((x, y));
        Ok(())
    }

    fn set_annotation_vertex(
        &self,
        annotation: RawHandle,
        index: i32,
        x: f32,
        y: f32,
    ) -> NativeResult<()> {
        let mut st = self.lock();
        if let Some(vertices) = st.annotation_vertices.get_mut(&annotation) {
            if let Some(vertex) = vertices.get_mut(index as usize) {
                *vertex = (x, y);
            }
        }
        Ok(())
    }

    fn clear_annotation_vertices(&self, annotation: RawHandle) -> NativeResult<()> {
        self.lock().annotation_vertices.remove(&annotation);
        Ok(())
    }

    fn annotation_creation_date(&self, annotation: RawHandle) -> NativeResult<i64> {
        Ok(self.lock().annotation_dates.get(&annotation).map(|d| d.0).unwrap_or(0))
    }

    fn set_annotation_creation_date(&self, annotation: RawHandle, seconds: i64) -> NativeResult<()> {
        let mut st = self.lock();
        let entry = st.annotation_dates.entry(annotation).or_insert((0, 0));
        entry.0 = seconds;
        Ok(())
    }

    fn annotation_modification_date(&self, annotation: RawHandle) -> NativeResult<i64> {
        Ok(self.lock().annotation_dates.get(&annotation).map(|d| d.1).unwrap_or(0))
    }

    fn set_annotation_modification_date(
        &self,
        annotation: RawHandle,
        seconds: i64,
    ) -> NativeResult<()> {
        let mut st = self.lock();
        let entry = st.annotation_dates.entry(annotation).or_insert((0, 0));
        entry.1 = seconds;
        Ok(())
    }

    fn annotation_popup(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Ok(out_rect(&mut st, [0.0, 0.0, 20.0, 20.0]))
    }

    fn set_annotation_popup(&self, annotation: RawHandle, rect: Address) -> NativeResult<()> {
        Self::enter(&mut self.lock(), "set_annotation_popup")
    }

    // --- widgets ---

    fn widget_field_type(&self, annotation: RawHandle) -> NativeResult<i32> {
        Ok(self.lock().widget_field_types.get(&annotation).copied().unwrap_or(0))
    }

    fn widget_field_flags(&self, annotation: RawHandle) -> NativeResult<u32> {
        Ok(0)
    }

    fn widget_field_value(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "widget_field_value")?;
        Ok(alloc_cstring(&mut st, "value"))
    }

    fn widget_field_label(&self, annotation: RawHandle) -> NativeResult<Address> {
        let mut st = self.lock();
        Self::enter(&mut st, "widget_field_label")?;
        Ok(alloc_cstring(&mut st, "label"))
    }

    // --- progressive streams ---

    fn open_stream_from_url(
        &self,
        url: Address,
        content_length: u64,
        block_size: u32,
        prefetch: bool,
    ) -> NativeResult<RawHandle> {
        let (handle, id, url) = {
            let mut st = self.lock();
            Self::enter(&mut st, "open_stream_from_url")?;
            let url = cstring_at(&st, url);
            st.next_stream_id += 1;
            let id = st.next_stream_id;
            let handle = fresh(&mut st);
            st.streams.insert(handle, id);
            (handle, id, url)
        };
        if let Some(hooks) = self.hooks() {
            hooks.open(id, &url, content_length, block_size.trailing_zeros(), prefetch);
        }
        Ok(handle)
    }

    fn stream_fetch_id(&self, stream: RawHandle) -> NativeResult<StreamId> {
        self.lock()
            .streams
            .get(&stream)
            .copied()
            .ok_or_else(|| NativeError::Failed("unknown stream".to_string()))
    }

    // --- cookies ---

    fn new_cookie(&self) -> NativeResult<RawHandle> {
        let mut st = self.lock();
        Self::enter(&mut st, "new_cookie")?;
        let handle = fresh(&mut st);
        st.cookies.insert(handle, (false, 0));
        Ok(handle)
    }

    fn cookie_abort(&self, cookie: RawHandle) -> NativeResult<()> {
        let mut st = self.lock();
        Self::enter(&mut st, "cookie_abort")?;
        if let Some(entry) = st.cookies.get_mut(&cookie) {
            entry.0 = true;
        }
        Ok(())
    }

    fn cookie_progress(&self, cookie: RawHandle) -> NativeResult<i32> {
        Ok(self.lock().cookies.get(&cookie).map(|c| c.1).unwrap_or(0))
    }
}
