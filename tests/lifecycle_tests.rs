//! Startup, marshaling and resource-lifetime tests against the scripted
//! engine.

use vellum::{Matrix, Rect, Runtime, TestEngine, VellumError};

fn runtime(engine: &TestEngine) -> Runtime {
    Runtime::initialize(engine.clone()).unwrap()
}

#[test]
fn test_initialize_boots_engine_and_adopts_colorspaces() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);

    assert_eq!(engine.boot_calls(), 1);
    assert_eq!(runtime.device_rgb().name().unwrap(), "DeviceRGB");
    assert_eq!(runtime.device_gray().components().unwrap(), 1);
    assert_eq!(runtime.device_cmyk().components().unwrap(), 4);
}

#[test]
fn test_redundant_initialization_is_safe() {
    let engine = TestEngine::new();
    let first = runtime(&engine);
    let second = runtime(&engine);

    // The startup entry point is idempotent: both runtimes work against
    // the same engine state.
    assert_eq!(engine.boot_calls(), 2);
    assert_eq!(first.device_rgb().components().unwrap(), 3);
    assert_eq!(second.device_rgb().components().unwrap(), 3);
}

#[test]
fn test_shared_memory_capability_negotiated() {
    let engine = TestEngine::new();
    engine.set_shared_memory(true);
    assert!(runtime(&engine).capabilities().shared_memory);

    let plain = TestEngine::new();
    assert!(!runtime(&plain).capabilities().shared_memory);
}

#[test]
fn test_color_shape_error_raised_before_native_call() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);
    let pixmap = runtime
        .new_pixmap(runtime.device_rgb(), &Rect::new(0.0, 0.0, 4.0, 4.0), false)
        .unwrap();
    let device = runtime.draw_device(&Matrix::IDENTITY, &pixmap).unwrap();
    let path = runtime.new_path().unwrap();

    let err = device
        .fill_path(&path, false, &Matrix::IDENTITY, runtime.device_rgb(), &[0.0; 5], 1.0)
        .unwrap_err();
    assert!(matches!(err, VellumError::Shape { .. }));
    assert_eq!(engine.call_count("fill_path"), 0);

    device
        .fill_path(&path, false, &Matrix::IDENTITY, runtime.device_rgb(), &[0.0, 0.5, 1.0], 1.0)
        .unwrap();
    assert_eq!(engine.call_count("fill_path"), 1);
}

#[test]
fn test_device_forwards_unbalanced_pop_clip() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);
    let pixmap = runtime
        .new_pixmap(runtime.device_rgb(), &Rect::new(0.0, 0.0, 4.0, 4.0), false)
        .unwrap();
    let device = runtime.draw_device(&Matrix::IDENTITY, &pixmap).unwrap();
    let path = runtime.new_path().unwrap();

    device.clip_path(&path, false, &Matrix::IDENTITY).unwrap();
    device.pop_clip().unwrap();
    // Clip balance is the caller's contract: a second pop is forwarded to
    // the engine verbatim, not rejected host-side.
    device.pop_clip().unwrap();

    assert_eq!(engine.call_count("clip_path"), 1);
    assert_eq!(engine.call_count("pop_clip"), 2);
}

#[test]
fn test_device_group_tile_layer_sequence() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);
    let pixmap = runtime
        .new_pixmap(runtime.device_rgb(), &Rect::new(0.0, 0.0, 8.0, 8.0), true)
        .unwrap();
    let device = runtime.draw_device(&Matrix::IDENTITY, &pixmap).unwrap();
    let area = Rect::new(0.0, 0.0, 8.0, 8.0);

    device
        .begin_group(&area, runtime.device_rgb(), true, false, vellum::BlendMode::Multiply, 0.5)
        .unwrap();
    let tile_id = device
        .begin_tile(&area, &area, 8.0, 8.0, &Matrix::IDENTITY, 0)
        .unwrap();
    device.end_tile().unwrap();
    device.begin_layer("background").unwrap();
    device.end_layer().unwrap();
    device.end_group().unwrap();
    device.finish().unwrap();

    assert_eq!(tile_id, 1);
    for op in ["begin_group", "begin_tile", "end_tile", "begin_layer", "end_layer", "end_group", "close_device"] {
        assert_eq!(engine.call_count(op), 1, "missing {}", op);
    }
}

#[test]
fn test_buffer_roundtrip() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);

    let buffer = runtime.buffer_from_bytes(b"hello").unwrap();
    assert_eq!(buffer.len().unwrap(), 5);
    assert_eq!(buffer.to_bytes().unwrap(), b"hello");
    assert_eq!(buffer.read_byte(1).unwrap(), b'e');
    assert!(matches!(
        buffer.read_byte(9),
        Err(VellumError::OutOfRange { index: 9, len: 5 })
    ));

    buffer.write_line(" world").unwrap();
    assert_eq!(buffer.to_text().unwrap(), "hello world\n");

    let other = runtime.buffer_from_str("!").unwrap();
    buffer.write_buffer(&other).unwrap();
    assert_eq!(buffer.len().unwrap(), 13);
}

#[test]
fn test_pixmap_png_releases_transient_buffer() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);
    let pixmap = runtime
        .new_pixmap(runtime.device_rgb(), &Rect::new(0.0, 0.0, 4.0, 4.0), false)
        .unwrap();

    let png = pixmap.to_png().unwrap();
    assert!(png.starts_with(b"\x89PNG"));

    // The engine-side buffer holding the encoded bytes is released even
    // though only its contents escape.
    let buffer_handle = engine.last_handle();
    assert_eq!(engine.drop_count(buffer_handle), 1);
    assert_eq!(engine.refcount(buffer_handle), 0);
}

#[test]
fn test_pixmap_samples_are_copied_out() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);
    let pixmap = runtime
        .new_pixmap(runtime.device_rgb(), &Rect::new(0.0, 0.0, 4.0, 4.0), false)
        .unwrap();

    assert_eq!(pixmap.width().unwrap(), 4);
    assert_eq!(pixmap.stride().unwrap(), 12);
    let samples = pixmap.samples().unwrap();
    assert_eq!(samples.len(), 48);
    assert!(samples.iter().all(|b| *b == 0xAB));
    assert_eq!(pixmap.bounds().unwrap(), Rect::new(0.0, 0.0, 4.0, 4.0));
}

#[test]
fn test_show_string_advances_text_matrix() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);
    let font = runtime.base14_font("Helvetica").unwrap();
    let text = runtime.new_text().unwrap();

    assert_eq!(font.name().unwrap(), "Helvetica");

    let mut trm = Matrix::new(12.0, 0.0, 0.0, 12.0, 100.0, 200.0);
    text.show_string(&font, &mut trm, "Hi", 0).unwrap();
    assert_eq!(trm.e, 110.0);
    assert_eq!(trm.f, 200.0);
    // The linear part is untouched; only the translation advances.
    assert_eq!(trm.a, 12.0);
}

#[test]
fn test_stroke_state_roundtrip() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);
    let stroke = runtime.new_stroke_state().unwrap();

    assert_eq!(stroke.line_width().unwrap(), 1.0);
    stroke.set_line_width(2.5).unwrap();
    assert_eq!(stroke.line_width().unwrap(), 2.5);
    stroke.set_line_cap(vellum::LineCap::Round).unwrap();
    stroke.set_line_join(vellum::LineJoin::Bevel).unwrap();
    stroke.set_miter_limit(4.0).unwrap();
}

#[test]
fn test_cookie_abort_is_forwarded() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);
    let cookie = runtime.new_cookie().unwrap();

    assert_eq!(cookie.progress().unwrap(), 0);
    cookie.abort().unwrap();
    assert_eq!(engine.call_count("cookie_abort"), 1);
}

#[test]
fn test_remote_stream_block_size_validation() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);

    for bad in [0u32, 1000, 512, 1 << 25] {
        assert!(matches!(
            runtime.open_remote_stream("https://example.com/a.pdf", 4096, bad, false),
            Err(VellumError::InvalidBlockSize(_))
        ));
    }
    assert_eq!(engine.call_count("open_stream_from_url"), 0);

    let stream = runtime
        .open_remote_stream("https://example.com/a.pdf", 4096, 1024, false)
        .unwrap();
    assert!(stream.fetch_id().is_ok());
}

#[test]
fn test_resource_released_exactly_once_through_public_api() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);

    let document = runtime.open_document(&b"%doc"[..], "application/pdf").unwrap();
    let raw = engine.last_handle();

    document.close();
    drop(document);
    assert_eq!(engine.drop_count(raw), 1);
    assert_eq!(engine.refcount(raw), 0);
}

#[test]
fn test_use_after_close_fails_deterministically() {
    let engine = TestEngine::new();
    let runtime = runtime(&engine);

    let document = runtime.open_document(&b"%doc"[..], "application/pdf").unwrap();
    document.close();
    assert!(matches!(
        document.page_count(),
        Err(VellumError::Closed("document"))
    ));
}
