//! Document graph tests: capability probing, metadata, the annotation
//! cache, search grouping, links and outlines.

use vellum::{
    AnnotationType, Document, Matrix, Permission, RedactImageMethod, Runtime, TestEngine,
    TestOutline, VellumError, WidgetFieldType,
};

fn structured_engine() -> TestEngine {
    let engine = TestEngine::new();
    engine.set_structured_documents(true);
    engine.set_structured_pages(true);
    engine.set_page_count(1);
    engine
}

fn open(runtime: &Runtime) -> Document {
    runtime
        .open_document(&b"%doc"[..], "application/pdf")
        .unwrap()
}

#[test]
fn test_document_kind_probed_from_engine() {
    let generic = TestEngine::new();
    generic.set_page_count(1);
    let runtime = Runtime::initialize(generic.clone()).unwrap();
    let document = open(&runtime);
    assert!(!document.is_structured());
    let mut page = document.load_page(0).unwrap();
    assert!(!page.is_structured());
    assert!(matches!(
        page.annotations(),
        Err(VellumError::NotStructured("annotations"))
    ));
    assert!(matches!(
        page.create_annotation(AnnotationType::Ink),
        Err(VellumError::NotStructured(_))
    ));

    let structured = structured_engine();
    let runtime = Runtime::initialize(structured.clone()).unwrap();
    let document = open(&runtime);
    assert!(document.is_structured());
    assert!(document.load_page(0).unwrap().is_structured());
}

#[test]
fn test_created_document_is_structured() {
    let engine = TestEngine::new();
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    assert!(runtime.create_document().unwrap().is_structured());
}

#[test]
fn test_progressive_open_surfaces_not_ready() {
    let engine = TestEngine::new();
    engine.script_try_later("open_document_with_buffer");
    let runtime = Runtime::initialize(engine.clone()).unwrap();

    // Not-yet-fetched bytes are a retryable condition, distinguishable
    // from a hard open failure.
    let err = runtime
        .open_document(&b"%doc"[..], "application/pdf")
        .unwrap_err();
    assert!(matches!(err, VellumError::NotReady));
}

#[test]
fn test_probe_failure_releases_document_handle() {
    let engine = TestEngine::new();
    engine.script_failure("structured_document_handle");
    let runtime = Runtime::initialize(engine.clone()).unwrap();

    let err = runtime
        .open_document(&b"%doc"[..], "application/pdf")
        .unwrap_err();
    assert!(matches!(err, VellumError::Native(_)));

    // The document handle existed before the probe failed; it must still
    // be released exactly once.
    let raw = engine.last_handle();
    assert_eq!(engine.drop_count(raw), 1);
}

#[test]
fn test_metadata_roundtrip() {
    let engine = TestEngine::new();
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);

    assert_eq!(document.metadata(Document::META_INFO_TITLE).unwrap(), None);
    document
        .set_metadata(Document::META_INFO_TITLE, "Annual Report")
        .unwrap();
    assert_eq!(
        document.metadata(Document::META_INFO_TITLE).unwrap(),
        Some("Annual Report".to_string())
    );
}

#[test]
fn test_password_authentication() {
    let engine = TestEngine::new();
    engine.set_password("secret");
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);

    assert!(document.needs_password().unwrap());
    assert!(!document.authenticate_password("wrong").unwrap());
    assert!(document.authenticate_password("secret").unwrap());
}

#[test]
fn test_permission_flags() {
    let engine = TestEngine::new();
    engine.set_permissions(&['p' as i32, 'c' as i32]);
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);

    assert!(document.has_permission(Permission::Print).unwrap());
    assert!(document.has_permission(Permission::Copy).unwrap());
    assert!(!document.has_permission(Permission::Edit).unwrap());
    assert!(!document.has_permission(Permission::Annotate).unwrap());
}

#[test]
fn test_annotation_cache_is_loaded_once_and_mutated_in_place() {
    let engine = structured_engine();
    engine.set_initial_annotations(&[0, 8]); // Text, Highlight
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);
    let mut page = document.load_page(0).unwrap();

    let annotations = page.annotations().unwrap();
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations[0].annotation_type().unwrap(), AnnotationType::Text);
    assert_eq!(annotations[1].annotation_type().unwrap(), AnnotationType::Highlight);
    assert_eq!(engine.call_count("first_annotation"), 1);

    // Memoized: a second call does not reload from the engine.
    assert_eq!(page.annotations().unwrap().len(), 2);
    assert_eq!(engine.call_count("first_annotation"), 1);

    // Creating appends to the cache without a reload.
    let created = page.create_annotation(AnnotationType::Ink).unwrap();
    let annotations = page.annotations().unwrap();
    assert_eq!(annotations.len(), 3);
    assert_eq!(annotations[2].annotation_type().unwrap(), AnnotationType::Ink);
    assert_eq!(engine.call_count("first_annotation"), 1);

    // Deleting removes from the cache without a reload.
    page.delete_annotation(&created).unwrap();
    let annotations = page.annotations().unwrap();
    assert_eq!(annotations.len(), 2);
    assert!(annotations
        .iter()
        .all(|a| a.annotation_type().unwrap() != AnnotationType::Ink));
    assert_eq!(engine.call_count("first_annotation"), 1);
    assert_eq!(engine.call_count("delete_annotation"), 1);
}

#[test]
fn test_annotation_properties_roundtrip() {
    let engine = structured_engine();
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);
    let mut page = document.load_page(0).unwrap();
    let annotation = page.create_annotation(AnnotationType::FreeText).unwrap();

    annotation.set_contents("needs review").unwrap();
    assert_eq!(annotation.contents().unwrap(), "needs review");

    assert!(!annotation.has_author().unwrap());
    annotation.set_author("ada").unwrap();
    assert!(annotation.has_author().unwrap());
    assert_eq!(annotation.author().unwrap(), "ada");

    annotation.set_flags(vellum::Annotation::FLAG_PRINT).unwrap();
    assert_eq!(annotation.flags().unwrap(), vellum::Annotation::FLAG_PRINT);

    annotation.set_opacity(0.25).unwrap();
    assert_eq!(annotation.opacity().unwrap(), 0.25);

    let rect = vellum::Rect::new(1.0, 2.0, 3.0, 4.0);
    annotation.set_rect(&rect).unwrap();
    assert_eq!(annotation.rect().unwrap(), rect);

    annotation.set_is_open(true).unwrap();
    assert!(annotation.is_open().unwrap());

    assert!(!annotation.has_line().unwrap());
    annotation
        .set_line(vellum::Point::new(0.0, 0.0), vellum::Point::new(5.0, 5.0))
        .unwrap();
    assert!(annotation.has_line().unwrap());
    let (a, b) = annotation.line().unwrap();
    assert_eq!(a, vellum::Point::new(0.0, 0.0));
    assert_eq!(b, vellum::Point::new(5.0, 5.0));

    annotation.add_vertex(vellum::Point::new(1.0, 1.0)).unwrap();
    annotation.add_vertex(vellum::Point::new(2.0, 2.0)).unwrap();
    assert_eq!(annotation.vertex_count().unwrap(), 2);
    assert_eq!(annotation.vertex(1).unwrap(), vellum::Point::new(2.0, 2.0));
    annotation.clear_vertices().unwrap();
    assert_eq!(annotation.vertex_count().unwrap(), 0);

    annotation.set_creation_date(1_700_000_000).unwrap();
    assert_eq!(annotation.creation_date().unwrap(), 1_700_000_000);

    assert!(annotation.update().unwrap());
}

#[test]
fn test_widgets_listed_with_field_types() {
    let engine = structured_engine();
    engine.set_widget_field_types(&[7, 2]); // text field, checkbox
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);
    let page = document.load_page(0).unwrap();

    let widgets = page.widgets().unwrap();
    assert_eq!(widgets.len(), 2);
    assert_eq!(widgets[0].field_type().unwrap(), WidgetFieldType::Text);
    assert_eq!(widgets[1].field_type().unwrap(), WidgetFieldType::Checkbox);
    assert_eq!(widgets[0].field_value().unwrap(), "value");
    assert_eq!(widgets[0].field_label().unwrap(), "label");
    assert_eq!(
        widgets[0].annotation().annotation_type().unwrap(),
        AnnotationType::Widget
    );
}

#[test]
fn test_search_groups_hits_by_marks() {
    let engine = structured_engine();
    let quad = |x: f32| [x, 0.0, x + 5.0, 0.0, x, 10.0, x + 5.0, 10.0];
    engine.set_search_results(vec![quad(0.0), quad(10.0), quad(20.0)], vec![0, 0, 1]);
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);
    let page = document.load_page(0).unwrap();

    // A mark at position i starts a new group: [q0, q1] then [q2].
    let groups = page.search("needle", 16).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(groups[1].len(), 1);
    assert_eq!(groups[0][1].ul.x, 10.0);
    assert_eq!(groups[1][0].ul.x, 20.0);
}

#[test]
fn test_search_frees_scratch_arrays() {
    let engine = structured_engine();
    engine.set_search_results(vec![[0.0; 8]], vec![0]);
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);
    let page = document.load_page(0).unwrap();

    let before = engine.freed_addresses().len();
    page.search("needle", 8).unwrap();
    assert!(engine.freed_addresses().len() >= before + 2);

    // The hit and mark arrays are freed on the failure path too.
    engine.script_failure("search_page");
    let before = engine.freed_addresses().len();
    assert!(page.search("needle", 8).is_err());
    assert!(engine.freed_addresses().len() >= before + 2);
}

#[test]
fn test_search_with_no_hits_or_budget() {
    let engine = structured_engine();
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);
    let page = document.load_page(0).unwrap();

    assert!(page.search("missing", 8).unwrap().is_empty());

    // A zero hit budget never reaches the engine.
    let before = engine.call_count("search_page");
    assert!(page.search("missing", 0).unwrap().is_empty());
    assert_eq!(engine.call_count("search_page"), before);
}

#[test]
fn test_links_adopt_and_release_cleanly() {
    let engine = structured_engine();
    engine.set_link_uris(&["https://example.com/next.pdf", "#page=2"]);
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);
    let page = document.load_page(0).unwrap();

    let baseline = engine.live_handles();
    let links = page.links().unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].uri().unwrap(), "https://example.com/next.pdf");
    assert!(links[0].is_external().unwrap());
    assert!(!links[1].is_external().unwrap());
    assert!(links[0].bounds().unwrap().is_valid());

    // Every node was adopted and the list head released; dropping the
    // wrappers leaves the engine-side refcounts where they started.
    drop(links);
    assert_eq!(engine.live_handles(), baseline);
}

#[test]
fn test_outline_tree_is_collected_and_released() {
    let engine = TestEngine::new();
    engine.set_page_count(10);
    engine.set_outline(vec![
        TestOutline {
            title: "Chapter 1".to_string(),
            uri: String::new(),
            page: 0,
            children: vec![TestOutline {
                title: "Section 1.1".to_string(),
                uri: String::new(),
                page: 2,
                children: Vec::new(),
            }],
        },
        TestOutline {
            title: "Chapter 2".to_string(),
            uri: "https://example.com".to_string(),
            page: 5,
            children: Vec::new(),
        },
    ]);
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);

    let outline = document.outline().unwrap().unwrap();
    assert_eq!(outline.len(), 2);
    assert_eq!(outline[0].title.as_deref(), Some("Chapter 1"));
    assert_eq!(outline[0].uri, None);
    assert_eq!(outline[0].page, Some(0));
    assert_eq!(outline[0].children.len(), 1);
    assert_eq!(outline[0].children[0].title.as_deref(), Some("Section 1.1"));
    assert_eq!(outline[0].children[0].page, Some(2));
    assert_eq!(outline[1].uri.as_deref(), Some("https://example.com"));

    // The traversal released the outline root.
    assert!(engine
        .drop_log()
        .iter()
        .any(|(kind, _)| *kind == vellum::HandleKind::Outline));
}

#[test]
fn test_document_without_outline() {
    let engine = TestEngine::new();
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    assert!(open(&runtime).outline().unwrap().is_none());
}

#[test]
fn test_resolve_link_to_page_index() {
    let engine = TestEngine::new();
    engine.set_resolved_link("#chapter-3", 7);
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);

    assert_eq!(document.resolve_link("#chapter-3").unwrap(), Some(7));
    assert_eq!(document.resolve_link("#nowhere").unwrap(), None);
}

#[test]
fn test_page_rendering_entry_points() {
    let engine = structured_engine();
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);
    let page = document.load_page(0).unwrap();

    assert_eq!(page.bounds().unwrap(), vellum::Rect::new(0.0, 0.0, 612.0, 792.0));
    assert_eq!(page.label().unwrap(), "1");

    let list = page.to_display_list(true).unwrap();
    let device = runtime.display_list_device(&list).unwrap();
    page.run(&device, &Matrix::IDENTITY, None).unwrap();
    page.run_contents(&device, &Matrix::IDENTITY, None).unwrap();
    page.run_annotations(&device, &Matrix::IDENTITY, None).unwrap();
    page.run_widgets(&device, &Matrix::IDENTITY, None).unwrap();

    let cookie = runtime.new_cookie().unwrap();
    page.run(&device, &Matrix::IDENTITY, Some(&cookie)).unwrap();
    assert_eq!(engine.call_count("run_page"), 1);
    assert_eq!(engine.call_count("run_page(cookie)"), 1);

    let pixmap = page
        .to_pixmap(&Matrix::scale(2.0, 2.0), runtime.device_rgb(), false, false)
        .unwrap();
    assert_eq!(pixmap.width().unwrap(), 612);
    assert_eq!(engine.call_count("pixmap_from_page_contents"), 1);

    let stext = page.to_structured_text().unwrap();
    assert_eq!(stext.as_json(1.0).unwrap(), "{\"blocks\":[]}");
}

#[test]
fn test_structured_page_editing_entry_points() {
    let engine = structured_engine();
    let runtime = Runtime::initialize(engine.clone()).unwrap();
    let document = open(&runtime);
    let page = document.load_page(0).unwrap();

    assert!(page.update().unwrap());
    page.apply_redactions(true, RedactImageMethod::Pixels).unwrap();
    assert_eq!(engine.call_count("redact_page"), 1);

    let link = page
        .create_link(&vellum::Rect::new(0.0, 0.0, 10.0, 10.0), "https://example.com")
        .unwrap();
    assert_eq!(link.uri().unwrap(), "https://example.com");

    // The same calls on a generic page are structured-only.
    let generic = TestEngine::new();
    generic.set_page_count(1);
    let runtime = Runtime::initialize(generic).unwrap();
    let page = open(&runtime).load_page(0).unwrap();
    assert!(matches!(page.update(), Err(VellumError::NotStructured(_))));
    assert!(matches!(
        page.apply_redactions(true, RedactImageMethod::None),
        Err(VellumError::NotStructured(_))
    ));
}
