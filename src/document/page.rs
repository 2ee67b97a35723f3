//! Pages: rendering, text search, links, and the annotation cache.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::{VellumError, VellumResult};
use crate::core::geometry::{Matrix, Quad, Rect};
use crate::core::handle::OwnedHandle;
use crate::core::marshal::{read_quad, read_rect, read_string};
use crate::core::runtime::Context;
use crate::document::annotation::{Annotation, AnnotationType, Widget};
use crate::document::link::Link;
use crate::resources::colorspace::ColorSpace;
use crate::resources::cookie::Cookie;
use crate::resources::device::Device;
use crate::resources::display_list::DisplayList;
use crate::resources::pixmap::Pixmap;
use crate::resources::structured_text::StructuredText;
use std::sync::Arc;

/// How redaction treats images overlapping a redacted region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactImageMethod {
    /// Leave images untouched.
    None,
    /// Remove overlapping images entirely.
    Remove,
    /// Blank out only the overlapping pixels.
    Pixels,
}

impl RedactImageMethod {
    fn as_native(self) -> i32 {
        match self {
            RedactImageMethod::None => 0,
            RedactImageMethod::Remove => 1,
            RedactImageMethod::Pixels => 2,
        }
    }
}

enum PageForm {
    Generic,
    Structured {
        /// Lazily loaded, memoized annotation list. Create/delete mutate
        /// it in place so it never needs a reload.
        annotations: Option<Vec<Annotation>>,
    },
}

/// One page of an open document.
pub struct Page {
    handle: OwnedHandle,
    form: PageForm,
}

impl Page {
    /// Wraps a freshly loaded page handle, probing it for the structured
    /// capability.
    pub(crate) fn from_raw(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Page> {
        let handle = OwnedHandle::new(ctx, HandleKind::Page, raw)?;
        let structured = handle.ctx().engine().structured_page_handle(handle.get()?)? != 0;
        let form = if structured {
            PageForm::Structured { annotations: None }
        } else {
            PageForm::Generic
        };
        Ok(Page { handle, form })
    }

    fn engine(&self) -> &dyn NativeEngine {
        self.handle.ctx().engine()
    }

    fn ctx(&self) -> &Arc<Context> {
        self.handle.ctx()
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.form, PageForm::Structured { .. })
    }

    pub fn close(&self) {
        self.handle.close()
    }

    pub fn bounds(&self) -> VellumResult<Rect> {
        let engine = self.engine();
        let addr = engine.bound_page(self.handle.get()?)?;
        Ok(read_rect(engine, addr))
    }

    /// The page's display label ("iv", "7", ...).
    pub fn label(&self) -> VellumResult<String> {
        let engine = self.engine();
        let addr = engine.page_label(self.handle.get()?)?;
        Ok(read_string(engine, addr))
    }

    /// Runs the full page (contents and annotations) through a device.
    pub fn run(&self, device: &Device, ctm: &Matrix, cookie: Option<&Cookie>) -> VellumResult<()> {
        let (raw, dev, ctm_ptr, cookie_raw) = self.run_args(device, ctm, cookie)?;
        Ok(self.engine().run_page(raw, dev, ctm_ptr, cookie_raw)?)
    }

    /// Runs only the page contents, skipping annotations and widgets.
    pub fn run_contents(
        &self,
        device: &Device,
        ctm: &Matrix,
        cookie: Option<&Cookie>,
    ) -> VellumResult<()> {
        let (raw, dev, ctm_ptr, cookie_raw) = self.run_args(device, ctm, cookie)?;
        Ok(self.engine().run_page_contents(raw, dev, ctm_ptr, cookie_raw)?)
    }

    /// Runs only the annotation appearance streams.
    pub fn run_annotations(
        &self,
        device: &Device,
        ctm: &Matrix,
        cookie: Option<&Cookie>,
    ) -> VellumResult<()> {
        let (raw, dev, ctm_ptr, cookie_raw) = self.run_args(device, ctm, cookie)?;
        Ok(self.engine().run_page_annotations(raw, dev, ctm_ptr, cookie_raw)?)
    }

    /// Runs only the form widget appearance streams.
    pub fn run_widgets(
        &self,
        device: &Device,
        ctm: &Matrix,
        cookie: Option<&Cookie>,
    ) -> VellumResult<()> {
        let (raw, dev, ctm_ptr, cookie_raw) = self.run_args(device, ctm, cookie)?;
        Ok(self.engine().run_page_widgets(raw, dev, ctm_ptr, cookie_raw)?)
    }

    fn run_args(
        &self,
        device: &Device,
        ctm: &Matrix,
        cookie: Option<&Cookie>,
    ) -> VellumResult<(RawHandle, RawHandle, u32, RawHandle)> {
        let ctx = self.ctx();
        let ctm_ptr = ctx.scratch.matrix(ctx.engine(), ctm);
        let cookie_raw = match cookie {
            Some(cookie) => cookie.handle().get()?,
            None => 0,
        };
        Ok((self.handle.get()?, device.handle().get()?, ctm_ptr, cookie_raw))
    }

    /// Rasterizes the page into a new pixmap. `show_extras` includes
    /// annotations and widgets.
    pub fn to_pixmap(
        &self,
        ctm: &Matrix,
        colorspace: &ColorSpace,
        alpha: bool,
        show_extras: bool,
    ) -> VellumResult<Pixmap> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        let raw = engine.pixmap_from_page(
            self.handle.get()?,
            ctm_ptr,
            colorspace.handle().get()?,
            alpha,
            show_extras,
        )?;
        Pixmap::own(ctx.clone(), raw)
    }

    /// Records the page into a display list.
    pub fn to_display_list(&self, show_extras: bool) -> VellumResult<DisplayList> {
        let raw = self
            .engine()
            .display_list_from_page(self.handle.get()?, show_extras)?;
        DisplayList::own(self.ctx().clone(), raw)
    }

    /// Extracts the page text.
    pub fn to_structured_text(&self) -> VellumResult<StructuredText> {
        let raw = self.engine().stext_from_page(self.handle.get()?)?;
        StructuredText::own(self.ctx().clone(), raw)
    }

    /// The page's links. The engine owns the list; every node is adopted
    /// before wrapping and the list head is released after iteration.
    pub fn links(&self) -> VellumResult<Vec<Link>> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let head = engine.load_links(self.handle.get()?)?;
        if head == 0 {
            return Ok(Vec::new());
        }
        let head = OwnedHandle::new(ctx.clone(), HandleKind::Link, head)?;
        let mut links = Vec::new();
        let mut node = head.get()?;
        while node != 0 {
            links.push(Link::adopt(ctx.clone(), node)?);
            node = engine.link_next(node)?;
        }
        Ok(links)
    }

    /// Adds a link over `bbox` pointing at `uri` (structured pages only).
    pub fn create_link(&self, bbox: &Rect, uri: &str) -> VellumResult<Link> {
        self.require_structured("create_link")?;
        let ctx = self.ctx();
        let engine = ctx.engine();
        let bbox_ptr = ctx.scratch.rect(engine, bbox);
        let uri_ptr = ctx.scratch.string(engine, uri)?;
        let raw = engine.create_link(self.handle.get()?, bbox_ptr, uri_ptr)?;
        Link::own(ctx.clone(), raw)
    }

    /// Searches the page text for `needle`. Hits are grouped so that a
    /// match spanning a line wrap comes back as one group of several
    /// quads.
    pub fn search(&self, needle: &str, max_hits: usize) -> VellumResult<Vec<Vec<Quad>>> {
        if max_hits == 0 {
            return Ok(Vec::new());
        }
        let ctx = self.ctx();
        let engine = ctx.engine();
        let hits = engine.malloc(32 * max_hits)?;
        let marks = match engine.malloc(4 * max_hits) {
            Ok(addr) => addr,
            Err(err) => {
                engine.free(hits);
                return Err(err.into());
            }
        };

        let result = (|| -> VellumResult<Vec<Vec<Quad>>> {
            let needle_ptr = ctx.scratch.string(engine, needle)?;
            let count = engine.search_page(
                self.handle.get()?,
                needle_ptr,
                marks,
                hits,
                max_hits as u32,
            )?;

            let mut outer = Vec::new();
            if count > 0 {
                let mut inner = Vec::new();
                for i in 0..count as usize {
                    let mark = engine.read_i32(marks + (i * 4) as u32);
                    let quad = read_quad(engine, hits + (i * 32) as u32);
                    if i > 0 && mark != 0 {
                        outer.push(std::mem::take(&mut inner));
                    }
                    inner.push(quad);
                }
                outer.push(inner);
            }
            Ok(outer)
        })();

        engine.free(marks);
        engine.free(hits);
        result
    }

    /// The page's annotations (structured pages only). Loaded once and
    /// memoized; [`Page::create_annotation`] and
    /// [`Page::delete_annotation`] keep the cache consistent in place.
    pub fn annotations(&mut self) -> VellumResult<Vec<Annotation>> {
        let raw = self.handle.get()?;
        let ctx = self.handle.ctx().clone();
        let PageForm::Structured { annotations } = &mut self.form else {
            return Err(VellumError::NotStructured("annotations"));
        };
        if let Some(list) = annotations {
            return Ok(list.clone());
        }
        let engine = ctx.engine();
        let mut list = Vec::new();
        let mut node = engine.first_annotation(raw)?;
        while node != 0 {
            list.push(Annotation::adopt(ctx.clone(), node)?);
            node = engine.next_annotation(node)?;
        }
        *annotations = Some(list.clone());
        Ok(list)
    }

    /// Creates an annotation of the given type and appends it to the
    /// cached list.
    pub fn create_annotation(&mut self, kind: AnnotationType) -> VellumResult<Annotation> {
        let raw = self.handle.get()?;
        let ctx = self.handle.ctx().clone();
        let PageForm::Structured { annotations } = &mut self.form else {
            return Err(VellumError::NotStructured("create_annotation"));
        };
        let engine = ctx.engine();
        let annot_raw = engine.create_annotation(raw, kind.as_native())?;
        let annotation = Annotation::own(ctx.clone(), annot_raw)?;
        if let Some(list) = annotations {
            list.push(annotation.clone());
        }
        Ok(annotation)
    }

    /// Deletes an annotation and removes it from the cached list.
    pub fn delete_annotation(&mut self, annotation: &Annotation) -> VellumResult<()> {
        let raw = self.handle.get()?;
        let PageForm::Structured { annotations } = &mut self.form else {
            return Err(VellumError::NotStructured("delete_annotation"));
        };
        self.handle
            .ctx()
            .engine()
            .delete_annotation(raw, annotation.raw()?)?;
        if let Some(list) = annotations {
            list.retain(|cached| !cached.same_as(annotation));
        }
        Ok(())
    }

    /// The page's form widgets (structured pages only). Not cached.
    pub fn widgets(&self) -> VellumResult<Vec<Widget>> {
        self.require_structured("widgets")?;
        let ctx = self.ctx();
        let engine = ctx.engine();
        let mut widgets = Vec::new();
        let mut node = engine.first_widget(self.handle.get()?)?;
        while node != 0 {
            widgets.push(Widget::adopt(ctx.clone(), node)?);
            node = engine.next_widget(node)?;
        }
        Ok(widgets)
    }

    /// Regenerates appearance streams after edits. Returns true when
    /// anything changed.
    pub fn update(&self) -> VellumResult<bool> {
        self.require_structured("update")?;
        Ok(self.engine().update_page(self.handle.get()?)?)
    }

    /// Applies all redaction annotations on the page, permanently
    /// removing the content under them.
    pub fn apply_redactions(
        &self,
        black_boxes: bool,
        image_method: RedactImageMethod,
    ) -> VellumResult<()> {
        self.require_structured("apply_redactions")?;
        Ok(self
            .engine()
            .redact_page(self.handle.get()?, black_boxes, image_method.as_native())?)
    }

    fn require_structured(&self, op: &'static str) -> VellumResult<()> {
        match self.form {
            PageForm::Structured { .. } => Ok(()),
            PageForm::Generic => Err(VellumError::NotStructured(op)),
        }
    }
}
