//! Annotations and form widgets.

use crate::core::engine::{HandleKind, NativeEngine, RawHandle};
use crate::core::error::VellumResult;
use crate::core::geometry::{Matrix, Point, Rect};
use crate::core::handle::OwnedHandle;
use crate::core::marshal::{read_point, read_rect, read_string, take_string};
use crate::core::runtime::Context;
use crate::resources::colorspace::ColorSpace;
use crate::resources::device::Device;
use crate::resources::display_list::DisplayList;
use crate::resources::pixmap::Pixmap;
use std::sync::Arc;

/// Annotation type tags. The discriminants match the engine's fixed
/// enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationType {
    Text,
    Link,
    FreeText,
    Line,
    Square,
    Circle,
    Polygon,
    PolyLine,
    Highlight,
    Underline,
    Squiggly,
    StrikeOut,
    Redact,
    Stamp,
    Caret,
    Ink,
    Popup,
    FileAttachment,
    Sound,
    Movie,
    RichMedia,
    Widget,
    Screen,
    PrinterMark,
    TrapNet,
    Watermark,
    Model3D,
    Projection,
    Unknown(i32),
}

impl AnnotationType {
    pub fn from_native(value: i32) -> AnnotationType {
        match value {
            0 => AnnotationType::Text,
            1 => AnnotationType::Link,
            2 => AnnotationType::FreeText,
            3 => AnnotationType::Line,
            4 => AnnotationType::Square,
            5 => AnnotationType::Circle,
            6 => AnnotationType::Polygon,
            7 => AnnotationType::PolyLine,
            8 => AnnotationType::Highlight,
            9 => AnnotationType::Underline,
            10 => AnnotationType::Squiggly,
            11 => AnnotationType::StrikeOut,
            12 => AnnotationType::Redact,
            13 => AnnotationType::Stamp,
            14 => AnnotationType::Caret,
            15 => AnnotationType::Ink,
            16 => AnnotationType::Popup,
            17 => AnnotationType::FileAttachment,
            18 => AnnotationType::Sound,
            19 => AnnotationType::Movie,
            20 => AnnotationType::RichMedia,
            21 => AnnotationType::Widget,
            22 => AnnotationType::Screen,
            23 => AnnotationType::PrinterMark,
            24 => AnnotationType::TrapNet,
            25 => AnnotationType::Watermark,
            26 => AnnotationType::Model3D,
            27 => AnnotationType::Projection,
            other => AnnotationType::Unknown(other),
        }
    }

    pub fn as_native(self) -> i32 {
        match self {
            AnnotationType::Text => 0,
            AnnotationType::Link => 1,
            AnnotationType::FreeText => 2,
            AnnotationType::Line => 3,
            AnnotationType::Square => 4,
            AnnotationType::Circle => 5,
            AnnotationType::Polygon => 6,
            AnnotationType::PolyLine => 7,
            AnnotationType::Highlight => 8,
            AnnotationType::Underline => 9,
            AnnotationType::Squiggly => 10,
            AnnotationType::StrikeOut => 11,
            AnnotationType::Redact => 12,
            AnnotationType::Stamp => 13,
            AnnotationType::Caret => 14,
            AnnotationType::Ink => 15,
            AnnotationType::Popup => 16,
            AnnotationType::FileAttachment => 17,
            AnnotationType::Sound => 18,
            AnnotationType::Movie => 19,
            AnnotationType::RichMedia => 20,
            AnnotationType::Widget => 21,
            AnnotationType::Screen => 22,
            AnnotationType::PrinterMark => 23,
            AnnotationType::TrapNet => 24,
            AnnotationType::Watermark => 25,
            AnnotationType::Model3D => 26,
            AnnotationType::Projection => 27,
            AnnotationType::Unknown(other) => other,
        }
    }
}

/// An annotation on a structured page.
///
/// Clonable: clones share the underlying handle, which is released once
/// when the last clone drops. The page's annotation cache and the values
/// it hands out are such clones of the same wrapper.
#[derive(Clone)]
pub struct Annotation {
    handle: Arc<OwnedHandle>,
}

impl Annotation {
    pub const FLAG_INVISIBLE: u32 = 1 << 0;
    pub const FLAG_HIDDEN: u32 = 1 << 1;
    pub const FLAG_PRINT: u32 = 1 << 2;
    pub const FLAG_NO_ZOOM: u32 = 1 << 3;
    pub const FLAG_NO_ROTATE: u32 = 1 << 4;
    pub const FLAG_NO_VIEW: u32 = 1 << 5;
    pub const FLAG_READ_ONLY: u32 = 1 << 6;
    pub const FLAG_LOCKED: u32 = 1 << 7;
    pub const FLAG_TOGGLE_NO_VIEW: u32 = 1 << 8;
    pub const FLAG_LOCKED_CONTENTS: u32 = 1 << 9;

    /// Wraps an annotation the binding owns (freshly created).
    pub(crate) fn own(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Annotation> {
        Ok(Annotation {
            handle: Arc::new(OwnedHandle::new(ctx, HandleKind::Annotation, raw)?),
        })
    }

    /// Wraps a borrowed annotation from an engine-owned list.
    pub(crate) fn adopt(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Annotation> {
        Ok(Annotation {
            handle: Arc::new(OwnedHandle::adopt(ctx, HandleKind::Annotation, raw)?),
        })
    }

    pub(crate) fn raw(&self) -> VellumResult<RawHandle> {
        self.handle.get()
    }

    /// Identity across clones of the same wrapper.
    pub(crate) fn same_as(&self, other: &Annotation) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }

    fn ctx(&self) -> &Arc<Context> {
        self.handle.ctx()
    }

    fn engine(&self) -> &dyn NativeEngine {
        self.handle.ctx().engine()
    }

    /// Releases the native annotation for every clone of this wrapper.
    pub fn close(&self) {
        self.handle.close()
    }

    pub fn annotation_type(&self) -> VellumResult<AnnotationType> {
        let value = self.engine().annotation_type(self.raw()?)?;
        Ok(AnnotationType::from_native(value))
    }

    pub fn bounds(&self) -> VellumResult<Rect> {
        let engine = self.engine();
        let addr = engine.bound_annotation(self.raw()?)?;
        Ok(read_rect(engine, addr))
    }

    /// Runs the annotation's appearance through a device.
    pub fn run(&self, device: &Device, ctm: &Matrix) -> VellumResult<()> {
        let ctx = self.ctx();
        let ctm_ptr = ctx.scratch.matrix(ctx.engine(), ctm);
        Ok(self
            .engine()
            .run_annotation(self.raw()?, device.handle().get()?, ctm_ptr)?)
    }

    pub fn to_pixmap(
        &self,
        ctm: &Matrix,
        colorspace: &ColorSpace,
        alpha: bool,
    ) -> VellumResult<Pixmap> {
        let ctx = self.ctx();
        let engine = ctx.engine();
        let ctm_ptr = ctx.scratch.matrix(engine, ctm);
        let raw = engine.pixmap_from_annotation(
            self.raw()?,
            ctm_ptr,
            colorspace.handle().get()?,
            alpha,
        )?;
        Pixmap::own(ctx.clone(), raw)
    }

    pub fn to_display_list(&self) -> VellumResult<DisplayList> {
        let raw = self.engine().display_list_from_annotation(self.raw()?)?;
        DisplayList::own(self.ctx().clone(), raw)
    }

    /// Regenerates the appearance stream. Returns true when it changed.
    pub fn update(&self) -> VellumResult<bool> {
        Ok(self.engine().update_annotation(self.raw()?)?)
    }

    pub fn flags(&self) -> VellumResult<u32> {
        Ok(self.engine().annotation_flags(self.raw()?)?)
    }

    pub fn set_flags(&self, flags: u32) -> VellumResult<()> {
        Ok(self.engine().set_annotation_flags(self.raw()?, flags)?)
    }

    pub fn contents(&self) -> VellumResult<String> {
        let engine = self.engine();
        let addr = engine.annotation_contents(self.raw()?)?;
        Ok(take_string(engine, addr))
    }

    pub fn set_contents(&self, text: &str) -> VellumResult<()> {
        let ctx = self.ctx();
        let text_ptr = ctx.scratch.string(ctx.engine(), text)?;
        Ok(self.engine().set_annotation_contents(self.raw()?, text_ptr)?)
    }

    pub fn has_author(&self) -> VellumResult<bool> {
        Ok(self.engine().annotation_has_author(self.raw()?)?)
    }

    pub fn author(&self) -> VellumResult<String> {
        let engine = self.engine();
        let addr = engine.annotation_author(self.raw()?)?;
        Ok(take_string(engine, addr))
    }

    pub fn set_author(&self, name: &str) -> VellumResult<()> {
        let ctx = self.ctx();
        let name_ptr = ctx.scratch.string(ctx.engine(), name)?;
        Ok(self.engine().set_annotation_author(self.raw()?, name_ptr)?)
    }

    pub fn opacity(&self) -> VellumResult<f32> {
        Ok(self.engine().annotation_opacity(self.raw()?)?)
    }

    pub fn set_opacity(&self, opacity: f32) -> VellumResult<()> {
        Ok(self.engine().set_annotation_opacity(self.raw()?, opacity)?)
    }

    pub fn has_rect(&self) -> VellumResult<bool> {
        Ok(self.engine().annotation_has_rect(self.raw()?)?)
    }

    pub fn rect(&self) -> VellumResult<Rect> {
        let engine = self.engine();
        let addr = engine.annotation_rect(self.raw()?)?;
        Ok(read_rect(engine, addr))
    }

    pub fn set_rect(&self, rect: &Rect) -> VellumResult<()> {
        let ctx = self.ctx();
        let rect_ptr = ctx.scratch.rect(ctx.engine(), rect);
        Ok(self.engine().set_annotation_rect(self.raw()?, rect_ptr)?)
    }

    pub fn has_open(&self) -> VellumResult<bool> {
        Ok(self.engine().annotation_has_open(self.raw()?)?)
    }

    pub fn is_open(&self) -> VellumResult<bool> {
        Ok(self.engine().annotation_is_open(self.raw()?)?)
    }

    pub fn set_is_open(&self, open: bool) -> VellumResult<()> {
        Ok(self.engine().set_annotation_is_open(self.raw()?, open)?)
    }

    pub fn has_icon_name(&self) -> VellumResult<bool> {
        Ok(self.engine().annotation_has_icon_name(self.raw()?)?)
    }

    pub fn icon_name(&self) -> VellumResult<String> {
        let engine = self.engine();
        let addr = engine.annotation_icon_name(self.raw()?)?;
        Ok(read_string(engine, addr))
    }

    pub fn set_icon_name(&self, name: &str) -> VellumResult<()> {
        let ctx = self.ctx();
        let name_ptr = ctx.scratch.string(ctx.engine(), name)?;
        Ok(self.engine().set_annotation_icon_name(self.raw()?, name_ptr)?)
    }

    pub fn border_width(&self) -> VellumResult<f32> {
        Ok(self.engine().annotation_border_width(self.raw()?)?)
    }

    pub fn set_border_width(&self, width: f32) -> VellumResult<()> {
        Ok(self.engine().set_annotation_border_width(self.raw()?, width)?)
    }

    pub fn language(&self) -> VellumResult<String> {
        let engine = self.engine();
        let addr = engine.annotation_language(self.raw()?)?;
        Ok(read_string(engine, addr))
    }

    pub fn set_language(&self, lang: &str) -> VellumResult<()> {
        let ctx = self.ctx();
        let lang_ptr = ctx.scratch.string(ctx.engine(), lang)?;
        Ok(self.engine().set_annotation_language(self.raw()?, lang_ptr)?)
    }

    pub fn has_line(&self) -> VellumResult<bool> {
        Ok(self.engine().annotation_has_line(self.raw()?)?)
    }

    /// Endpoints of a line annotation.
    pub fn line(&self) -> VellumResult<(Point, Point)> {
        let engine = self.engine();
        let addr = engine.annotation_line(self.raw()?)?;
        Ok((read_point(engine, addr), read_point(engine, addr + 8)))
    }

    pub fn set_line(&self, a: Point, b: Point) -> VellumResult<()> {
        Ok(self
            .engine()
            .set_annotation_line(self.raw()?, a.x, a.y, b.x, b.y)?)
    }

    pub fn has_vertices(&self) -> VellumResult<bool> {
        Ok(self.engine().annotation_has_vertices(self.raw()?)?)
    }

    pub fn vertex_count(&self) -> VellumResult<u32> {
        Ok(self.engine().annotation_vertex_count(self.raw()?)?.max(0) as u32)
    }

    pub fn vertex(&self, index: u32) -> VellumResult<Point> {
        let engine = self.engine();
        let addr = engine.annotation_vertex(self.raw()?, index as i32)?;
        Ok(read_point(engine, addr))
    }

    pub fn add_vertex(&self, point: Point) -> VellumResult<()> {
        Ok(self.engine().add_annotation_vertex(self.raw()?, point.x, point.y)?)
    }

    pub fn set_vertex(&self, index: u32, point: Point) -> VellumResult<()> {
        Ok(self
            .engine()
            .set_annotation_vertex(self.raw()?, index as i32, point.x, point.y)?)
    }

    pub fn clear_vertices(&self) -> VellumResult<()> {
        Ok(self.engine().clear_annotation_vertices(self.raw()?)?)
    }

    /// Creation time in seconds since the Unix epoch.
    pub fn creation_date(&self) -> VellumResult<i64> {
        Ok(self.engine().annotation_creation_date(self.raw()?)?)
    }

    pub fn set_creation_date(&self, seconds: i64) -> VellumResult<()> {
        Ok(self.engine().set_annotation_creation_date(self.raw()?, seconds)?)
    }

    /// Last modification time in seconds since the Unix epoch.
    pub fn modification_date(&self) -> VellumResult<i64> {
        Ok(self.engine().annotation_modification_date(self.raw()?)?)
    }

    pub fn set_modification_date(&self, seconds: i64) -> VellumResult<()> {
        Ok(self
            .engine()
            .set_annotation_modification_date(self.raw()?, seconds)?)
    }

    pub fn popup(&self) -> VellumResult<Rect> {
        let engine = self.engine();
        let addr = engine.annotation_popup(self.raw()?)?;
        Ok(read_rect(engine, addr))
    }

    pub fn set_popup(&self, rect: &Rect) -> VellumResult<()> {
        let ctx = self.ctx();
        let rect_ptr = ctx.scratch.rect(ctx.engine(), rect);
        Ok(self.engine().set_annotation_popup(self.raw()?, rect_ptr)?)
    }
}

/// Form field types of a widget annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetFieldType {
    Unknown,
    Button,
    Checkbox,
    ComboBox,
    ListBox,
    RadioButton,
    Signature,
    Text,
}

impl WidgetFieldType {
    pub fn from_native(value: i32) -> WidgetFieldType {
        match value {
            1 => WidgetFieldType::Button,
            2 => WidgetFieldType::Checkbox,
            3 => WidgetFieldType::ComboBox,
            4 => WidgetFieldType::ListBox,
            5 => WidgetFieldType::RadioButton,
            6 => WidgetFieldType::Signature,
            7 => WidgetFieldType::Text,
            _ => WidgetFieldType::Unknown,
        }
    }
}

/// A form widget: an annotation carrying an interactive field.
#[derive(Clone)]
pub struct Widget {
    annotation: Annotation,
}

impl Widget {
    pub const FIELD_IS_READ_ONLY: u32 = 1;
    pub const FIELD_IS_REQUIRED: u32 = 1 << 1;
    pub const FIELD_IS_NO_EXPORT: u32 = 1 << 2;
    pub const TX_FIELD_IS_MULTILINE: u32 = 1 << 12;
    pub const TX_FIELD_IS_PASSWORD: u32 = 1 << 13;
    pub const BTN_FIELD_IS_RADIO: u32 = 1 << 15;
    pub const BTN_FIELD_IS_PUSHBUTTON: u32 = 1 << 16;
    pub const CH_FIELD_IS_COMBO: u32 = 1 << 17;
    pub const CH_FIELD_IS_MULTI_SELECT: u32 = 1 << 21;

    pub(crate) fn adopt(ctx: Arc<Context>, raw: RawHandle) -> VellumResult<Widget> {
        Ok(Widget {
            annotation: Annotation::adopt(ctx, raw)?,
        })
    }

    /// The widget as a plain annotation.
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    pub fn field_type(&self) -> VellumResult<WidgetFieldType> {
        let value = self
            .annotation
            .engine()
            .widget_field_type(self.annotation.raw()?)?;
        Ok(WidgetFieldType::from_native(value))
    }

    pub fn field_flags(&self) -> VellumResult<u32> {
        Ok(self
            .annotation
            .engine()
            .widget_field_flags(self.annotation.raw()?)?)
    }

    pub fn field_value(&self) -> VellumResult<String> {
        let engine = self.annotation.engine();
        let addr = engine.widget_field_value(self.annotation.raw()?)?;
        Ok(take_string(engine, addr))
    }

    pub fn field_label(&self) -> VellumResult<String> {
        let engine = self.annotation.engine();
        let addr = engine.widget_field_label(self.annotation.raw()?)?;
        Ok(take_string(engine, addr))
    }
}
