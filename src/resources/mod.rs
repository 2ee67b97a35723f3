//! The typed resource hierarchy.
//!
//! Each concrete type owns one native handle through
//! [`OwnedHandle`](crate::core::handle::OwnedHandle) and exposes the
//! capability-specific operations of that handle kind: arguments are
//! marshaled through the scratch codec, exactly one native entry point runs
//! per operation, and returned handles are wrapped in the matching type.

pub mod buffer;
pub mod colorspace;
pub mod cookie;
pub mod device;
pub mod display_list;
pub mod font;
pub mod image;
pub mod path;
pub mod pixmap;
pub mod stream;
pub mod structured_text;
pub mod text;

pub use buffer::Buffer;
pub use colorspace::{ColorSpace, ColorSpaceType};
pub use cookie::Cookie;
pub use device::{BlendMode, Device, LineCap, LineJoin, StrokeState};
pub use display_list::DisplayList;
pub use font::Font;
pub use image::Image;
pub use path::Path;
pub use pixmap::Pixmap;
pub use stream::RemoteStream;
pub use structured_text::StructuredText;
pub use text::Text;
