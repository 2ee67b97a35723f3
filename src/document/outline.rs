//! Document outlines (bookmark trees).

/// One node of a document outline. Plain values: the engine-side outline
/// is traversed once at load and released.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlineItem {
    /// Display title, if the node has one.
    pub title: Option<String>,
    /// Link target, if the node has one.
    pub uri: Option<String>,
    /// Zero-based page index the node points at, if it resolves to a page.
    pub page: Option<u32>,
    /// Child entries.
    pub children: Vec<OutlineItem>,
}
