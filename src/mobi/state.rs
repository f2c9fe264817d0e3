//! Inline and block state threaded through the tree walk.

use crate::dom::NodeId;
use crate::style::{TextAlign, TextIndent};

/// Font family classes the renderer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontFamily {
    #[default]
    Serif,
    SansSerif,
    Monospace,
}

impl FontFamily {
    /// Classify a CSS `font-family` list by substring.
    pub fn classify(family: &str) -> Self {
        if family.contains("monospace") {
            Self::Monospace
        } else if family.contains("sans-serif") {
            Self::SansSerif
        } else {
            Self::Serif
        }
    }
}

/// Inherited inline presentation of one recursion level.
///
/// Every level works on its own copy. Only the inline-visible fields take
/// part in equality; alignment, indentation, offsets and the scratch fields
/// are layout bookkeeping.
#[derive(Debug, Clone)]
pub struct FormatState {
    /// This level already opened its paragraph or container.
    pub rendered: bool,
    /// Accumulated left offset in points.
    pub left: f64,
    pub halign: TextAlign,
    pub indent: TextIndent,
    /// Font ladder rung, 1..=7.
    pub font_rung: u8,
    pub italic: bool,
    pub bold: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub preserve: bool,
    pub family: FontFamily,
    pub bgcolor: String,
    pub fgcolor: String,
    pub href: Option<String>,
    /// Counter handed to `li` children of this level.
    pub list_num: u32,
    /// Attributes copied onto the element this level emits.
    pub attrs: Vec<(&'static str, String)>,
}

impl Default for FormatState {
    fn default() -> Self {
        Self {
            rendered: false,
            left: 0.0,
            halign: TextAlign::Auto,
            indent: TextIndent::default(),
            font_rung: 3,
            italic: false,
            bold: false,
            strikethrough: false,
            underline: false,
            preserve: false,
            family: FontFamily::Serif,
            bgcolor: "transparent".to_string(),
            fgcolor: "black".to_string(),
            href: None,
            list_num: 0,
            attrs: Vec::new(),
        }
    }
}

impl PartialEq for FormatState {
    fn eq(&self, other: &Self) -> bool {
        self.font_rung == other.font_rung
            && self.italic == other.italic
            && self.bold == other.bold
            && self.href == other.href
            && self.preserve == other.preserve
            && self.family == other.family
            && self.bgcolor == other.bgcolor
            && self.fgcolor == other.fgcolor
            && self.strikethrough == other.strikethrough
            && self.underline == other.underline
    }
}

impl FormatState {
    /// Copy for a child level, with the per-node scratch fields reset.
    pub fn descend(&self) -> Self {
        Self {
            rendered: false,
            list_num: 0,
            attrs: Vec::new(),
            ..self.clone()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn has_background(&self) -> bool {
        !self.bgcolor.is_empty() && self.bgcolor != "transparent"
    }
}

/// A container element (list, list item, table part) that is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenContainer {
    /// The element in the output tree.
    pub element: NodeId,
    /// The source element that opened it.
    pub source: NodeId,
}

/// Mutable state of the walk over one content unit.
#[derive(Debug, Clone)]
pub struct BlockState {
    pub body: NodeId,
    pub nested: Vec<OpenContainer>,
    pub para: Option<NodeId>,
    pub inline: Option<NodeId>,
    pub anchor: Option<NodeId>,
    pub vpadding: f64,
    pub vmargin: f64,
    pub page_break: bool,
    /// Format of the last text run written into the current paragraph.
    pub last_format: Option<FormatState>,
    /// Some visible content has been emitted.
    pub content: bool,
    pending_anchors: Vec<String>,
}

impl BlockState {
    pub fn new(body: NodeId) -> Self {
        Self {
            body,
            nested: Vec::new(),
            para: None,
            inline: None,
            anchor: None,
            vpadding: 0.0,
            vmargin: 0.0,
            page_break: false,
            last_format: None,
            content: false,
            pending_anchors: Vec::new(),
        }
    }

    /// Merge a vertical margin into the pending spacing. Adjacent margins
    /// collapse to their maximum.
    pub fn collapse_margin(&mut self, margin: f64) {
        self.vmargin = self.vmargin.max(margin);
    }

    /// Add vertical padding. Padding cannot collapse, so the pending margin
    /// becomes padding first.
    pub fn add_padding(&mut self, padding: f64) {
        if padding > 0.0 {
            self.vpadding += self.vmargin;
            self.vmargin = 0.0;
            self.vpadding += padding;
        }
    }

    /// Pending vertical spacing, reset to zero.
    pub fn take_spacing(&mut self) -> f64 {
        let spacing = self.vpadding + self.vmargin;
        self.vpadding = 0.0;
        self.vmargin = 0.0;
        spacing
    }

    /// Queue an identifier to be emitted as an anchor before the next
    /// content. Each identifier is queued at most once.
    pub fn queue_anchor(&mut self, id: &str) {
        if !id.is_empty() && !self.pending_anchors.iter().any(|pending| pending == id) {
            self.pending_anchors.push(id.to_string());
        }
    }

    pub fn take_anchors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_anchors)
    }

    pub fn has_pending_anchors(&self) -> bool {
        !self.pending_anchors.is_empty()
    }

    /// Innermost open container, if any.
    pub fn container(&self) -> Option<NodeId> {
        self.nested.last().map(|open| open.element)
    }

    /// Close the innermost container if `source` opened it.
    pub fn close_container(&mut self, source: NodeId) {
        if self.nested.last().is_some_and(|open| open.source == source) {
            self.nested.pop();
        }
    }

    /// Forget the current paragraph and its inline run.
    pub fn end_paragraph(&mut self) {
        self.para = None;
        self.last_format = None;
    }
}
