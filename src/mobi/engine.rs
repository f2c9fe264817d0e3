//! The recursive walk from styled XHTML to MobiML.
//!
//! [`Transducer::walk`] visits one source element. Inline presentation is
//! inherited through a stack of [`FormatState`] copies, one per level;
//! paragraph and spacing bookkeeping lives in a single [`BlockState`] that
//! siblings share. Output is always written into a fresh tree, never into
//! the source.

use html5ever::ns;

use super::font_ladder::FontLadder;
use super::state::{BlockState, FontFamily, FormatState};
use super::tags::Tag;
use super::ImageResolver;
use crate::dom::{ArenaDom, NodeData, NodeId};
use crate::profile::OutputProfile;
use crate::style::{
    BaselineShift, ComputedStyle, Display, Float, FontStyle, Length, StyleResolver, TextAlign,
};

pub(crate) const NBSP: char = '\u{a0}';
const OPEN_QUOTE: &str = "\u{201c}";
const CLOSE_QUOTE: &str = "\u{201d}";
/// Upper bound on the spaces one inline margin turns into.
const MAX_INLINE_SPACES: u32 = 100;

/// Attributes table tags carry over from the source element.
const TABLE_ATTRS: [&str; 6] = ["rowspan", "colspan", "width", "border", "scope", "bgcolor"];

/// Conversion of one content unit.
pub(crate) struct Transducer<'a> {
    pub(crate) profile: &'a OutputProfile,
    pub(crate) ignore_tables: bool,
    pub(crate) ignore_margins: bool,
    pub(crate) ladder: &'a mut FontLadder,
    pub(crate) source: &'a ArenaDom,
    pub(crate) styles: &'a dyn StyleResolver,
    pub(crate) images: &'a dyn ImageResolver,
    pub(crate) out: ArenaDom,
}

impl<'a> Transducer<'a> {
    /// Convert the source element `elem`.
    ///
    /// Returns text that belongs in front of the element's tail, which the
    /// caller emits along with the tail.
    pub(crate) fn walk(
        &mut self,
        elem: NodeId,
        bstate: &mut BlockState,
        istates: &mut Vec<FormatState>,
        in_shift: bool,
    ) -> Option<&'static str> {
        let source = self.source;
        if source.element_namespace(elem) != Some(&ns!(html)) {
            return None;
        }
        let Some(name) = source.element_name(elem) else {
            return None;
        };
        let styles = self.styles;
        let Some(style) = styles.style(elem) else {
            log::debug!("no computed style for <{name}>, skipping it");
            return None;
        };

        if style.is_hidden() {
            // Keep the target so hidden tables of contents still resolve.
            if let Some(id) = source.element_id(elem) {
                bstate.queue_anchor(id);
            }
            return None;
        }

        let mut tag = Tag::from_local(name);
        let mut istate = istates.last().map(FormatState::descend).unwrap_or_default();

        let is_block = !style.display.is_inline()
            && style.display != Display::None
            && style.float == Float::None
            && tag != Tag::Br;

        let (mut leading, children) = segments(source, elem);
        let mut trailing_space = None;

        if is_block {
            bstate.para = None;
            istate.halign = style.text_align;
            istate.indent = style.text_indent.clone();
            if style.margin_left.is_auto() && style.margin_right.is_auto() {
                istate.halign = TextAlign::Center;
            }
            if tag != Tag::Body {
                istate.left += style.margin_left.points() + style.padding_left;
            }
            bstate.collapse_margin(style.margin_top.points());
            bstate.add_padding(style.padding_top);
        } else if istate.href.is_none() {
            let left = style.margin_left.points() + style.padding_left;
            if let Some(spaces) = inline_spaces(left, style.font_size) {
                leading.insert_str(0, &spaces);
            }
            let right = style.margin_right.points() + style.padding_right;
            if let Some(spaces) = inline_spaces(right, style.font_size) {
                if children.is_empty() {
                    leading.push_str(&spaces);
                } else {
                    trailing_space = Some(spaces);
                }
            }
        }

        if bstate.content && style.page_break_before.forces_break() {
            bstate.page_break = true;
        }

        self.apply_inline_format(&mut istate, style);
        if let Some(id) = source.element_id(elem) {
            bstate.queue_anchor(id);
        }
        if let Some(anchor_name) = source.get_attr(elem, "name") {
            bstate.queue_anchor(anchor_name);
        }
        if tag == Tag::A
            && let Some(href) = source.get_attr(elem, "href")
        {
            istate.href = Some(href.to_string());
        }

        tag = self.special_attributes(elem, tag, style, &mut istate);

        let mut close_quote = None;
        if tag == Tag::Q {
            leading.insert_str(0, OPEN_QUOTE);
            close_quote = Some(CLOSE_QUOTE);
        }

        let preserve = istate.preserve;
        let text = if preserve {
            leading
        } else if !children.is_empty() && is_space(&leading) {
            String::new()
        } else {
            collapse_whitespace(&leading)
        };

        istates.push(istate);

        if let Some(shift) = style.vertical_align.shift()
            && !in_shift
            && !tag.resists_shift()
            && !is_block
        {
            let vtag = match shift {
                BaselineShift::Raise => "sup",
                BaselineShift::Lower => "sub",
            };
            self.emulate_shift(elem, vtag, bstate, istates);
            return close_quote;
        }

        let saved_ignore_margins = self.ignore_margins;
        if tag == Tag::Blockquote {
            self.ignore_margins = false;
        }

        if !text.is_empty() || tag.is_content() || tag.is_nestable() {
            self.emit_content(elem, tag, &text, bstate, istates);
        }
        for (child, tail) in children {
            let prefix = self.walk(child, bstate, istates, in_shift);
            let mut tail = tail;
            if let Some(prefix) = prefix {
                tail.insert_str(0, prefix);
            }
            let tail = if preserve {
                tail
            } else if bstate.para.is_none() && is_space(&tail) {
                String::new()
            } else {
                collapse_whitespace(&tail)
            };
            if !tail.is_empty() {
                self.emit_content(elem, tag, &tail, bstate, istates);
            }
        }
        if let Some(spaces) = trailing_space {
            self.emit_content(elem, tag, &spaces, bstate, istates);
        }

        self.ignore_margins = saved_ignore_margins;

        if bstate.content && style.page_break_after.forces_break() {
            bstate.page_break = true;
        }
        if is_block {
            self.replace_degenerate_paragraph(bstate);
            bstate.end_paragraph();
            bstate.collapse_margin(style.margin_bottom.points());
            bstate.add_padding(style.padding_bottom);
        }
        bstate.close_container(elem);
        istates.pop();
        close_quote
    }

    /// Font rung, weight, slant, colors, decoration and family from `style`.
    fn apply_inline_format(&mut self, istate: &mut FormatState, style: &ComputedStyle) {
        istate.font_rung = self.ladder.rung(style.font_size);
        istate.italic = style.font_style == FontStyle::Italic;
        istate.bold = style.font_weight > 400;
        istate.preserve = style.white_space.preserves();
        istate.bgcolor = style.background_color.clone();
        istate.fgcolor = style.color.clone();
        istate.strikethrough = style.text_decoration.line_through;
        istate.underline = style.text_decoration.underline;
        istate.family = FontFamily::classify(&style.font_family);
    }

    /// Per-tag attributes and retagging. Returns the tag the element is
    /// emitted as.
    fn special_attributes(
        &self,
        elem: NodeId,
        tag: Tag,
        style: &ComputedStyle,
        istate: &mut FormatState,
    ) -> Tag {
        let source = self.source;
        istate.attrs.clear();

        let mut tag = tag;
        if let (Tag::Img, Some(src)) = (tag, source.get_attr(elem, "src")) {
            self.image_attributes(src, style, istate);
        } else if tag == Tag::Hr && style.width.points() > 0.0 {
            let ratio = style.width.points() / self.profile.width_pts();
            istate.set_attr("width", format!("{}%", (ratio * 100.0).round_ties_even() as i64));
        } else {
            tag = match style.display {
                Display::Table => Tag::Table,
                Display::TableRow => Tag::Tr,
                Display::TableCell => Tag::Td,
                _ => tag,
            };
        }
        if tag.is_table() && self.ignore_tables {
            tag = tag.without_tables();
        }

        if tag.is_table() {
            for attr in TABLE_ATTRS {
                if let Some(value) = source.get_attr(elem, attr) {
                    istate.set_attr(attr, value);
                }
            }
        }
        if tag == Tag::Table {
            if let Some(color) = style.visible_background() {
                istate.set_attr("bgcolor", color);
            }
            if style.declared("border").is_some() || style.declared("border-width").is_some() {
                istate.set_attr("border", "1");
            }
        }
        tag
    }

    fn image_attributes(&self, src: &str, style: &ComputedStyle, istate: &mut FormatState) {
        istate.set_attr("src", src);
        let align = match style.declared("vertical-align") {
            Some(valign @ ("top" | "bottom" | "middle")) => valign,
            _ => "baseline",
        };
        istate.set_attr("align", align.to_string());

        let dimensions = [
            ("width", style.width, self.profile.width_pts()),
            ("height", style.height, self.profile.height_pts()),
        ];
        for (prop, length, reference) in dimensions {
            if style.declared(prop).is_none_or(|value| value == "auto") {
                continue;
            }
            let Length::Points(points) = length else {
                continue;
            };
            let value = if points == reference {
                "100%".to_string()
            } else {
                let pixels = (points / self.profile.pt_per_px()).round_ties_even();
                if !pixels.is_finite() {
                    continue;
                }
                format!("{}", pixels as i64)
            };
            istate.set_attr(prop, value);
        }

        if istate.attr("width").is_some() && istate.attr("height").is_some() {
            return;
        }
        let Some((width, height)) = self.images.dimensions(src) else {
            log::debug!("no intrinsic size for image {src}");
            return;
        };
        let given_width = istate.attr("width").map(str::to_string);
        let given_height = istate.attr("height").map(str::to_string);
        match (given_width, given_height) {
            (None, None) => {
                istate.set_attr("width", width.to_string());
                istate.set_attr("height", height.to_string());
            }
            (None, Some(given)) if width > 0 && height > 0 => {
                let ratio = f64::from(width) / f64::from(height);
                let derived = given
                    .parse::<f64>()
                    .map_or(f64::from(width), |given| given * ratio);
                istate.set_attr("width", (derived as i64).to_string());
            }
            (Some(given), None) if width > 0 && height > 0 => {
                let ratio = f64::from(width) / f64::from(height);
                let derived = given
                    .parse::<f64>()
                    .map_or(f64::from(height), |given| given / ratio);
                istate.set_attr("height", (derived as i64).to_string());
            }
            _ => {}
        }
    }

    /// Render `elem` into a scratch body and splice the result into a
    /// `<sup><small>` or `<sub><small>` pair at the current insertion point.
    ///
    /// Expects this level's state on top of `istates` and pops it.
    fn emulate_shift(
        &mut self,
        elem: NodeId,
        vtag: &str,
        bstate: &mut BlockState,
        istates: &mut Vec<FormatState>,
    ) {
        let scratch_body = self.out.create_html_element("body");
        let scratch_para = self.out.create_html_element("p");
        self.out.append(scratch_body, scratch_para);

        let mut vbstate = BlockState::new(scratch_body);
        vbstate.para = Some(scratch_para);
        for id in bstate.take_anchors() {
            vbstate.queue_anchor(&id);
        }

        self.walk(elem, &mut vbstate, istates, true);

        for id in vbstate.take_anchors() {
            bstate.queue_anchor(&id);
        }
        istates.pop();
        if istates.is_empty() {
            istates.push(FormatState::default());
        }

        if bstate.para.is_none() {
            self.emit_content(elem, Tag::Span, "", bstate, istates);
        }
        let parent = bstate.inline.or(bstate.para).unwrap_or(bstate.body);

        let wrapper = self.out.create_html_element(vtag);
        let small = self.out.create_html_element("small");
        self.out.append(parent, wrapper);
        self.out.append(wrapper, small);

        let leading: Vec<NodeId> = self
            .out
            .children(scratch_body)
            .take_while(|&child| Some(child) != vbstate.para)
            .collect();
        for child in leading {
            self.out.append(small, child);
        }
        if let Some(para) = vbstate.para {
            let moved: Vec<NodeId> = self.out.children(para).collect();
            for child in moved {
                self.out.append(small, child);
            }
        }
    }

    /// A paragraph holding nothing but one non-breaking space is a spacer;
    /// a line break renders the same.
    fn replace_degenerate_paragraph(&mut self, bstate: &BlockState) {
        let Some(para) = bstate.para else {
            return;
        };
        if bstate.nested.iter().any(|open| open.element == para) {
            return;
        }
        let mut children = self.out.children(para);
        let (Some(only), None) = (children.next(), children.next()) else {
            return;
        };
        let is_spacer = matches!(
            self.out.get(only).map(|node| &node.data),
            Some(NodeData::Text(text)) if text.chars().eq([NBSP])
        );
        if is_spacer {
            let br = self.out.create_html_element("br");
            self.out.replace(para, br);
        }
    }
}

/// Split an element's content into its leading text and each non-text
/// child with the text that follows it.
fn segments(dom: &ArenaDom, elem: NodeId) -> (String, Vec<(NodeId, String)>) {
    let mut leading = String::new();
    let mut children: Vec<(NodeId, String)> = Vec::new();
    for child in dom.children(elem) {
        match (dom.text_content(child), children.last_mut()) {
            (Some(text), Some((_, tail))) => tail.push_str(text),
            (Some(text), None) => leading.push_str(text),
            (None, _) => children.push((child, String::new())),
        }
    }
    (leading, children)
}

/// Non-breaking spaces standing in for `space` points of inline margin.
fn inline_spaces(space: f64, font_size: f64) -> Option<String> {
    if space <= 0.0 || font_size <= 0.0 {
        return None;
    }
    let count = (space * 3.0 / font_size)
        .round_ties_even()
        .min(f64::from(MAX_INLINE_SPACES));
    (count >= 1.0).then(|| std::iter::repeat_n(NBSP, count as usize).collect())
}

/// Whitespace-only, where a non-breaking space counts as content.
pub(crate) fn is_space(text: &str) -> bool {
    if text.is_empty() {
        return true;
    }
    if text.contains(NBSP) {
        return false;
    }
    text.chars().all(char::is_whitespace)
}

/// Collapse runs of ASCII whitespace to one space.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0b') {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
