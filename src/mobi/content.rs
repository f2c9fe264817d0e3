//! Emission of text runs and void elements into the output tree.

use html5ever::{LocalName, Namespace, Prefix, QualName};

use super::engine::Transducer;
use super::state::{BlockState, FontFamily, FormatState, OpenContainer};
use super::tags::Tag;
use crate::dom::{MBP_NS, NodeId};

impl Transducer<'_> {
    /// Emit `text` for an element classified as `tag`, opening a paragraph
    /// or container first when needed. `source` is the element the text
    /// belongs to.
    pub(crate) fn emit_content(
        &mut self,
        source: NodeId,
        tag: Tag,
        text: &str,
        bstate: &mut BlockState,
        istates: &mut Vec<FormatState>,
    ) {
        if istates.is_empty() {
            istates.push(FormatState::default());
        }
        if !text.is_empty() || tag != Tag::Br {
            bstate.content = true;
        }

        let para = match bstate.para {
            _ if tag.is_special() && text.is_empty() => bstate.para.unwrap_or(bstate.body),
            Some(para) if !tag.is_cell() => para,
            _ => self.open_paragraph(source, tag, bstate, istates),
        };

        let depth = istates.len();
        istates[depth - 1].rendered = true;
        let istate = &istates[depth - 1];

        let mut last_format = bstate.last_format.take();
        if let Some(name) = tag.name().filter(|_| tag.is_content()) {
            bstate.inline = Some(para);
            last_format = None;
            let element = self.element(name, &istate.attrs);
            self.out.append(para, element);
        } else if tag.is_table() {
            self.out.set_attr(para, "valign", "top");
        }

        self.flush_anchors(bstate);

        if text.is_empty() {
            bstate.last_format = last_format;
            return;
        }

        if last_format.as_ref() != Some(istate) {
            let inline = self.open_inline(para, istate, last_format.as_ref(), bstate);
            bstate.inline = Some(inline);
        }
        bstate.last_format = Some(istate.clone());

        let inline = bstate.inline.unwrap_or(para);
        if istate.preserve {
            self.append_preformatted(inline, text);
        } else {
            self.out.append_text(inline, text);
        }
    }

    /// Start a new paragraph, container or blockquote chain for `tag` and
    /// return the element text goes into.
    fn open_paragraph(
        &mut self,
        source: NodeId,
        tag: Tag,
        bstate: &mut BlockState,
        istates: &mut [FormatState],
    ) -> NodeId {
        let body = bstate.body;
        if bstate.page_break {
            let pagebreak = self.out.create_element(mbp_name("pagebreak"), vec![]);
            self.out.append(body, pagebreak);
            bstate.page_break = false;
        }
        bstate.last_format = None;
        bstate.anchor = None;

        let parent = bstate.container().unwrap_or(body);
        let depth = istates.len();
        let istate = &istates[depth - 1];
        let base = self.profile.base_font_size;

        let mut indent = istate.indent.points();
        let mut left = istate.left;
        if indent < 0.0 && indent.abs() < left {
            left += indent;
            indent = 0.0;
        } else if indent != 0.0 && indent.abs() < base {
            indent = indent.signum() * base;
        }

        let (wrapper, para) = if tag.is_nestable() && !istate.rendered {
            let name = tag.name().unwrap_or("div");
            let element = self.element(name, &istate.attrs);
            self.out.append(parent, element);
            bstate.nested.push(OpenContainer { element, source });
            if tag == Tag::Li && depth > 1 {
                let list = &mut istates[depth - 2];
                list.list_num += 1;
                let value = list.list_num.to_string();
                self.out.set_attr(element, "value", value);
            }
            (element, element)
        } else if tag.is_nestable() {
            let element = bstate.container().unwrap_or(parent);
            (element, element)
        } else if !self.ignore_margins && left > 0.0 && indent >= 0.0 {
            self.blockquote_chain(parent, left)
        } else {
            let p = self.out.create_html_element("p");
            self.out.append(parent, p);
            (p, p)
        };
        bstate.para = Some(para);
        bstate.inline = Some(para);

        let vspace = bstate.take_spacing();
        if !tag.is_table() {
            if tag.is_list() && vspace > 0.0 {
                let height = self.measure(vspace);
                let spacer = self.out.create_html_element("div");
                self.out.set_attr(spacer, "height", height);
                self.out.insert_before(wrapper, spacer);
            } else {
                let height = self.measure(vspace);
                self.out.set_attr(wrapper, "height", height);
            }
            let width = self.measure(indent);
            self.out.set_attr(para, "width", width);
        } else if tag == Tag::Table && vspace > 0.0 {
            let lines = (vspace / base).round_ties_even() as i64;
            for _ in 0..lines {
                let br = self.out.create_html_element("br");
                self.out.insert_before(wrapper, br);
            }
        }

        if let Some(align) = istates[depth - 1].halign.as_attr() {
            self.out.set_attr(para, "align", align);
        }
        para
    }

    /// Nested blockquotes approximating `left` points of indentation.
    /// Returns the outermost and innermost levels.
    fn blockquote_chain(&mut self, parent: NodeId, left: f64) -> (NodeId, NodeId) {
        let ems = self.profile.ems_per_blockquote;
        let wrapper = self.out.create_html_element("blockquote");
        self.out.append(parent, wrapper);

        let mut para = wrapper;
        let mut remaining = ((left / self.profile.base_font_size).round_ties_even() - ems).min(10.0);
        while remaining > ems / 2.0 {
            let level = self.out.create_html_element("blockquote");
            self.out.append(para, level);
            para = level;
            remaining -= ems;
        }
        (wrapper, para)
    }

    /// Build the inline wrapper chain for `istate` under `para` and return
    /// its innermost element.
    fn open_inline(
        &mut self,
        para: NodeId,
        istate: &FormatState,
        previous: Option<&FormatState>,
        bstate: &mut BlockState,
    ) -> NodeId {
        let mut inline = para;
        match &istate.href {
            None => bstate.anchor = None,
            Some(href) => {
                let same_target = previous.is_some_and(|prev| prev.href.as_ref() == Some(href));
                match bstate.anchor.filter(|_| same_target) {
                    Some(anchor) => inline = anchor,
                    None => {
                        let anchor = self.wrap(inline, "a", Some(("href", href.as_str())));
                        bstate.anchor = Some(anchor);
                        inline = anchor;
                    }
                }
            }
        }

        if istate.font_rung != 3 {
            let size = istate.font_rung.to_string();
            inline = self.wrap(inline, "font", Some(("size", size.as_str())));
        }
        if istate.family == FontFamily::Monospace {
            inline = self.wrap(inline, "tt", None);
        }
        if istate.italic {
            inline = self.wrap(inline, "i", None);
        }
        if istate.bold {
            inline = self.wrap(inline, "b", None);
        }
        if istate.has_background() {
            inline = self.wrap(inline, "span", Some(("bgcolor", istate.bgcolor.as_str())));
        }
        if istate.fgcolor != "black" {
            inline = self.wrap(inline, "font", Some(("color", istate.fgcolor.as_str())));
        }
        if istate.strikethrough {
            inline = self.wrap(inline, "s", None);
        }
        if istate.underline {
            inline = self.wrap(inline, "u", None);
        }
        inline
    }

    /// Preformatted text: spaces become non-breaking and line ends become
    /// `<br/>`.
    fn append_preformatted(&mut self, inline: NodeId, text: &str) {
        let text = text
            .replace(' ', "\u{a0}")
            .replace("\r\n", "\n")
            .replace('\r', "\n");
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                let br = self.out.create_html_element("br");
                self.out.append(inline, br);
            }
            if !line.is_empty() {
                self.out.append_text(inline, line);
            }
        }
    }

    /// Insert anchors for queued identifiers before the body's last child.
    fn flush_anchors(&mut self, bstate: &mut BlockState) {
        if !bstate.has_pending_anchors() {
            return;
        }
        let last = self.out.last_child(bstate.body);
        for id in bstate.take_anchors() {
            let anchor = self.element("a", &[("id", id)]);
            match last {
                Some(last) => self.out.insert_before(last, anchor),
                None => self.out.append(bstate.body, anchor),
            }
        }
    }

    /// Render a length for `height`/`width` attributes: points below one em,
    /// whole ems above.
    pub(crate) fn measure(&self, points: f64) -> String {
        let base = self.profile.base_font_size;
        if points.round_ties_even() < base {
            format!("{}pt", points.round_ties_even() as i64)
        } else {
            format!("{}em", (points / base).round_ties_even() as i64)
        }
    }

    fn element<V: AsRef<str>>(&mut self, name: &str, attrs: &[(&str, V)]) -> NodeId {
        let element = self.out.create_html_element(name);
        for (attr, value) in attrs {
            self.out.set_attr(element, attr, value.as_ref());
        }
        element
    }

    fn wrap(&mut self, parent: NodeId, name: &str, attr: Option<(&str, &str)>) -> NodeId {
        let element = self.out.create_html_element(name);
        if let Some((attr, value)) = attr {
            self.out.set_attr(element, attr, value);
        }
        self.out.append(parent, element);
        element
    }
}

fn mbp_name(local: &str) -> QualName {
    QualName::new(
        Some(Prefix::from("mbp")),
        Namespace::from(MBP_NS),
        LocalName::from(local),
    )
}
