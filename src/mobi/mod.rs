//! XHTML to Mobipocket markup (MobiML).
//!
//! Mobipocket readers render a restricted HTML 3.2 dialect: no CSS, a
//! seven-step `<font size>` ladder, `<blockquote>` for indentation and
//! `height`/`width` attributes on paragraphs for vertical spacing and first
//! line indents. [`MobiMlizer`] flattens a styled document into that
//! vocabulary.
//!
//! ```
//! use mobiml::dom::parse_html;
//! use mobiml::mobi::{ConvertOptions, MobiMlizer, NoImages};
//! use mobiml::profile::OutputProfile;
//! use mobiml::style::Stylizer;
//!
//! let source = parse_html("<body><p><b>Hello</b></p></body>");
//! let profile = OutputProfile::default();
//! let styles = Stylizer::new(&source, &[], &profile);
//!
//! let mut converter = MobiMlizer::new(profile, ConvertOptions::default());
//! let doc = converter.convert_document(&source, &styles, &NoImages);
//! assert!(doc.to_xml().contains("<b>Hello</b>"));
//! ```

mod assemble;
mod content;
mod engine;
mod font_ladder;
mod state;
mod tags;

pub use assemble::{BookImages, remove_html_cover};
pub use font_ladder::{FontLadder, relate};
pub use state::{BlockState, FontFamily, FormatState, OpenContainer};
pub use tags::Tag;

use crate::dom::{ArenaDom, NodeId, serialize};
use crate::profile::OutputProfile;
use crate::style::StyleResolver;

use engine::Transducer;

/// Switches that change how much structure survives conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Degrade tables to `div`/`span`.
    pub ignore_tables: bool,
    /// Do not emulate left margins with blockquotes (blockquotes themselves
    /// still indent).
    pub ignore_margins: bool,
}

/// Intrinsic image sizes, for `<img>` elements whose size the stylesheet
/// does not fix.
pub trait ImageResolver {
    /// Pixel width and height of the image `src` refers to.
    fn dimensions(&self, src: &str) -> Option<(u32, u32)>;
}

/// Resolver that knows no images; sizes stay unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageResolver for NoImages {
    fn dimensions(&self, _src: &str) -> Option<(u32, u32)> {
        None
    }
}

/// One converted content unit.
#[derive(Debug, Clone)]
pub struct MobiDocument {
    /// Href of the unit within its book; empty for standalone documents.
    pub href: String,
    pub dom: ArenaDom,
    pub body: NodeId,
}

impl MobiDocument {
    pub fn to_xml(&self) -> String {
        serialize(&self.dom)
    }
}

/// Converter from styled XHTML to MobiML.
///
/// The font ladder cache lives as long as the converter, so one converter
/// should be used per conversion run.
#[derive(Debug, Clone)]
pub struct MobiMlizer {
    profile: OutputProfile,
    options: ConvertOptions,
    ladder: FontLadder,
}

impl MobiMlizer {
    pub fn new(profile: OutputProfile, options: ConvertOptions) -> Self {
        let ladder = FontLadder::new(&profile);
        Self {
            profile,
            options,
            ladder,
        }
    }

    pub fn profile(&self) -> &OutputProfile {
        &self.profile
    }

    pub fn options(&self) -> ConvertOptions {
        self.options
    }

    /// Convert the body of `source` into a new MobiML document.
    pub fn convert_document(
        &mut self,
        source: &ArenaDom,
        styles: &dyn StyleResolver,
        images: &dyn ImageResolver,
    ) -> MobiDocument {
        let mut out = ArenaDom::new();
        let html = out.create_html_element("html");
        let body = out.create_html_element("body");
        let document = out.document();
        out.append(document, html);
        out.append(html, body);

        let mut transducer = Transducer {
            profile: &self.profile,
            ignore_tables: self.options.ignore_tables,
            ignore_margins: self.options.ignore_margins,
            ladder: &mut self.ladder,
            source,
            styles,
            images,
            out,
        };
        let mut bstate = BlockState::new(body);
        if let Some(source_body) = source.find_by_tag("body") {
            let mut istates = vec![FormatState::default()];
            transducer.walk(source_body, &mut bstate, &mut istates, false);
        }

        let mut out = transducer.out;
        for id in bstate.take_anchors() {
            let anchor = out.create_html_element("a");
            out.set_attr(anchor, "id", id);
            out.append(body, anchor);
        }

        MobiDocument {
            href: String::new(),
            dom: out,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, serialize_fragment};
    use crate::style::{Stylesheet, Stylizer};

    fn convert_with(html: &str, css: &str, options: ConvertOptions) -> String {
        convert_with_images(html, css, options, &NoImages)
    }

    fn convert_with_images(
        html: &str,
        css: &str,
        options: ConvertOptions,
        images: &dyn ImageResolver,
    ) -> String {
        let source = parse_html(html);
        let profile = OutputProfile::default();
        let styles = Stylizer::new(&source, &[Stylesheet::parse(css)], &profile);
        let mut converter = MobiMlizer::new(profile, options);
        let doc = converter.convert_document(&source, &styles, images);
        serialize_fragment(&doc.dom, doc.body)
    }

    /// Convert with a stylesheet that zeroes the user-agent paragraph
    /// margins, which keeps expected output short.
    fn convert(html: &str, css: &str) -> String {
        let css = format!("body, p {{ margin: 0 }} {css}");
        convert_with(html, &css, ConvertOptions::default())
    }

    struct FixedImages(u32, u32);

    impl ImageResolver for FixedImages {
        fn dimensions(&self, _src: &str) -> Option<(u32, u32)> {
            Some((self.0, self.1))
        }
    }

    #[test]
    fn test_plain_paragraph() {
        assert_eq!(
            convert("<body><p>Hello</p></body>", ""),
            r#"<body><p height="0pt" width="0pt">Hello</p></body>"#
        );
    }

    #[test]
    fn test_document_wrapper() {
        let source = parse_html("<body><p>x</p></body>");
        let profile = OutputProfile::default();
        let styles = Stylizer::new(&source, &[], &profile);
        let doc = MobiMlizer::new(profile, ConvertOptions::default())
            .convert_document(&source, &styles, &NoImages);
        assert!(doc.to_xml().starts_with(
            r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:mbp="http://mobipocket.com/ns/mbp"><body>"#
        ));

        let copy = doc.clone();
        assert_eq!(copy.to_xml(), doc.to_xml());
        assert!(format!("{copy:?}").contains("MobiDocument"));
    }

    #[test]
    fn test_inline_wrappers_in_fixed_order() {
        let out = convert(
            "<body><p><a href='#n'><b><i><tt>x</tt></i></b></a></p></body>",
            "",
        );
        assert_eq!(
            out,
            r##"<body><p height="0pt" width="0pt"><a href="#n"><tt><i><b>x</b></i></tt></a></p></body>"##
        );
    }

    #[test]
    fn test_font_size_color_and_decoration() {
        let out = convert(
            r#"<body><p style="font-size: 24pt; color: red; text-decoration: underline line-through; background-color: yellow">x</p></body>"#,
            "",
        );
        assert!(out.contains(
            r#"<font size="7"><span bgcolor="yellow"><font color="red"><s><u>x</u></s></font></span></font>"#
        ));
    }

    #[test]
    fn test_same_format_runs_share_wrappers() {
        let out = convert("<body><p><b>one</b><b> two</b></p></body>", "");
        assert_eq!(out.matches("<b>").count(), 1);
        assert!(out.contains("<b>one two</b>"));
    }

    #[test]
    fn test_link_reuses_anchor_across_formats() {
        let out = convert("<body><p><a href='x.html'>plain <b>bold</b></a></p></body>", "");
        assert_eq!(out.matches("<a ").count(), 1);
        assert!(out.contains(r#"<a href="x.html">plain <b>bold</b></a>"#));
    }

    #[test]
    fn test_hidden_element_is_dropped() {
        let out = convert(
            "<body><p>keep</p><div style='display: none'><p>gone</p></div><p style='visibility: hidden'>also gone</p></body>",
            "",
        );
        assert!(!out.contains("gone"));
        assert_eq!(out.matches("<p ").count(), 1);
    }

    #[test]
    fn test_hidden_element_with_id_leaves_anchor() {
        let out = convert(
            "<body><div id='toc' style='display: none'><p>secret</p></div><p>text</p></body>",
            "",
        );
        assert!(!out.contains("secret"));
        assert_eq!(out.matches(r#"id="toc""#).count(), 1);
        assert!(out.contains(r#"<a id="toc"/><p height="0pt" width="0pt">text</p>"#));
    }

    #[test]
    fn test_margins_collapse_to_maximum() {
        let out = convert(
            "<body><div style='margin-top: 6pt'></div><div style='margin-top: 36pt'></div><div style='margin-top: 18pt'></div><p>x</p></body>",
            "",
        );
        assert!(out.contains(r#"<p height="3em" width="0pt">x</p>"#), "{out}");
    }

    #[test]
    fn test_padding_adds_to_margin() {
        let out = convert(
            "<body><div style='margin-bottom: 6pt'></div><p style='padding-top: 3pt'>x</p></body>",
            "",
        );
        assert!(out.contains(r#"<p height="9pt" width="0pt">x</p>"#), "{out}");
    }

    #[test]
    fn test_margin_left_becomes_blockquote() {
        let out = convert("<body><p style='margin-left: 12pt'>Hello</p></body>", "");
        assert_eq!(
            out,
            r#"<body><blockquote height="0pt" width="0pt">Hello</blockquote></body>"#
        );
    }

    #[test]
    fn test_blockquote_levels_per_em() {
        let out = convert("<body><p style='margin-left: 36pt'>Hello</p></body>", "");
        assert_eq!(
            out,
            r#"<body><blockquote height="0pt"><blockquote><blockquote width="0pt">Hello</blockquote></blockquote></blockquote></body>"#
        );
    }

    #[test]
    fn test_blockquote_levels_are_capped() {
        let out = convert("<body><p style='margin-left: 600pt'>x</p></body>", "");
        assert_eq!(out.matches("<blockquote").count(), 11);
    }

    #[test]
    fn test_ignore_margins() {
        let options = ConvertOptions {
            ignore_margins: true,
            ..ConvertOptions::default()
        };
        let out = convert_with(
            "<body><p style='margin-left: 24pt'>a</p><blockquote><p>b</p></blockquote></body>",
            "body, p, blockquote { margin: 0 } blockquote { margin-left: 12pt }",
            options,
        );
        assert!(out.contains(r#"<p height="0pt" width="0pt">a</p>"#), "{out}");
        assert!(out.contains(r#"<blockquote height="0pt" width="0pt">b</blockquote>"#), "{out}");
    }

    #[test]
    fn test_text_indent() {
        let out = convert("<body><p style='text-indent: 3pt'>x</p></body>", "");
        assert!(out.contains(r#"width="1em""#), "{out}");

        let out = convert("<body><p style='text-indent: -3pt'>x</p></body>", "");
        assert!(out.contains(r#"width="-12pt""#), "{out}");

        let out = convert("<body><p style='text-indent: 2em'>x</p></body>", "");
        assert!(out.contains(r#"width="2em""#), "{out}");
    }

    #[test]
    fn test_negative_indent_is_an_outdent() {
        let out = convert(
            "<body><p style='margin-left: 36pt; text-indent: -12pt'>x</p></body>",
            "",
        );
        assert_eq!(out.matches("<blockquote").count(), 2, "{out}");
        assert!(out.contains(r#"width="0pt""#));
    }

    #[test]
    fn test_alignment() {
        let out = convert(
            "<body><p style='text-align: center'>a</p><div style='margin-left: auto; margin-right: auto'>b</div></body>",
            "",
        );
        assert_eq!(out.matches(r#"align="center""#).count(), 2, "{out}");
    }

    #[test]
    fn test_list_items_are_containers() {
        let out = convert(
            "<body><ul><li>one</li><li>two <b>bold</b> tail</li></ul></body>",
            "ul { margin: 0; padding: 0 }",
        );
        assert_eq!(
            out,
            concat!(
                r#"<body><ul height="0pt" width="0pt">"#,
                r#"<li value="1" height="0pt" width="0pt">one</li>"#,
                r#"<li value="2" height="0pt" width="0pt">two <b>bold</b> tail</li>"#,
                "</ul></body>"
            )
        );
    }

    #[test]
    fn test_container_reentered_after_block_child() {
        let out = convert(
            "<body><ul><li><p>first</p>after</li></ul></body>",
            "ul { margin: 0; padding: 0 }",
        );
        assert_eq!(out.matches("<li").count(), 1, "{out}");
        assert!(out.contains("</p>after</li>"), "{out}");
    }

    #[test]
    fn test_list_spacing_goes_before_list() {
        let out = convert("<body><ul style='margin-top: 12pt; padding: 0'><li>x</li></ul></body>", "");
        assert!(out.starts_with(r#"<body><div height="1em"/><ul width="0pt">"#), "{out}");
    }

    #[test]
    fn test_table_passthrough() {
        let out = convert(
            r#"<body><table style="border: 1px solid black; background-color: #eee"><tr><td colspan="2" class="c">cell</td></tr></table></body>"#,
            "",
        );
        assert!(out.contains(r##"<table bgcolor="#eee" border="1" valign="top">"##), "{out}");
        assert!(out.contains(r#"<tr valign="top">"#), "{out}");
        assert!(out.contains(r#"<td colspan="2" valign="top">cell</td>"#), "{out}");
    }

    #[test]
    fn test_background_shorthand_color() {
        let out = convert(
            "<body><p><span style='background: url(x.png) rgb(255, 0, 0)'>x</span></p></body>",
            "",
        );
        assert!(out.contains(r#"<span bgcolor="rgb(255, 0, 0)">x</span>"#), "{out}");
    }

    const DIV_TABLE: &str = concat!(
        "<body><div style='display: table'><div style='display: table-row'>",
        "<div style='display: table-cell' colspan='2'>c</div>",
        "</div></div></body>"
    );

    #[test]
    fn test_table_display_retags() {
        let out = convert(DIV_TABLE, "");
        assert!(out.contains(r#"<table valign="top">"#), "{out}");
        assert!(out.contains(r#"<tr valign="top">"#), "{out}");
        assert!(out.contains(r#"<td colspan="2" valign="top">c</td>"#), "{out}");
        assert!(!out.contains("<div"), "{out}");
    }

    #[test]
    fn test_table_display_with_tables_ignored() {
        let options = ConvertOptions {
            ignore_tables: true,
            ..ConvertOptions::default()
        };
        let out = convert_with(DIV_TABLE, "body { margin: 0 }", options);
        assert!(!out.contains("<table"), "{out}");
        assert!(!out.contains("<tr"), "{out}");
        assert!(!out.contains("<td"), "{out}");
        assert!(!out.contains("colspan"), "{out}");
        assert!(out.contains(">c</"), "{out}");
    }

    #[test]
    fn test_page_head_and_foot_are_hidden() {
        let out = convert(
            concat!(
                "<body><div style='display: oeb-page-head'>Running head</div>",
                "<p>text</p>",
                "<div style='display: oeb-page-foot'>Folio</div></body>"
            ),
            "",
        );
        assert!(!out.contains("Running head"), "{out}");
        assert!(!out.contains("Folio"), "{out}");
        assert!(out.contains(r#"<p height="0pt" width="0pt">text</p>"#), "{out}");
    }

    #[test]
    fn test_ignore_tables() {
        let options = ConvertOptions {
            ignore_tables: true,
            ..ConvertOptions::default()
        };
        let out = convert_with(
            "<body><table><tr><td>a</td><td>b</td></tr></table></body>",
            "body { margin: 0 }",
            options,
        );
        assert!(!out.contains("<table"), "{out}");
        assert!(!out.contains("<td"), "{out}");
        assert!(out.contains(">a</p>") && out.contains(">b</p>"), "{out}");
    }

    #[test]
    fn test_image_dimensions() {
        let out = convert(
            "<body><p><img src='full.png' style='width: 100%'/><img src='half.png' style='width: 576pt; vertical-align: middle'/></p></body>",
            "",
        );
        assert!(out.contains(r#"<img src="full.png" align="baseline" width="100%"/>"#), "{out}");
        assert!(out.contains(r#"<img src="half.png" align="middle" width="800"/>"#), "{out}");
    }

    #[test]
    fn test_image_size_from_resolver() {
        let out = convert_with_images(
            "<body><p><img src='a.png'/><img src='b.png' style='width: 100px'/></p></body>",
            "body, p { margin: 0 }",
            ConvertOptions::default(),
            &FixedImages(400, 200),
        );
        assert!(out.contains(r#"<img src="a.png" align="baseline" width="400" height="200"/>"#), "{out}");
        assert!(out.contains(r#"<img src="b.png" align="baseline" width="100" height="50"/>"#), "{out}");
    }

    #[test]
    fn test_hr_width_percent() {
        let out = convert("<body><hr style='width: 50%'/></body>", "hr { margin: 0 }");
        assert!(out.contains(r#"<hr width="50%"/>"#), "{out}");
    }

    #[test]
    fn test_quote_marks() {
        let out = convert("<body><p>say <q>hi</q> now</p></body>", "");
        assert!(out.contains("say \u{201c}hi\u{201d} now"), "{out}");
    }

    #[test]
    fn test_preformatted_text() {
        let out = convert("<body><pre>a b\nc</pre></body>", "pre { margin: 0 }");
        assert!(out.contains("<tt>a\u{a0}b<br/>c</tt>"), "{out}");
    }

    #[test]
    fn test_superscript_emulation() {
        let out = convert("<body><p>x<span style='vertical-align: super'>2</span> y</p></body>", "");
        assert!(out.contains("x<sup><small>2</small></sup> y"), "{out}");

        let out = convert("<body><p>H<sub>2</sub>O</p></body>", "");
        assert!(out.contains("H<sub><small><font size=\"2\">2</font></small></sub>O"), "{out}");
    }

    #[test]
    fn test_shift_emulation_is_single_level() {
        let out = convert("<body><p><span style='vertical-align: 3pt'>up</span></p></body>", "");
        assert_eq!(out.matches("<sup>").count(), 1, "{out}");
        assert_eq!(out.matches("<small>").count(), 1, "{out}");

        let out = convert("<body><p><span style='vertical-align: -3pt'>down</span></p></body>", "");
        assert!(out.contains("<sub><small>down</small></sub>"), "{out}");

        let out = convert("<body><p>x<sup>a<sup>b</sup></sup></p></body>", "");
        assert_eq!(out.matches("<sup>").count(), 1, "{out}");
        assert_eq!(out.matches("<small>").count(), 1, "{out}");
    }

    #[test]
    fn test_huge_inline_margin_is_bounded() {
        let out = convert("<body><p>a<span style='margin-left: 1e12pt'>b</span></p></body>", "");
        assert!(out.contains("\u{a0}b"), "{out}");
        assert!(out.matches('\u{a0}').count() <= 100, "{out}");
    }

    #[test]
    fn test_shift_keeps_anchor() {
        let out = convert("<body><p>a<sup id='fn1'>1</sup></p></body>", "sup { font-size: 12pt }");
        assert!(out.contains(r#"<sup><small><a id="fn1"/>1</small></sup>"#), "{out}");
    }

    #[test]
    fn test_page_break_before_next_paragraph_once() {
        let out = convert(
            "<body><p style='page-break-after: always'>one</p>\n \n<p>two</p></body>",
            "",
        );
        assert_eq!(out.matches("<mbp:pagebreak/>").count(), 1, "{out}");
        assert!(out.contains(r#"</p><mbp:pagebreak/><p height="0pt" width="0pt">two</p>"#), "{out}");
    }

    #[test]
    fn test_no_page_break_before_first_content() {
        let out = convert("<body><p style='page-break-before: always'>one</p></body>", "");
        assert!(!out.contains("pagebreak"), "{out}");
    }

    #[test]
    fn test_anchors_precede_content() {
        let out = convert("<body><p id='p1'>one</p><p><a name='n1'/>two</p></body>", "");
        assert!(out.contains(r#"<a id="p1"/><p height="0pt" width="0pt">one</p>"#), "{out}");
        assert!(out.contains(r#"<a id="n1"/><p height="0pt" width="0pt">two</p>"#), "{out}");
    }

    #[test]
    fn test_trailing_anchor_is_kept() {
        let out = convert("<body><p>x</p><div id='end'></div></body>", "");
        assert!(out.ends_with(r#"<a id="end"/></body>"#), "{out}");
    }

    #[test]
    fn test_nbsp_paragraph_becomes_break() {
        let out = convert("<body><p>a</p><p>\u{a0}</p><p>b</p></body>", "");
        assert!(out.contains(r#"</p><br/><p"#), "{out}");
    }

    #[test]
    fn test_inline_margins_become_spaces() {
        let out = convert("<body><p>a<span style='margin-left: 12pt'>b</span></p></body>", "");
        assert!(out.contains("a\u{a0}\u{a0}\u{a0}b"), "{out}");
    }

    #[test]
    fn test_whitespace_collapses() {
        let out = convert("<body><p>  a \n\n b  </p></body>", "");
        assert!(out.contains("> a b </p>"), "{out}");
    }

    #[test]
    fn test_foreign_elements_are_transparent() {
        let out = convert(
            "<body><p>a<svg><text>vector</text></svg> b</p></body>",
            "",
        );
        assert!(!out.contains("vector"), "{out}");
        assert!(out.contains("a b"), "{out}");
    }
}
