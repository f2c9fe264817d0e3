//! Computed style values.
//!
//! Lengths are resolved to points against the output profile, keywords to
//! small enums. Anything that cannot be resolved leaves the inherited or
//! initial value in place.

use std::collections::HashMap;

use cssparser::{Parser, ParserInput, Token};

use crate::profile::OutputProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    None,
    Block,
    #[default]
    Inline,
    InlineBlock,
    InlineTable,
    ListItem,
    Table,
    TableRow,
    TableCell,
    TableCaption,
    TableRowGroup,
    TableColumn,
    /// Running header, never rendered in the flow.
    PageHead,
    /// Running footer, never rendered in the flow.
    PageFoot,
}

impl Display {
    fn parse(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "none" => Self::None,
            "block" | "flex" | "grid" | "flow-root" | "run-in" => Self::Block,
            "inline" | "contents" => Self::Inline,
            "inline-block" | "inline-flex" | "inline-grid" => Self::InlineBlock,
            "inline-table" => Self::InlineTable,
            "list-item" => Self::ListItem,
            "table" => Self::Table,
            "table-row" => Self::TableRow,
            "table-cell" => Self::TableCell,
            "table-caption" => Self::TableCaption,
            "table-row-group" | "table-header-group" | "table-footer-group" => {
                Self::TableRowGroup
            }
            "table-column" | "table-column-group" => Self::TableColumn,
            "oeb-page-head" => Self::PageHead,
            "oeb-page-foot" => Self::PageFoot,
            _ => return None,
        })
    }

    pub fn is_inline(self) -> bool {
        matches!(self, Self::Inline | Self::InlineBlock | Self::InlineTable)
    }

    /// Removed from the flow entirely.
    pub fn is_hidden(self) -> bool {
        matches!(self, Self::None | Self::PageHead | Self::PageFoot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Float {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Auto,
    Left,
    Right,
    Center,
    Justify,
}

impl TextAlign {
    fn parse(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "left" | "start" => Self::Left,
            "right" | "end" => Self::Right,
            "center" | "-webkit-center" => Self::Center,
            "justify" => Self::Justify,
            "auto" => Self::Auto,
            _ => return None,
        })
    }

    /// Value of the HTML `align` attribute, `None` for `auto`.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::Left => Some("left"),
            Self::Right => Some("right"),
            Self::Center => Some("center"),
            Self::Justify => Some("justify"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextIndent {
    Points(f64),
    /// A keyword the renderer has no equivalent for, such as `hanging`.
    Unresolved(String),
}

impl Default for TextIndent {
    fn default() -> Self {
        Self::Points(0.0)
    }
}

impl TextIndent {
    /// The indent in points; unresolved values count as zero.
    pub fn points(&self) -> f64 {
        match self {
            Self::Points(pt) => *pt,
            Self::Unresolved(_) => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Length {
    #[default]
    Auto,
    Points(f64),
}

impl Length {
    pub fn is_auto(self) -> bool {
        self == Self::Auto
    }

    /// Points, with `auto` as zero.
    pub fn points(self) -> f64 {
        match self {
            Self::Auto => 0.0,
            Self::Points(pt) => pt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhiteSpace {
    #[default]
    Normal,
    Pre,
    Nowrap,
    PreWrap,
    PreLine,
}

impl WhiteSpace {
    /// Whether source whitespace must be kept verbatim.
    pub fn preserves(self) -> bool {
        matches!(self, Self::Pre | Self::PreWrap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextDecoration {
    pub underline: bool,
    pub line_through: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum VerticalAlign {
    #[default]
    Baseline,
    Super,
    Sub,
    TextTop,
    TextBottom,
    Top,
    Bottom,
    Middle,
    /// Explicit offset from the baseline, in points.
    Offset(f64),
}

/// Direction of a baseline shift that has to be emulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineShift {
    Raise,
    Lower,
}

impl VerticalAlign {
    pub fn shift(self) -> Option<BaselineShift> {
        match self {
            Self::Super | Self::TextTop | Self::Top => Some(BaselineShift::Raise),
            Self::Sub | Self::TextBottom | Self::Bottom => Some(BaselineShift::Lower),
            Self::Offset(pt) if pt > 0.0 => Some(BaselineShift::Raise),
            Self::Offset(pt) if pt < 0.0 => Some(BaselineShift::Lower),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageBreak {
    #[default]
    Auto,
    Always,
    Avoid,
    Left,
    Right,
}

impl PageBreak {
    fn parse(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "auto" => Self::Auto,
            "always" | "page" => Self::Always,
            "avoid" => Self::Avoid,
            "left" => Self::Left,
            "right" => Self::Right,
            _ => return None,
        })
    }

    pub fn forces_break(self) -> bool {
        matches!(self, Self::Always | Self::Left | Self::Right)
    }
}

/// Resolved style of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub visibility: Visibility,
    pub float: Float,
    pub text_align: TextAlign,
    pub text_indent: TextIndent,
    pub margin_top: Length,
    pub margin_right: Length,
    pub margin_bottom: Length,
    pub margin_left: Length,
    pub padding_top: f64,
    pub padding_right: f64,
    pub padding_bottom: f64,
    pub padding_left: f64,
    /// Points.
    pub font_size: f64,
    pub font_style: FontStyle,
    pub font_weight: u16,
    pub font_family: String,
    pub white_space: WhiteSpace,
    pub background_color: String,
    pub color: String,
    pub text_decoration: TextDecoration,
    pub vertical_align: VerticalAlign,
    pub width: Length,
    pub height: Length,
    pub page_break_before: PageBreak,
    pub page_break_after: PageBreak,
    /// The element's own cascaded declarations, unresolved.
    pub declared: HashMap<String, String>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Inline,
            visibility: Visibility::Visible,
            float: Float::None,
            text_align: TextAlign::Auto,
            text_indent: TextIndent::default(),
            margin_top: Length::Points(0.0),
            margin_right: Length::Points(0.0),
            margin_bottom: Length::Points(0.0),
            margin_left: Length::Points(0.0),
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            font_size: 12.0,
            font_style: FontStyle::Normal,
            font_weight: 400,
            font_family: "serif".to_string(),
            white_space: WhiteSpace::Normal,
            background_color: "transparent".to_string(),
            color: "black".to_string(),
            text_decoration: TextDecoration::default(),
            vertical_align: VerticalAlign::Baseline,
            width: Length::Auto,
            height: Length::Auto,
            page_break_before: PageBreak::Auto,
            page_break_after: PageBreak::Auto,
            declared: HashMap::new(),
        }
    }
}

impl ComputedStyle {
    /// Style of the document root before any rule applies.
    pub fn initial(profile: &OutputProfile) -> Self {
        Self {
            font_size: profile.base_font_size,
            ..Self::default()
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.display.is_hidden() || self.visibility == Visibility::Hidden
    }

    /// The raw value this element declared for `property`, if any.
    pub fn declared(&self, property: &str) -> Option<&str> {
        self.declared.get(property).map(String::as_str)
    }

    /// Background color, unless transparent.
    pub fn visible_background(&self) -> Option<&str> {
        let color = self.background_color.as_str();
        (!color.is_empty() && color != "transparent" && color != "none").then_some(color)
    }

    /// Inherited properties of `self` with everything else at its initial
    /// value.
    fn inherited(&self) -> Self {
        Self {
            visibility: self.visibility,
            text_align: self.text_align,
            text_indent: self.text_indent.clone(),
            font_size: self.font_size,
            font_style: self.font_style,
            font_weight: self.font_weight,
            font_family: self.font_family.clone(),
            white_space: self.white_space,
            color: self.color.clone(),
            text_decoration: self.text_decoration,
            ..Self::default()
        }
    }

    /// Resolve `declared` on top of what `parent` passes down.
    pub fn cascade(
        parent: &ComputedStyle,
        declared: HashMap<String, String>,
        profile: &OutputProfile,
    ) -> Self {
        let mut style = parent.inherited();
        if let Some(raw) = declared.get("font-size") {
            style.font_size = resolve_font_size(raw, parent.font_size, profile);
        }

        let resolver = Resolver {
            profile,
            font_size: style.font_size,
        };
        for (property, raw) in &declared {
            let keyword = raw.trim().to_ascii_lowercase();
            if keyword == "inherit" {
                style.inherit_property(property, parent);
                continue;
            }
            style.apply(property, raw.trim(), &keyword, &resolver, parent);
        }

        style.declared = declared;
        style
    }

    fn apply(
        &mut self,
        property: &str,
        raw: &str,
        keyword: &str,
        resolver: &Resolver<'_>,
        parent: &ComputedStyle,
    ) {
        let width = resolver.profile.width_pts();
        match property {
            "display" => {
                if let Some(display) = Display::parse(keyword) {
                    self.display = display;
                }
            }
            "visibility" => match keyword {
                "visible" => self.visibility = Visibility::Visible,
                "hidden" | "collapse" => self.visibility = Visibility::Hidden,
                _ => {}
            },
            "float" => match keyword {
                "left" => self.float = Float::Left,
                "right" => self.float = Float::Right,
                "none" => self.float = Float::None,
                _ => {}
            },
            "text-align" => {
                if let Some(align) = TextAlign::parse(keyword) {
                    self.text_align = align;
                }
            }
            "text-indent" => {
                self.text_indent = match resolver.length(raw, width) {
                    Some(pt) => TextIndent::Points(pt),
                    None => TextIndent::Unresolved(keyword.to_string()),
                }
            }
            "margin-top" | "margin-right" | "margin-bottom" | "margin-left" => {
                let value = if keyword == "auto" {
                    Some(Length::Auto)
                } else {
                    resolver.length(raw, width).map(Length::Points)
                };
                if let Some(value) = value {
                    match property {
                        "margin-top" => self.margin_top = value,
                        "margin-right" => self.margin_right = value,
                        "margin-bottom" => self.margin_bottom = value,
                        _ => self.margin_left = value,
                    }
                }
            }
            "padding-top" | "padding-right" | "padding-bottom" | "padding-left" => {
                if let Some(pt) = resolver.length(raw, width) {
                    match property {
                        "padding-top" => self.padding_top = pt,
                        "padding-right" => self.padding_right = pt,
                        "padding-bottom" => self.padding_bottom = pt,
                        _ => self.padding_left = pt,
                    }
                }
            }
            "font-style" => match keyword {
                "normal" => self.font_style = FontStyle::Normal,
                "italic" => self.font_style = FontStyle::Italic,
                "oblique" => self.font_style = FontStyle::Oblique,
                _ => {}
            },
            "font-weight" => {
                if let Some(weight) = resolve_font_weight(keyword, parent.font_weight) {
                    self.font_weight = weight;
                }
            }
            "font-family" => self.font_family = raw.to_string(),
            "white-space" => match keyword {
                "normal" => self.white_space = WhiteSpace::Normal,
                "pre" => self.white_space = WhiteSpace::Pre,
                "nowrap" => self.white_space = WhiteSpace::Nowrap,
                "pre-wrap" | "break-spaces" => self.white_space = WhiteSpace::PreWrap,
                "pre-line" => self.white_space = WhiteSpace::PreLine,
                _ => {}
            },
            "background-color" => self.background_color = keyword.to_string(),
            "color" => self.color = keyword.to_string(),
            "text-decoration" => {
                self.text_decoration = TextDecoration {
                    underline: keyword.contains("underline"),
                    line_through: keyword.contains("line-through"),
                }
            }
            "vertical-align" => {
                if let Some(valign) = resolver.vertical_align(raw, keyword) {
                    self.vertical_align = valign;
                }
            }
            "width" | "height" => {
                let base = if property == "width" {
                    width
                } else {
                    resolver.profile.height_pts()
                };
                let value = if keyword == "auto" {
                    Some(Length::Auto)
                } else {
                    resolver.length(raw, base).map(Length::Points)
                };
                if let Some(value) = value {
                    if property == "width" {
                        self.width = value;
                    } else {
                        self.height = value;
                    }
                }
            }
            "page-break-before" => {
                if let Some(brk) = PageBreak::parse(keyword) {
                    self.page_break_before = brk;
                }
            }
            "page-break-after" => {
                if let Some(brk) = PageBreak::parse(keyword) {
                    self.page_break_after = brk;
                }
            }
            _ => {}
        }
    }

    fn inherit_property(&mut self, property: &str, parent: &ComputedStyle) {
        match property {
            "display" => self.display = parent.display,
            "visibility" => self.visibility = parent.visibility,
            "float" => self.float = parent.float,
            "text-align" => self.text_align = parent.text_align,
            "text-indent" => self.text_indent = parent.text_indent.clone(),
            "margin-top" => self.margin_top = parent.margin_top,
            "margin-right" => self.margin_right = parent.margin_right,
            "margin-bottom" => self.margin_bottom = parent.margin_bottom,
            "margin-left" => self.margin_left = parent.margin_left,
            "padding-top" => self.padding_top = parent.padding_top,
            "padding-right" => self.padding_right = parent.padding_right,
            "padding-bottom" => self.padding_bottom = parent.padding_bottom,
            "padding-left" => self.padding_left = parent.padding_left,
            "font-size" => self.font_size = parent.font_size,
            "font-style" => self.font_style = parent.font_style,
            "font-weight" => self.font_weight = parent.font_weight,
            "font-family" => self.font_family = parent.font_family.clone(),
            "white-space" => self.white_space = parent.white_space,
            "background-color" => self.background_color = parent.background_color.clone(),
            "color" => self.color = parent.color.clone(),
            "text-decoration" => self.text_decoration = parent.text_decoration,
            "vertical-align" => self.vertical_align = parent.vertical_align,
            "width" => self.width = parent.width,
            "height" => self.height = parent.height,
            "page-break-before" => self.page_break_before = parent.page_break_before,
            "page-break-after" => self.page_break_after = parent.page_break_after,
            _ => {}
        }
    }
}

/// Unit resolution for one element.
struct Resolver<'a> {
    profile: &'a OutputProfile,
    /// The element's own font size, the reference for `em`.
    font_size: f64,
}

impl Resolver<'_> {
    /// Resolve a length to points; percentages are taken of `percent_base`.
    fn length(&self, raw: &str, percent_base: f64) -> Option<f64> {
        let mut input = ParserInput::new(raw);
        let mut parser = Parser::new(&mut input);
        let token = parser.next().ok()?.clone();
        token_to_points(&token, percent_base, self.font_size, self.profile)
    }

    fn vertical_align(&self, raw: &str, keyword: &str) -> Option<VerticalAlign> {
        Some(match keyword {
            "baseline" => VerticalAlign::Baseline,
            "super" => VerticalAlign::Super,
            "sub" => VerticalAlign::Sub,
            "text-top" => VerticalAlign::TextTop,
            "text-bottom" => VerticalAlign::TextBottom,
            "top" => VerticalAlign::Top,
            "bottom" => VerticalAlign::Bottom,
            "middle" => VerticalAlign::Middle,
            _ => VerticalAlign::Offset(self.length(raw, self.font_size)?),
        })
    }
}

fn token_to_points(
    token: &Token<'_>,
    percent_base: f64,
    em: f64,
    profile: &OutputProfile,
) -> Option<f64> {
    match token {
        Token::Dimension { value, unit, .. } => {
            let value = *value as f64;
            let factor = match unit.to_ascii_lowercase().as_str() {
                "pt" => 1.0,
                "px" => profile.pt_per_px(),
                "pc" => 12.0,
                "in" => 72.0,
                "cm" => 72.0 / 2.54,
                "mm" => 7.2 / 2.54,
                "q" => 1.8 / 2.54,
                "em" => em,
                "ex" | "ch" => em * 0.5,
                "rem" => profile.base_font_size,
                _ => return None,
            };
            Some(value * factor)
        }
        Token::Percentage { unit_value, .. } => Some(*unit_value as f64 * percent_base),
        Token::Number { value, .. } => Some(*value as f64),
        _ => None,
    }
}

/// Resolve `font-size` against the parent's size.
fn resolve_font_size(raw: &str, parent: f64, profile: &OutputProfile) -> f64 {
    let keyword = raw.trim().to_ascii_lowercase();
    if let Some(size) = profile.keyword_font_size(&keyword) {
        return size;
    }
    match keyword.as_str() {
        "smaller" => return parent / 1.2,
        "larger" => return parent * 1.2,
        _ => {}
    }

    let mut input = ParserInput::new(raw);
    let mut parser = Parser::new(&mut input);
    let Ok(token) = parser.next() else {
        return parent;
    };
    token_to_points(token, parent, parent, profile)
        .filter(|size| *size >= 0.0)
        .unwrap_or(parent)
}

fn resolve_font_weight(keyword: &str, parent: u16) -> Option<u16> {
    Some(match keyword {
        "normal" => 400,
        "bold" => 700,
        "bolder" if parent < 400 => 400,
        "bolder" if parent < 600 => 700,
        "bolder" => 900,
        "lighter" if parent <= 500 => 100,
        "lighter" if parent < 700 => 400,
        "lighter" => 700,
        other => other.parse::<u16>().ok()?.clamp(1, 1000),
    })
}
