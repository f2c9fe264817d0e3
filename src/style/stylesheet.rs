//! Stylesheet parsing.
//!
//! Declarations keep their raw value text: resolving units needs the
//! element's context (parent font size, profile DPI), which only the
//! cascade has. Shorthands are split into longhands here so the cascade
//! can treat every declaration alike.

use std::cmp::Ordering;

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser, Token,
};
use selectors::parser::Selector;

use super::selector::{MobiSelectors, parse_selector_list};

#[derive(Debug, Default, Clone)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

#[derive(Debug, Clone)]
pub struct CssRule {
    pub selectors: Vec<Selector<MobiSelectors>>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    fn new(property: &str, value: impl Into<String>, important: bool) -> Self {
        Self {
            property: property.to_string(),
            value: value.into(),
            important,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Specificity {
    pub ids: u16,
    pub classes: u16,
    pub elements: u16,
}

impl Specificity {
    pub fn from_selector(selector: &Selector<MobiSelectors>) -> Self {
        // Packed as (ids << 20) | (classes << 10) | elements.
        let spec = selector.specificity();
        Self {
            ids: ((spec >> 20) & 0x3FF) as u16,
            classes: ((spec >> 10) & 0x3FF) as u16,
            elements: (spec & 0x3FF) as u16,
        }
    }
}

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ids
            .cmp(&other.ids)
            .then(self.classes.cmp(&other.classes))
            .then(self.elements.cmp(&other.elements))
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Where a declaration came from. Later variants win at equal importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    UserAgent = 0,
    Author = 1,
    /// A `style` attribute.
    Inline = 2,
}

impl Stylesheet {
    /// Parse a stylesheet, skipping anything malformed.
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rules = Vec::new();

        let mut rule_parser = TopLevelRuleParser { rules: &mut rules };
        for result in StyleSheetParser::new(&mut parser, &mut rule_parser) {
            let _ = result;
        }

        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Parse the body of a `style` attribute.
pub fn parse_declarations(css: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Vec::new();
    let mut decl_parser = DeclarationListParser {
        declarations: &mut declarations,
    };
    for result in RuleBodyParser::new(&mut parser, &mut decl_parser) {
        let _ = result;
    }
    declarations
}

struct TopLevelRuleParser<'a> {
    rules: &'a mut Vec<CssRule>,
}

// @media, @font-face, @page and friends carry nothing the converter uses.
impl<'i> AtRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> QualifiedRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = Vec<Selector<MobiSelectors>>;
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let location = input.current_source_location();
        parse_selector_list(input)
            .map(|list| list.slice().to_vec())
            .ok_or_else(|| location.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut declarations = Vec::new();
        let mut decl_parser = DeclarationListParser {
            declarations: &mut declarations,
        };
        for result in RuleBodyParser::new(input, &mut decl_parser) {
            let _ = result;
        }

        self.rules.push(CssRule {
            selectors: prelude,
            declarations,
        });
        Ok(())
    }
}

struct DeclarationListParser<'a> {
    declarations: &'a mut Vec<Declaration>,
}

impl<'i> AtRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();
}

impl<'i> DeclarationParser<'i> for DeclarationListParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        let mut end = start;
        let mut important = false;
        loop {
            if input.try_parse(cssparser::parse_important).is_ok() {
                important = true;
                break;
            }
            let is_block = match input.next_including_whitespace_and_comments() {
                Ok(token) => opens_block(token),
                Err(_) => break,
            };
            // A block has to be consumed before `end` can cover it.
            if is_block && input.parse_nested_block(skip_block).is_err() {
                break;
            }
            end = input.position();
        }

        let value = input.slice(start..end).trim();
        if !value.is_empty() {
            let property = name.to_ascii_lowercase();
            self.declarations
                .extend(expand_shorthand(&property, value, important));
        }
        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclarationListParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Split a value into its top-level components, keeping functions such as
/// `rgb(0, 0, 0)` whole.
pub fn split_components(value: &str) -> Vec<&str> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut parts = Vec::new();
    loop {
        parser.skip_whitespace();
        let start = parser.position();
        let is_block = match parser.next() {
            Ok(token) => opens_block(token),
            Err(_) => break,
        };
        if is_block && parser.parse_nested_block(skip_block).is_err() {
            break;
        }
        parts.push(parser.slice_from(start).trim());
    }
    parts
}

fn opens_block(token: &Token<'_>) -> bool {
    matches!(
        token,
        Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock
    )
}

/// Consume everything up to the end of the current block.
fn skip_block<'i>(block: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, ()>> {
    while block.next_including_whitespace_and_comments().is_ok() {}
    Ok(())
}

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// Expand a declaration into longhands.
fn expand_shorthand(property: &str, value: &str, important: bool) -> Vec<Declaration> {
    match property {
        "margin" | "padding" => {
            let parts = split_components(value);
            let [top, right, bottom, left] = match parts.as_slice() {
                [all] => [*all; 4],
                [v, h] => [*v, *h, *v, *h],
                [t, h, b] => [*t, *h, *b, *h],
                [t, r, b, l, ..] => [*t, *r, *b, *l],
                [] => return Vec::new(),
            };
            SIDES
                .iter()
                .zip([top, right, bottom, left])
                .map(|(side, v)| Declaration::new(&format!("{property}-{side}"), v, important))
                .collect()
        }
        "background" => split_components(value)
            .into_iter()
            .find(|part| looks_like_color(part))
            .map(|color| vec![Declaration::new("background-color", color, important)])
            .unwrap_or_default(),
        "break-before" | "break-after" => {
            let mapped = match value.to_ascii_lowercase().as_str() {
                "page" | "always" | "recto" | "verso" => "always",
                "left" => "left",
                "right" => "right",
                "avoid" | "avoid-page" => "avoid",
                _ => "auto",
            };
            vec![Declaration::new(
                &format!("page-{property}"),
                mapped,
                important,
            )]
        }
        "text-decoration-line" => vec![Declaration::new("text-decoration", value, important)],
        "font" => expand_font(value, important),
        _ => vec![Declaration::new(property, value, important)],
    }
}

fn looks_like_color(part: &str) -> bool {
    let lower = part.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("rgb") || lower.starts_with("hsl") {
        return true;
    }
    !lower.starts_with("url(")
        && lower.chars().all(|c| c.is_ascii_alphabetic())
        && !matches!(
            lower.as_str(),
            "none"
                | "repeat"
                | "no-repeat"
                | "repeat-x"
                | "repeat-y"
                | "scroll"
                | "fixed"
                | "local"
                | "top"
                | "bottom"
                | "left"
                | "right"
                | "center"
                | "cover"
                | "contain"
                | "auto"
        )
}

/// `font: [style] [variant] [weight] size[/line-height] family`
fn expand_font(value: &str, important: bool) -> Vec<Declaration> {
    let parts = split_components(value);
    let mut out = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let lower = part.to_ascii_lowercase();
        match lower.as_str() {
            "italic" | "oblique" => out.push(Declaration::new("font-style", lower, important)),
            "bold" | "bolder" | "lighter" | "100" | "200" | "300" | "400" | "500" | "600"
            | "700" | "800" | "900" => {
                out.push(Declaration::new("font-weight", lower, important))
            }
            "normal" | "small-caps" => {}
            _ => {
                let size = part.split('/').next().unwrap_or_default();
                out.push(Declaration::new("font-size", size, important));
                // "12pt/1.2" splits into three components.
                let mut rest = i + 1;
                if parts.get(rest) == Some(&"/") {
                    rest += 2;
                }
                let family = parts[rest.min(parts.len())..]
                    .join(" ")
                    .replace(" ,", ",");
                if !family.is_empty() {
                    out.push(Declaration::new("font-family", family, important));
                }
                break;
            }
        }
    }
    out
}
