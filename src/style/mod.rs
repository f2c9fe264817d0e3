//! CSS cascade for source documents.
//!
//! The converter only ever asks one question of this module: what is the
//! computed style of an element. [`StyleResolver`] is that question;
//! [`Stylizer`] answers it by running the cascade over a whole document
//! up front.

mod computed;
mod selector;
mod stylesheet;
mod user_agent;

use std::cmp::Ordering;
use std::collections::HashMap;

pub use computed::{
    BaselineShift, ComputedStyle, Display, Float, FontStyle, Length, PageBreak, TextAlign,
    TextDecoration, TextIndent, VerticalAlign, Visibility, WhiteSpace,
};
pub use selector::{MobiSelectors, NodeRef};
pub use stylesheet::{
    CssRule, Declaration, Origin, Specificity, Stylesheet, parse_declarations, split_components,
};
pub use user_agent::user_agent_stylesheet;

use crate::dom::{ArenaDom, NodeId};
use crate::profile::OutputProfile;

/// Source of computed styles for the elements of one document.
pub trait StyleResolver {
    /// Style of `node`, or `None` for nodes that have none (text, comments).
    fn style(&self, node: NodeId) -> Option<&ComputedStyle>;
}

/// A stylesheet referenced by a document.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleSource {
    /// `<link rel="stylesheet" href>`; the href as written.
    Linked(String),
    /// Contents of a `<style>` element.
    Embedded(String),
}

/// Stylesheets of a document, in document order.
pub fn extract_stylesheets(dom: &ArenaDom) -> Vec<StyleSource> {
    dom.descendants(dom.document())
        .filter_map(|node| match dom.element_name(node)?.as_ref() {
            "style" => Some(StyleSource::Embedded(dom.text_of(node))),
            "link" => {
                let rel = dom.get_attr(node, "rel")?.to_ascii_lowercase();
                let is_sheet = rel.split_whitespace().any(|r| r == "stylesheet")
                    && !rel.split_whitespace().any(|r| r == "alternate");
                is_sheet
                    .then(|| dom.get_attr(node, "href"))
                    .flatten()
                    .map(|href| StyleSource::Linked(href.to_string()))
            }
            _ => None,
        })
        .collect()
}

/// A declaration that applies to the element being styled, with its cascade
/// position.
struct MatchedDeclaration<'a> {
    declaration: &'a Declaration,
    origin: Origin,
    specificity: Specificity,
    order: usize,
}

fn cascade_order(a: &MatchedDeclaration<'_>, b: &MatchedDeclaration<'_>) -> Ordering {
    a.declaration
        .important
        .cmp(&b.declaration.important)
        .then(a.origin.cmp(&b.origin))
        .then(a.specificity.cmp(&b.specificity))
        .then(a.order.cmp(&b.order))
}

/// Computed styles for every element of a document.
#[derive(Debug, Default)]
pub struct Stylizer {
    styles: HashMap<NodeId, ComputedStyle>,
}

impl Stylizer {
    /// Run the cascade with the user-agent sheet beneath `author` sheets.
    pub fn new(dom: &ArenaDom, author: &[Stylesheet], profile: &OutputProfile) -> Self {
        let user_agent = user_agent_stylesheet();
        let mut sheets = vec![(&user_agent, Origin::UserAgent)];
        sheets.extend(author.iter().map(|sheet| (sheet, Origin::Author)));

        let root = ComputedStyle::initial(profile);
        let mut styles: HashMap<NodeId, ComputedStyle> = HashMap::new();
        let mut stack: Vec<(NodeId, Option<NodeId>)> = dom
            .children(dom.document())
            .map(|child| (child, None))
            .collect();
        stack.reverse();

        while let Some((node, parent)) = stack.pop() {
            if !dom.is_element(node) {
                continue;
            }
            let parent_style = parent.and_then(|p| styles.get(&p)).unwrap_or(&root);
            let declared = cascaded_declarations(dom, node, &sheets);
            let style = ComputedStyle::cascade(parent_style, declared, profile);
            styles.insert(node, style);

            let start = stack.len();
            stack.extend(dom.children(node).map(|child| (child, Some(node))));
            stack[start..].reverse();
        }

        Self { styles }
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl StyleResolver for Stylizer {
    fn style(&self, node: NodeId) -> Option<&ComputedStyle> {
        self.styles.get(&node)
    }
}

/// The winning raw value of every property declared for `node`.
fn cascaded_declarations(
    dom: &ArenaDom,
    node: NodeId,
    sheets: &[(&Stylesheet, Origin)],
) -> HashMap<String, String> {
    let mut matched = Vec::new();
    let mut order = 0;

    for (sheet, origin) in sheets {
        for rule in &sheet.rules {
            let Some(specificity) = rule
                .selectors
                .iter()
                .filter(|sel| selector::matches(sel, dom, node))
                .map(Specificity::from_selector)
                .max()
            else {
                continue;
            };
            for declaration in &rule.declarations {
                matched.push(MatchedDeclaration {
                    declaration,
                    origin: *origin,
                    specificity,
                    order,
                });
                order += 1;
            }
        }
    }

    let inline = dom
        .get_attr(node, "style")
        .map(parse_declarations)
        .unwrap_or_default();
    for declaration in &inline {
        matched.push(MatchedDeclaration {
            declaration,
            origin: Origin::Inline,
            specificity: Specificity::default(),
            order,
        });
        order += 1;
    }

    matched.sort_by(cascade_order);
    matched
        .into_iter()
        .map(|m| (m.declaration.property.clone(), m.declaration.value.clone()))
        .collect()
}
