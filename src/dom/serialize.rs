//! XML serialization of output trees.
//!
//! The root element declares the XHTML default namespace and the `mbp`
//! prefix. Elements without children are written self-closed, which is the
//! form Mobipocket readers expect for `br`, `hr`, `img` and `mbp:pagebreak`.

use std::fmt::Write;

use html5ever::ns;

use super::arena::{ArenaDom, NodeData, NodeId};

pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const MBP_NS: &str = "http://mobipocket.com/ns/mbp";

/// Serialize the whole document.
pub fn serialize(dom: &ArenaDom) -> String {
    let mut out = String::new();
    for child in dom.children(dom.document()) {
        write_node(dom, child, true, &mut out);
    }
    out
}

/// Serialize one subtree without namespace declarations.
pub fn serialize_fragment(dom: &ArenaDom, node: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, node, false, &mut out);
    out
}

fn write_node(dom: &ArenaDom, id: NodeId, is_root: bool, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };
    match &node.data {
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::Element { name, attrs, .. } => {
            let tag = if name.ns == ns!(html) || name.ns == ns!() {
                name.local.to_string()
            } else if &*name.ns == MBP_NS {
                format!("mbp:{}", name.local)
            } else {
                name.local.to_string()
            };

            out.push('<');
            out.push_str(&tag);
            if is_root {
                let _ = write!(out, r#" xmlns="{XHTML_NS}" xmlns:mbp="{MBP_NS}""#);
            }
            for attr in attrs {
                let _ = write!(out, r#" {}="{}""#, attr.name.local, escape_attr(&attr.value));
            }

            if node.first_child.is_none() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in dom.children(id) {
                write_node(dom, child, false, out);
            }
            let _ = write!(out, "</{tag}>");
        }
        NodeData::Document | NodeData::Comment(_) | NodeData::Doctype { .. } => {}
    }
}

fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
