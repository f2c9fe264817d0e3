//! Document trees: parsing into an arena and writing MobiML back out.

mod arena;
mod serialize;
mod tree_sink;

pub use arena::{ArenaDom, Attribute, ChildrenIter, Descendants, Node, NodeData, NodeId};
pub use serialize::{MBP_NS, XHTML_NS, serialize, serialize_fragment};
pub use tree_sink::ArenaSink;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use crate::util::decode_document;

/// Parse (X)HTML text into an arena tree.
pub fn parse_html(html: &str) -> ArenaDom {
    parse_document(ArenaSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Parse raw document bytes, detecting their encoding first.
pub fn parse_html_bytes(bytes: &[u8]) -> ArenaDom {
    parse_html(&decode_document(bytes))
}
