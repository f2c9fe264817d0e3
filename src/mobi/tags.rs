//! Classification of element names, computed once per element.

/// How the walk treats an element, by its (possibly retagged) name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Heading,
    Ol,
    Ul,
    Li,
    Table,
    Tr,
    Td,
    Th,
    Caption,
    Hr,
    Br,
    Img,
    A,
    Q,
    Blockquote,
    Body,
    Span,
    Div,
    /// Any element the walk has no special handling for.
    Other,
}

impl Tag {
    pub fn from_local(name: &str) -> Self {
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Self::Heading,
            "ol" => Self::Ol,
            "ul" => Self::Ul,
            "li" => Self::Li,
            "table" => Self::Table,
            "tr" => Self::Tr,
            "td" => Self::Td,
            "th" => Self::Th,
            "caption" => Self::Caption,
            "hr" => Self::Hr,
            "br" => Self::Br,
            "img" => Self::Img,
            "a" => Self::A,
            "q" => Self::Q,
            "blockquote" => Self::Blockquote,
            "body" => Self::Body,
            "span" => Self::Span,
            "div" => Self::Div,
            _ => Self::Other,
        }
    }

    /// Element name written for tags that produce their own output element.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::Ol => "ol",
            Self::Ul => "ul",
            Self::Li => "li",
            Self::Table => "table",
            Self::Tr => "tr",
            Self::Td => "td",
            Self::Th => "th",
            Self::Caption => "caption",
            Self::Hr => "hr",
            Self::Br => "br",
            Self::Img => "img",
            _ => return None,
        })
    }

    /// Containers that are emitted as themselves and stay open while their
    /// source element is walked.
    pub fn is_nestable(self) -> bool {
        matches!(
            self,
            Self::Ol | Self::Ul | Self::Li | Self::Table | Self::Tr | Self::Td | Self::Th | Self::Caption
        )
    }

    pub fn is_table(self) -> bool {
        matches!(
            self,
            Self::Table | Self::Tr | Self::Td | Self::Th | Self::Caption
        )
    }

    /// Tags that may sit directly in the body without a paragraph.
    pub fn is_special(self) -> bool {
        matches!(self, Self::Hr | Self::Br)
    }

    /// Void elements emitted regardless of text.
    pub fn is_content(self) -> bool {
        matches!(self, Self::Img | Self::Hr | Self::Br)
    }

    /// Cells always start a fresh paragraph.
    pub fn is_cell(self) -> bool {
        matches!(self, Self::Td | Self::Th)
    }

    pub fn is_list(self) -> bool {
        matches!(self, Self::Ul | Self::Ol)
    }

    /// Tags that are never wrapped in `sup`/`sub`.
    pub fn resists_shift(self) -> bool {
        self == Self::Heading || self.is_nestable() || self.is_special() || self.is_content()
    }

    /// What a table tag becomes when tables are disabled.
    pub fn without_tables(self) -> Self {
        match self {
            Self::Td => Self::Span,
            tag if tag.is_table() => Self::Div,
            tag => tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(Tag::from_local("h3"), Tag::Heading);
        assert_eq!(Tag::from_local("section"), Tag::Other);
        assert!(Tag::Li.is_nestable());
        assert!(!Tag::Li.is_table());
        assert!(Tag::Caption.is_table());
        assert!(Tag::Br.is_special() && Tag::Br.is_content());
        assert!(Tag::Img.is_content() && !Tag::Img.is_special());
        assert!(Tag::Th.is_cell());
    }

    #[test]
    fn test_shift_resistance() {
        for tag in [Tag::Heading, Tag::Ul, Tag::Td, Tag::Hr, Tag::Br, Tag::Img] {
            assert!(tag.resists_shift(), "{tag:?}");
        }
        for tag in [Tag::Span, Tag::A, Tag::Other, Tag::Q] {
            assert!(!tag.resists_shift(), "{tag:?}");
        }
    }

    #[test]
    fn test_without_tables() {
        assert_eq!(Tag::Td.without_tables(), Tag::Span);
        assert_eq!(Tag::Th.without_tables(), Tag::Div);
        assert_eq!(Tag::Table.without_tables(), Tag::Div);
        assert_eq!(Tag::Li.without_tables(), Tag::Li);
    }

    #[test]
    fn test_names() {
        assert_eq!(Tag::Tr.name(), Some("tr"));
        assert_eq!(Tag::Span.name(), None);
        for tag in [Tag::Ol, Tag::Li, Tag::Caption, Tag::Img, Tag::Hr, Tag::Br] {
            assert_eq!(tag.name().map(Tag::from_local), Some(tag));
        }
    }
}
