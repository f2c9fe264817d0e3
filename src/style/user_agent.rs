//! Built-in defaults for HTML elements.

use super::stylesheet::Stylesheet;

const USER_AGENT_CSS: &str = r#"
html, body, div, section, article, aside, nav, header, footer, main,
address, figure, figcaption, details, summary, center, dl, dt, dd,
form, fieldset, hgroup, noscript {
    display: block;
}

head, script, style, title, meta, link, base, template {
    display: none;
}

h1, h2, h3, h4, h5, h6 {
    display: block;
    font-weight: bold;
}
h1 { font-size: 2em; margin-top: 0.67em; margin-bottom: 0.67em; }
h2 { font-size: 1.5em; margin-top: 0.83em; margin-bottom: 0.83em; }
h3 { font-size: 1.17em; margin-top: 1em; margin-bottom: 1em; }
h4 { margin-top: 1.33em; margin-bottom: 1.33em; }
h5 { font-size: 0.83em; margin-top: 1.67em; margin-bottom: 1.67em; }
h6 { font-size: 0.67em; margin-top: 2.33em; margin-bottom: 2.33em; }

p {
    display: block;
    margin-top: 1em;
    margin-bottom: 1em;
}

blockquote {
    display: block;
    margin: 1em 40px;
}

pre {
    display: block;
    white-space: pre;
    font-family: monospace;
    margin-top: 1em;
    margin-bottom: 1em;
}

hr {
    display: block;
    margin-top: 0.5em;
    margin-bottom: 0.5em;
}

ul, ol, dir, menu {
    display: block;
    margin-top: 1em;
    margin-bottom: 1em;
    padding-left: 40px;
}
li { display: list-item; }
dd { margin-left: 40px; }
center { text-align: center; }

table { display: table; }
caption { display: table-caption; text-align: center; }
thead, tbody, tfoot { display: table-row-group; }
col, colgroup { display: table-column; }
tr { display: table-row; }
td, th { display: table-cell; }
th { font-weight: bold; text-align: center; }

em, i, cite, var, dfn, address { font-style: italic; }
strong, b { font-weight: bold; }
code, kbd, samp, tt { font-family: monospace; }
big { font-size: larger; }
small { font-size: smaller; }
sup { vertical-align: super; font-size: smaller; }
sub { vertical-align: sub; font-size: smaller; }
u, ins { text-decoration: underline; }
s, strike, del { text-decoration: line-through; }
"#;

/// The default stylesheet applied beneath every author sheet.
pub fn user_agent_stylesheet() -> Stylesheet {
    Stylesheet::parse(USER_AGENT_CSS)
}
