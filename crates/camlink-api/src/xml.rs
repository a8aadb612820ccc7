// Namespace-agnostic XML helpers over roxmltree.
//
// Camera firmwares disagree on namespace prefixes (and sometimes on the
// namespaces themselves), so lookups match on local element names only.

use roxmltree::{Document, Node};

use crate::error::Error;

/// Parse a response body, keeping a copy of the body on failure.
pub(crate) fn parse(body: &str) -> Result<Document<'_>, Error> {
    Document::parse(body).map_err(|e| Error::Xml {
        message: e.to_string(),
        body: body.to_owned(),
    })
}

/// First descendant (including `node` itself) with the given local name.
pub(crate) fn find<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// All descendants with the given local name, in document order.
pub(crate) fn find_all<'a, 'i: 'a>(
    node: Node<'a, 'i>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    node.descendants()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Direct child element with the given local name.
pub(crate) fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Walk a chain of direct children by local name.
pub(crate) fn path<'a, 'i>(node: Node<'a, 'i>, names: &[&str]) -> Option<Node<'a, 'i>> {
    names.iter().try_fold(node, |cur, name| child(cur, name))
}

/// Trimmed, non-empty text content of an element.
pub(crate) fn text(node: Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Text of the first descendant with the given local name.
pub(crate) fn find_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    find(node, name).and_then(text)
}

/// Text of a direct-child chain.
pub(crate) fn path_text(node: Node<'_, '_>, names: &[&str]) -> Option<String> {
    path(node, names).and_then(text)
}

pub(crate) fn parse_num<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.parse().ok())
}

/// Escape text for inclusion in element content or attribute values.
pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
