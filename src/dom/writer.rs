// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::borrow::Cow;

use xmlwriter::XmlWriter;

use super::{Node, NodeKind, SVG_NS, XLINK_NS, XML_NAMESPACE_NS};

pub(crate) fn serialize(node: Node) -> String {
    if node.is_text() {
        return node.text().to_string();
    }

    let mut xml = XmlWriter::new(xmlwriter::Options {
        use_single_quote: false,
        indent: xmlwriter::Indent::None,
        attributes_indent: xmlwriter::Indent::None,
    });

    match node.d.kind {
        NodeKind::Element { .. } => write_root(node, &mut xml),
        NodeKind::Text(_) => {}
        NodeKind::Root => {
            for child in node.children().filter(|n| n.is_element()) {
                write_root(child, &mut xml);
            }
        }
    }

    xml.end_document()
}

fn write_root(node: Node, xml: &mut XmlWriter) {
    let namespaces = Namespaces::new(node);
    write_element(node, None, &namespaces, false, true, xml);
}

/// Namespaces of a standalone image.
struct Namespaces<'a> {
    /// An `svg` without its own namespace declaration inherits the page one,
    /// which has to be replaced with the SVG one.
    inherited: Option<Option<&'a str>>,
    xlink: bool,
    /// Attribute namespaces without a well-known prefix, in document order.
    /// Each one is written as `ns1`, `ns2` and so on.
    other: Vec<&'a str>,
}

impl<'a> Namespaces<'a> {
    fn new(root: Node<'a>) -> Self {
        let inherited = if root.has_tag_name("svg") && root.namespace() != Some(SVG_NS) {
            Some(root.namespace())
        } else {
            None
        };

        let mut xlink = false;
        let mut other = Vec::new();
        for attr in root.descendants().flat_map(|n| n.attributes()) {
            match attr.namespace.as_deref() {
                None | Some(XML_NAMESPACE_NS) => {}
                Some(XLINK_NS) => xlink = true,
                Some(ns) => {
                    if !other.contains(&ns) {
                        other.push(ns);
                    }
                }
            }
        }

        Namespaces {
            inherited,
            xlink,
            other,
        }
    }

    fn resolve(&self, node: Node<'a>, in_foreign: bool) -> Option<&'a str> {
        match self.inherited {
            Some(ns) if !in_foreign && node.namespace() == ns => Some(SVG_NS),
            _ => node.namespace(),
        }
    }

    fn prefix(&self, ns: &str) -> String {
        match ns {
            XLINK_NS => "xlink".to_string(),
            XML_NAMESPACE_NS => "xml".to_string(),
            _ => {
                let idx = self.other.iter().position(|n| *n == ns).unwrap_or(0);
                format!("ns{}", idx + 1)
            }
        }
    }

    fn declare(&self, xml: &mut XmlWriter) {
        if self.xlink {
            xml.write_attribute("xmlns:xlink", XLINK_NS);
        }

        for (i, ns) in self.other.iter().enumerate() {
            xml.write_attribute(&format!("xmlns:ns{}", i + 1), &escape_attribute(ns));
        }
    }
}

fn write_element<'a>(
    node: Node<'a>,
    parent_ns: Option<&str>,
    namespaces: &Namespaces<'a>,
    in_foreign: bool,
    is_root: bool,
    xml: &mut XmlWriter,
) {
    let tag_name = match node.tag_name() {
        Some(name) => name,
        None => {
            if node.is_text() {
                xml.write_text(&escape_text(node.text()));
            }

            return;
        }
    };

    let ns = namespaces.resolve(node, in_foreign);

    xml.start_element(tag_name);

    if ns != parent_ns {
        if let Some(ns) = ns {
            xml.write_attribute("xmlns", &escape_attribute(ns));
        }
    }

    if is_root {
        namespaces.declare(xml);
    }

    for attr in node.attributes() {
        let value = escape_attribute(&attr.value);
        match attr.namespace.as_deref() {
            None => xml.write_attribute(&attr.name, &value),
            Some(ns) => {
                let name = format!("{}:{}", namespaces.prefix(ns), attr.name);
                xml.write_attribute(&name, &value);
            }
        }
    }

    let in_foreign = in_foreign || node.has_tag_name("foreignObject");
    for child in node.children() {
        write_element(child, ns, namespaces, in_foreign, false, xml);
    }

    xml.end_element();
}

// `xmlwriter` escapes only `<` in text and only quotes in attribute values.

fn escape_text(text: &str) -> Cow<str> {
    if text.contains('&') {
        Cow::Owned(text.replace('&', "&amp;"))
    } else {
        Cow::Borrowed(text)
    }
}

fn escape_attribute(value: &str) -> Cow<str> {
    if value.contains(&['&', '<'][..]) {
        Cow::Owned(value.replace('&', "&amp;").replace('<', "&lt;"))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::Document;

    #[test]
    fn adds_svg_namespace() {
        let doc = Document::parse(
            r#"<div><svg viewBox="0 0 10 10"><rect width="5" height="5"/></svg></div>"#,
        )
        .unwrap();
        let svg = doc.root_element().first_element_child().unwrap();
        assert_eq!(
            svg.to_markup(),
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><rect width="5" height="5"/></svg>"#
        );
    }

    #[test]
    fn keeps_xlink_and_foreign_namespaces() {
        let doc = Document::parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a"/><foreignObject><div xmlns="http://www.w3.org/1999/xhtml">A &amp; B</div></foreignObject></svg>"##,
        )
        .unwrap();
        assert_eq!(
            doc.root_element().to_markup(),
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a"/><foreignObject><div xmlns="http://www.w3.org/1999/xhtml">A &amp; B</div></foreignObject></svg>"##
        );
    }

    #[test]
    fn replaces_page_namespace() {
        let doc = Document::parse(
            r#"<html xmlns="http://www.w3.org/1999/xhtml"><svg width="5" height="5"><rect width="5" height="5"/></svg></html>"#,
        )
        .unwrap();
        let svg = doc.root_element().first_element_child().unwrap();
        assert_eq!(
            svg.to_markup(),
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="5" height="5"><rect width="5" height="5"/></svg>"#
        );
    }

    #[test]
    fn escapes_text_and_attributes() {
        let text = r#"<svg xmlns="http://www.w3.org/2000/svg" aria-label="A &amp; B &lt; C &quot;D&quot;"><text>A &amp; B &lt; C</text></svg>"#;
        let markup = Document::parse(text).unwrap().root_element().to_markup();
        assert_eq!(markup, text);

        let reparsed = Document::parse(&markup).unwrap();
        let svg = reparsed.root_element();
        assert_eq!(svg.attribute("aria-label"), Some(r#"A & B < C "D""#));
        assert_eq!(svg.first_element_child().unwrap().text(), "A & B < C");
    }

    #[test]
    fn prefixes_unknown_attribute_namespaces() {
        let doc = Document::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:ev="http://www.w3.org/2001/xml-events"><rect xml:space="preserve" ev:event="click"/></svg>"#,
        )
        .unwrap();
        assert_eq!(
            doc.root_element().to_markup(),
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:ns1="http://www.w3.org/2001/xml-events"><rect xml:space="preserve" ns1:event="click"/></svg>"#
        );
    }

    #[test]
    fn stable_output() {
        let text = r#"<svg xmlns="http://www.w3.org/2000/svg" id="m"><style>.a{fill:red}</style><g class="a"/></svg>"#;
        let a = Document::parse(text).unwrap().root_element().to_markup();
        let b = Document::parse(text).unwrap().root_element().to_markup();
        assert_eq!(a, b);
    }
}
