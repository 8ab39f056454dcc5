// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use super::{Attribute, Document, NodeData, NodeId, NodeKind};
use crate::Error;

impl Document {
    /// Parses a [`Document`] from a string.
    ///
    /// The page must be well-formed XML, like XHTML or a standalone SVG.
    pub fn parse(text: &str) -> Result<Document, Error> {
        let xml_opt = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };

        let xml = roxmltree::Document::parse_with_options(text, xml_opt)?;
        Ok(Document::parse_tree(&xml))
    }

    /// Parses a [`Document`] from a [`roxmltree::Document`].
    pub fn parse_tree(xml: &roxmltree::Document) -> Document {
        parse(xml)
    }

    fn append(&mut self, parent_id: NodeId, kind: NodeKind) -> NodeId {
        let new_child_id = NodeId::from(self.nodes.len());
        self.nodes.push(NodeData {
            parent: Some(parent_id),
            next_sibling: None,
            children: None,
            kind,
        });

        let last_child_id = self.nodes[parent_id.get_usize()].children.map(|(_, id)| id);

        if let Some(id) = last_child_id {
            self.nodes[id.get_usize()].next_sibling = Some(new_child_id);
        }

        self.nodes[parent_id.get_usize()].children = Some(
            if let Some((first_child_id, _)) = self.nodes[parent_id.get_usize()].children {
                (first_child_id, new_child_id)
            } else {
                (new_child_id, new_child_id)
            },
        );

        new_child_id
    }
}

fn parse(xml: &roxmltree::Document) -> Document {
    let mut doc = Document {
        nodes: Vec::new(),
        links: HashMap::new(),
    };

    // Add a root node.
    doc.nodes.push(NodeData {
        parent: None,
        next_sibling: None,
        children: None,
        kind: NodeKind::Root,
    });

    parse_xml_node_children(xml.root(), doc.root().id, &mut doc);

    // Collect all elements with `id` attribute.
    // Like in a browser, the first element wins.
    let mut links = HashMap::new();
    for node in doc.descendants() {
        if let Some(id) = node.attribute("id") {
            links.entry(id.to_string()).or_insert(node.id);
        }
    }
    doc.links = links;

    doc
}

fn parse_xml_node_children(parent: roxmltree::Node, parent_id: NodeId, doc: &mut Document) {
    for node in parent.children() {
        parse_xml_node(node, parent_id, doc);
    }
}

fn parse_xml_node(node: roxmltree::Node, parent_id: NodeId, doc: &mut Document) {
    match node.node_type() {
        roxmltree::NodeType::Element => {
            let attributes = node
                .attributes()
                .map(|attr| Attribute {
                    namespace: attr.namespace().map(String::from),
                    name: attr.name().to_string(),
                    value: attr.value().to_string(),
                })
                .collect();

            let kind = NodeKind::Element {
                namespace: node.tag_name().namespace().map(String::from),
                tag_name: node.tag_name().name().to_string(),
                attributes,
            };

            let node_id = doc.append(parent_id, kind);
            parse_xml_node_children(node, node_id, doc);
        }
        roxmltree::NodeType::Text => {
            if let Some(text) = node.text() {
                doc.append(parent_id, NodeKind::Text(text.to_string()));
            }
        }
        // Comments and processing instructions are not part of the rendered page.
        _ => {}
    }
}
