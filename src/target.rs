// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Diagram detection.

use crate::dom::{self, Node};
use crate::image::{decode_svg_data_uri, is_svg_data_uri};
use crate::{Error, PngBlob, Rasterizer};

/// A rendered Markdown region selector.
pub const MARKDOWN_REGION_SELECTOR: &str = ".jp-RenderedMarkdown";

/// A diagram a context-menu target refers to.
#[derive(Clone, Copy, Debug)]
pub enum ConversionSource<'a> {
    /// An `img` element with an SVG data URI source.
    Proxy {
        /// The `img` element.
        img: Node<'a>,
        /// Its `src`.
        uri: &'a str,
    },
    /// An inline `svg` element.
    Vector {
        /// The `svg` element.
        svg: Node<'a>,
    },
}

impl<'a> ConversionSource<'a> {
    /// Resolves a context-menu target into a diagram.
    ///
    /// An `img` with an SVG data URI is used as is. Otherwise the closest
    /// `svg` ancestor (the target itself included) or the first `svg` descendant
    /// is used, but only when it looks like a Mermaid diagram.
    pub fn resolve(target: Node<'a>) -> Option<Self> {
        if target.has_tag_name("img") {
            if let Some(uri) = target.attribute("src") {
                if is_svg_data_uri(uri) {
                    return Some(ConversionSource::Proxy { img: target, uri });
                }
            }
        }

        let svg = find_svg(target)?;
        if is_mermaid(svg) {
            Some(ConversionSource::Vector { svg })
        } else {
            None
        }
    }

    /// Returns the diagram element.
    pub fn node(&self) -> Node<'a> {
        match *self {
            ConversionSource::Proxy { img, .. } => img,
            ConversionSource::Vector { svg } => svg,
        }
    }

    /// Returns the text the diagram identity is derived from.
    ///
    /// The serialized markup for an inline diagram
    /// and the decoded SVG text for an image.
    pub fn hash_content(&self) -> Result<String, Error> {
        match *self {
            ConversionSource::Proxy { uri, .. } => decode_svg_data_uri(uri),
            ConversionSource::Vector { svg } => Ok(svg.to_markup()),
        }
    }

    /// Converts the diagram into a PNG.
    pub fn rasterize(&self, rasterizer: &Rasterizer, target_dpi: u32) -> Result<PngBlob, Error> {
        match *self {
            ConversionSource::Proxy { img, .. } => {
                rasterizer.rasterize_proxy(img, target_dpi as f32)
            }
            ConversionSource::Vector { svg } => {
                rasterizer.rasterize_svg(svg, None, target_dpi as f32)
            }
        }
    }
}

/// Checks that a context-menu target refers to a diagram.
pub fn is_convertible(target: Node) -> bool {
    ConversionSource::resolve(target).is_some()
}

fn find_svg(target: Node) -> Option<Node> {
    if let Some(svg) = target.ancestors().find(|n| n.has_tag_name("svg")) {
        return Some(svg);
    }

    target.descendants().skip(1).find(|n| n.has_tag_name("svg"))
}

fn is_mermaid(svg: Node) -> bool {
    if svg.element_id().contains("mermaid") {
        return true;
    }

    if svg.attribute("aria-roledescription") == Some("mermaid") {
        return true;
    }

    match dom::parse_selector(MARKDOWN_REGION_SELECTOR) {
        Ok(selector) => svg.closest(&selector).is_some(),
        Err(_) => false,
    }
}
