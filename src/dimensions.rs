// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use crate::dom::Node;
use crate::{FontStore, ImageResource};

/// A size used when nothing else is known about a diagram.
pub const FALLBACK_SIZE: Dimensions = Dimensions {
    width: 800.0,
    height: 600.0,
};

/// A diagram size in source pixels.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Dimensions {
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Dimensions {
    /// Creates new dimensions.
    ///
    /// Returns `None` when any side is not a positive number.
    pub fn new(width: f32, height: f32) -> Option<Self> {
        let is_valid = |n: f32| n.is_finite() && n > 0.0;
        if is_valid(width) && is_valid(height) {
            Some(Dimensions { width, height })
        } else {
            None
        }
    }

    /// Converts dimensions into a `usvg` size.
    pub fn to_size(self) -> Option<usvg::Size> {
        usvg::Size::from_wh(self.width, self.height)
    }
}

/// Where the resolved dimensions came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DimensionSource {
    /// Natural size of a companion raster proxy.
    Proxy,
    /// `width` and `height` attributes.
    Attributes,
    /// The `viewBox` attribute.
    ViewBox,
    /// Measured content bounding box.
    BoundingBox,
    /// [`FALLBACK_SIZE`].
    Fallback,
}

/// Resolves the size of an `svg` element.
///
/// Never fails. Tries a raster proxy natural size, then `width` and `height`
/// attributes, then `viewBox`, then the content bounding box
/// and finally falls back to [`FALLBACK_SIZE`].
pub fn resolve(
    svg: Node,
    proxy: Option<&ImageResource>,
    fonts: &FontStore,
) -> (Dimensions, DimensionSource) {
    if let Some(proxy) = proxy {
        let (w, h) = proxy.natural_size();
        if let Some(dims) = Dimensions::new(w as f32, h as f32) {
            return (dims, DimensionSource::Proxy);
        }
    }

    if let (Some(w), Some(h)) = (svg.attribute("width"), svg.attribute("height")) {
        match (parse_length(w), parse_length(h)) {
            (Some(w), Some(h)) => {
                if let Some(dims) = Dimensions::new(w, h) {
                    return (dims, DimensionSource::Attributes);
                }
            }
            _ => log::warn!("Invalid SVG size: '{}' x '{}'.", w, h),
        }
    }

    if let Some(value) = svg.attribute("viewBox") {
        match svgtypes::ViewBox::from_str(value) {
            Ok(vb) => {
                if let Some(dims) = Dimensions::new(vb.w as f32, vb.h as f32) {
                    return (dims, DimensionSource::ViewBox);
                }
            }
            Err(_) => log::warn!("Invalid viewBox: '{}'.", value),
        }
    }

    match measure_bbox(svg, fonts) {
        Some(dims) => (dims, DimensionSource::BoundingBox),
        None => (FALLBACK_SIZE, DimensionSource::Fallback),
    }
}

/// Parses a length, ignoring any units.
///
/// `100px`, `100pt` and `100%` are all `100`.
fn parse_length(text: &str) -> Option<f32> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

/// Measures the content bounding box.
///
/// The element is mounted into a standalone, transient tree
/// with the fallback size as its viewport.
fn measure_bbox(svg: Node, fonts: &FontStore) -> Option<Dimensions> {
    let markup = svg.to_markup();
    let tree = match crate::image::parse_svg(&markup, FALLBACK_SIZE.to_size(), fonts) {
        Ok(tree) => tree,
        Err(e) => {
            log::error!("Failed to measure an SVG bounding box cause {}.", e);
            return None;
        }
    };

    let bbox = tree.root().abs_bounding_box();

    // An empty side falls back separately.
    let width = if bbox.width() > 0.0 {
        bbox.width()
    } else {
        FALLBACK_SIZE.width
    };
    let height = if bbox.height() > 0.0 {
        bbox.height()
    } else {
        FALLBACK_SIZE.height
    };

    Dimensions::new(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn resolve_str(text: &str) -> (Dimensions, DimensionSource) {
        let doc = Document::parse(text).unwrap();
        resolve(doc.root_element(), None, &FontStore::default())
    }

    #[test]
    fn attributes_with_units() {
        let (dims, source) = resolve_str(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="120px" height="40.5pt" viewBox="0 0 1 1"/>"#,
        );
        assert_eq!(source, DimensionSource::Attributes);
        assert_eq!(dims, Dimensions::new(120.0, 40.5).unwrap());
    }

    #[test]
    fn only_width_uses_view_box() {
        let (dims, source) = resolve_str(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="100%" viewBox="0 0 200 100"/>"#,
        );
        assert_eq!(source, DimensionSource::ViewBox);
        assert_eq!(dims, Dimensions::new(200.0, 100.0).unwrap());
    }

    #[test]
    fn comma_separated_view_box() {
        let (dims, source) =
            resolve_str(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="-5,-5,30,20"/>"#);
        assert_eq!(source, DimensionSource::ViewBox);
        assert_eq!(dims, Dimensions::new(30.0, 20.0).unwrap());
    }

    #[test]
    fn bounding_box() {
        let (dims, source) = resolve_str(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect x="10" y="10" width="50" height="20"/></svg>"#,
        );
        assert_eq!(source, DimensionSource::BoundingBox);
        assert_eq!(dims, Dimensions::new(50.0, 20.0).unwrap());
    }

    #[test]
    fn empty_bounding_box() {
        let (dims, source) = resolve_str(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#);
        assert_eq!(source, DimensionSource::BoundingBox);
        assert_eq!(dims, FALLBACK_SIZE);
    }

    #[test]
    fn invalid_view_box_is_measured() {
        let (dims, source) = resolve_str(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 0 0"><rect width="7" height="3"/></svg>"#,
        );
        assert_eq!(source, DimensionSource::BoundingBox);
        assert_eq!(dims, Dimensions::new(7.0, 3.0).unwrap());
    }

    #[test]
    fn parse_length_ignores_units() {
        assert_eq!(parse_length("100%"), Some(100.0));
        assert_eq!(parse_length("12.5em"), Some(12.5));
        assert_eq!(parse_length("auto"), None);
    }
}
