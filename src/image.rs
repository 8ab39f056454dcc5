// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use base64::Engine;

use crate::{Error, FontStore};

const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml";

/// Checks that an image source is an embedded SVG.
#[inline]
pub fn is_svg_data_uri(src: &str) -> bool {
    src.starts_with(SVG_DATA_URI_PREFIX)
}

/// Wraps SVG markup into a base64 data URI.
///
/// Unlike a file or an object URL, a data URI is self-contained,
/// so the image can be decoded without any resource resolving.
pub fn svg_data_uri(markup: &str) -> String {
    let data = base64::engine::general_purpose::STANDARD.encode(markup.as_bytes());
    format!("{};base64,{}", SVG_DATA_URI_PREFIX, data)
}

/// Decodes the payload of an SVG data URI into text.
pub fn decode_svg_data_uri(uri: &str) -> Result<String, Error> {
    let url = data_url::DataUrl::process(uri)
        .map_err(|e| Error::Decode(format!("malformed data URI ({:?})", e)))?;

    let mime = url.mime_type();
    if mime.type_ != "image" || mime.subtype != "svg+xml" {
        return Err(Error::Decode(format!(
            "'{}/{}' is not an SVG image",
            mime.type_, mime.subtype
        )));
    }

    let (mut data, _) = url
        .decode_to_vec()
        .map_err(|_| Error::Decode("invalid base64 data".to_string()))?;

    if data.starts_with(&[0x1f, 0x8b]) {
        data = usvg::decompress_svgz(&data).map_err(|e| Error::Decode(e.to_string()))?;
    }

    String::from_utf8(data)
        .map_err(|_| Error::Decode("provided data has not an UTF-8 encoding".to_string()))
}

/// A decoded image resource.
pub struct ImageResource {
    tree: usvg::Tree,
    payload: String,
}

impl ImageResource {
    /// Decodes an image from an SVG data URI.
    ///
    /// `default_size` is used when the SVG has neither a `viewBox`
    /// nor absolute `width` and `height`.
    pub fn from_data_uri(
        uri: &str,
        default_size: Option<usvg::Size>,
        fonts: &FontStore,
    ) -> Result<Self, Error> {
        let payload = decode_svg_data_uri(uri)?;
        let tree = parse_svg(&payload, default_size, fonts)?;
        Ok(ImageResource { tree, payload })
    }

    /// Returns the decoded tree.
    #[inline]
    pub fn tree(&self) -> &usvg::Tree {
        &self.tree
    }

    /// Returns the decoded SVG text.
    #[inline]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Returns image's intrinsic size.
    #[inline]
    pub fn intrinsic_size(&self) -> usvg::Size {
        self.tree.size()
    }

    /// Returns image's size in whole pixels.
    ///
    /// A side smaller than half a pixel is zero.
    pub fn natural_size(&self) -> (u32, u32) {
        let size = self.tree.size();
        (
            size.width().round() as u32,
            size.height().round() as u32,
        )
    }
}

impl std::fmt::Debug for ImageResource {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        let (w, h) = self.natural_size();
        write!(f, "ImageResource {{ natural_size: {}x{} }}", w, h)
    }
}

/// Parses SVG text into a render tree.
#[cfg_attr(not(feature = "text"), allow(unused_variables))]
pub(crate) fn parse_svg(
    text: &str,
    default_size: Option<usvg::Size>,
    fonts: &FontStore,
) -> Result<usvg::Tree, Error> {
    let xml_opt = usvg::roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let xml_tree = usvg::roxmltree::Document::parse_with_options(text, xml_opt)
        .map_err(|e| Error::Decode(e.to_string()))?;

    #[cfg(feature = "text")]
    let has_text_nodes = xml_tree
        .descendants()
        .any(|n| n.has_tag_name((crate::dom::SVG_NS, "text")));

    let mut opt = usvg::Options::default();
    opt.shape_rendering = usvg::ShapeRendering::GeometricPrecision;
    opt.image_rendering = usvg::ImageRendering::OptimizeQuality;
    if let Some(size) = default_size {
        opt.default_size = size;
    }

    usvg::Tree::from_xmltree(
        &xml_tree,
        &opt,
        #[cfg(feature = "text")]
        fonts.database(has_text_nodes),
    )
    .map_err(|e| Error::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40.4" height="20"><rect width="10" height="10"/></svg>"#;

    #[test]
    fn data_uri_round_trip_keeps_payload() {
        let uri = svg_data_uri(SVG);
        assert!(is_svg_data_uri(&uri));
        assert_eq!(decode_svg_data_uri(&uri).unwrap(), SVG);
    }

    #[test]
    fn percent_encoded_uri() {
        let uri = "data:image/svg+xml,%3Csvg%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%2F%3E";
        assert_eq!(
            decode_svg_data_uri(uri).unwrap(),
            r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#
        );
    }

    #[test]
    fn png_uri_is_rejected() {
        let err = decode_svg_data_uri("data:image/png;base64,iVBORw0KGgo=").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn natural_size_is_rounded() {
        let fonts = FontStore::default();
        let img = ImageResource::from_data_uri(&svg_data_uri(SVG), None, &fonts).unwrap();
        assert_eq!(img.natural_size(), (40, 20));
        assert!(!fonts.is_loaded());
    }

    #[test]
    fn broken_svg() {
        let fonts = FontStore::default();
        let uri = svg_data_uri("<svg xmlns=\"http://www.w3.org/2000/svg\"><rect>");
        assert!(matches!(
            ImageResource::from_data_uri(&uri, None, &fonts),
            Err(Error::Decode(_))
        ));
    }
}
