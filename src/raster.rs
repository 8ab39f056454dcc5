// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::dimensions::{self, Dimensions, FALLBACK_SIZE};
use crate::dom::Node;
use crate::image::{svg_data_uri, ImageResource};
use crate::{Error, FontStore};

/// Assumed resolution of a rendered diagram.
///
/// An empirical calibration value. Do not derive it.
pub const SOURCE_DPI: f32 = 11.5;

/// Target resolution used when nothing is configured.
pub const DEFAULT_TARGET_DPI: u32 = 600;

/// The maximum side of a drawing surface.
pub const MAX_SURFACE_SIDE: u32 = 32767;

/// The maximum area of a drawing surface.
pub const MAX_SURFACE_AREA: u64 = 268_435_456;

/// Returns the scale from source pixels to output pixels.
#[inline]
pub fn scale_factor(target_dpi: f32) -> f64 {
    target_dpi as f64 / SOURCE_DPI as f64
}

/// Returns the output surface size for a source size.
///
/// Each side is `round(side * target_dpi / 11.5)`.
/// Returns `None` when a side rounds to zero or does not fit into `u32`.
pub fn target_size(dims: Dimensions, target_dpi: f32) -> Option<tiny_skia::IntSize> {
    let scale = scale_factor(target_dpi);
    let w = (dims.width as f64 * scale).round();
    let h = (dims.height as f64 * scale).round();

    if !(w >= 1.0 && h >= 1.0 && w <= u32::MAX as f64 && h <= u32::MAX as f64) {
        return None;
    }

    tiny_skia::IntSize::from_wh(w as u32, h as u32)
}

/// A PNG-encoded image.
#[derive(Clone, PartialEq)]
pub struct PngBlob {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl PngBlob {
    /// The MIME type of the blob.
    pub const MIME_TYPE: &'static str = "image/png";

    /// Encodes a pixmap.
    pub fn from_pixmap(pixmap: &tiny_skia::Pixmap) -> Result<Self, Error> {
        let data = pixmap
            .encode_png()
            .map_err(|e| Error::Export(e.to_string()))?;

        if data.is_empty() {
            return Err(Error::Export("no data".to_string()));
        }

        Ok(PngBlob {
            data,
            width: pixmap.width(),
            height: pixmap.height(),
        })
    }

    /// Returns the encoded data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the image width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the image height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the encoded data length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks that the blob has no data.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the encoded data.
    #[inline]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl std::fmt::Debug for PngBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "PngBlob {{ size: {}x{}, len: {} }}",
            self.width,
            self.height,
            self.data.len()
        )
    }
}

/// Converts diagrams into PNG images.
#[derive(Debug, Default)]
pub struct Rasterizer {
    fonts: FontStore,
}

impl Rasterizer {
    /// Creates a new rasterizer.
    pub fn new(fonts: FontStore) -> Self {
        Rasterizer { fonts }
    }

    /// Returns the fonts used for text rendering.
    pub fn fonts(&self) -> &FontStore {
        &self.fonts
    }

    /// Rasterizes an inline `svg` element.
    ///
    /// `proxy` is an already decoded copy of the same diagram.
    /// When set, its natural size is preferred over element's attributes.
    pub fn rasterize_svg(
        &self,
        svg: Node,
        proxy: Option<&ImageResource>,
        target_dpi: f32,
    ) -> Result<PngBlob, Error> {
        let (dims, source) = dimensions::resolve(svg, proxy, &self.fonts);
        log::debug!(
            "Source size: {}x{} (from {:?}).",
            dims.width,
            dims.height,
            source
        );

        let mut pixmap = new_surface(dims, target_dpi)?;

        let uri = svg_data_uri(&svg.to_markup());
        let image = ImageResource::from_data_uri(&uri, dims.to_size(), &self.fonts)?;

        draw(&image, &mut pixmap);
        PngBlob::from_pixmap(&pixmap)
    }

    /// Rasterizes an `img` element with an SVG data URI source.
    pub fn rasterize_proxy(&self, img: Node, target_dpi: f32) -> Result<PngBlob, Error> {
        let src = img.attribute("src").unwrap_or_default();
        let image = ImageResource::from_data_uri(src, None, &self.fonts)?;

        let dims = proxy_dimensions(img, &image);
        log::debug!("Source size: {}x{} (from Proxy).", dims.width, dims.height);

        let mut pixmap = new_surface(dims, target_dpi)?;
        draw(&image, &mut pixmap);
        PngBlob::from_pixmap(&pixmap)
    }
}

/// Natural size first, then the element size, then the fallback, per side.
fn proxy_dimensions(img: Node, image: &ImageResource) -> Dimensions {
    let (natural_w, natural_h) = image.natural_size();
    let attr = |name: &str| -> f32 {
        img.attribute(name)
            .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
            .filter(|n| n.is_finite() && *n > 0.0)
            .unwrap_or(0.0)
    };

    let pick = |natural: u32, attribute: f32, fallback: f32| {
        if natural > 0 {
            natural as f32
        } else if attribute > 0.0 {
            attribute
        } else {
            fallback
        }
    };

    Dimensions {
        width: pick(natural_w, attr("width"), FALLBACK_SIZE.width),
        height: pick(natural_h, attr("height"), FALLBACK_SIZE.height),
    }
}

/// Allocates a transparent drawing surface.
fn new_surface(dims: Dimensions, target_dpi: f32) -> Result<tiny_skia::Pixmap, Error> {
    let unavailable = || {
        let scale = scale_factor(target_dpi);
        Error::SurfaceUnavailable {
            width: (dims.width as f64 * scale).round() as u32,
            height: (dims.height as f64 * scale).round() as u32,
        }
    };

    let size = target_size(dims, target_dpi).ok_or_else(unavailable)?;
    log::debug!(
        "Surface: {}x{} at {} DPI (scale {:.4}).",
        size.width(),
        size.height(),
        target_dpi,
        scale_factor(target_dpi)
    );

    if size.width() > MAX_SURFACE_SIDE
        || size.height() > MAX_SURFACE_SIDE
        || size.width() as u64 * size.height() as u64 > MAX_SURFACE_AREA
    {
        return Err(unavailable());
    }

    tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(unavailable)
}

/// Draws an image stretched over the whole surface.
fn draw(image: &ImageResource, pixmap: &mut tiny_skia::Pixmap) {
    let size = image.intrinsic_size();
    let ts = tiny_skia::Transform::from_scale(
        pixmap.width() as f32 / size.width(),
        pixmap.height() as f32 / size.height(),
    );

    resvg::render(image.tree(), ts, &mut pixmap.as_mut());
}
