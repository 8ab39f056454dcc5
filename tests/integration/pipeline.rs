use mermaid_png::dimensions::{self, DimensionSource, Dimensions};
use mermaid_png::dom::Document;
use mermaid_png::image::{svg_data_uri, ImageResource};
use mermaid_png::raster::{target_size, DEFAULT_TARGET_DPI, SOURCE_DPI};
use mermaid_png::{FontStore, Rasterizer};

use crate::*;

#[test]
fn end_to_end_size_at_default_resolution() {
    let page = notes_page();
    let svg = page.element_by_id("mermaid-1").unwrap();

    let (dims, source) = dimensions::resolve(svg, None, &FontStore::default());
    assert_eq!(source, DimensionSource::ViewBox);

    let size = target_size(dims, DEFAULT_TARGET_DPI as f32).unwrap();
    assert_eq!((size.width(), size.height()), (10435, 5217));

    let blob = Rasterizer::default()
        .rasterize_svg(svg, None, DEFAULT_TARGET_DPI as f32)
        .unwrap();
    assert_eq!((blob.width(), blob.height()), (10435, 5217));
    assert!(!blob.is_empty());
}

#[test]
fn proxy_size_wins() {
    let fonts = FontStore::default();
    let doc = Document::parse(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 5 5"/>"#,
    )
    .unwrap();

    let uri = svg_data_uri(r#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300"/>"#);
    let proxy = ImageResource::from_data_uri(&uri, None, &fonts).unwrap();

    let (dims, source) = dimensions::resolve(doc.root_element(), Some(&proxy), &fonts);
    assert_eq!(source, DimensionSource::Proxy);
    assert_eq!(dims, Dimensions::new(400.0, 300.0).unwrap());
}

#[test]
fn identity_scale_render() {
    let page = notes_page();
    let svg = page.element_by_id("role").unwrap();
    let blob = Rasterizer::default()
        .rasterize_svg(svg, None, SOURCE_DPI)
        .unwrap();
    assert_eq!((blob.width(), blob.height()), (30, 20));
    assert!(!blob.is_empty());
}

#[test]
fn serialized_markup_is_stable() {
    let page = notes_page();
    let svg = page.element_by_id("mermaid-1").unwrap();
    assert_eq!(svg.to_markup(), svg.to_markup());
    assert_eq!(svg.to_markup(), notes_page().element_by_id("mermaid-1").unwrap().to_markup());
    assert!(svg.to_markup().starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
}

#[test]
fn no_text_no_fonts() {
    let page = notes_page();
    let rasterizer = Rasterizer::default();
    rasterizer
        .rasterize_svg(page.element_by_id("mermaid-1").unwrap(), None, 11.5)
        .unwrap();
    assert!(!rasterizer.fonts().is_loaded());
}
