use mermaid_png::extension::{COPY_COMMAND, DOWNLOAD_COMMAND};
use mermaid_png::filename::content_hash;
use mermaid_png::settings::NullSettingRegistry;
use mermaid_png::sink::decode_rgba;
use mermaid_png::PngBlob;

use crate::*;

#[test]
fn paragraph_is_not_convertible() {
    let f = activate(None, None);
    let page = notes_page();
    f.app.dispatch_context_menu(&target(&page, "intro"));
    assert!(!f.app.commands.is_enabled(COPY_COMMAND));
    assert!(!f.app.commands.is_enabled(DOWNLOAD_COMMAND));
}

#[test]
fn svg_image_is_convertible() {
    let f = activate(None, None);
    let page = notes_page();
    f.app.dispatch_context_menu(&target(&page, "proxy"));
    assert!(f.app.commands.is_enabled(COPY_COMMAND));

    f.app.dispatch_context_menu(&target(&page, "photo"));
    assert!(!f.app.commands.is_enabled(COPY_COMMAND));
}

#[test]
fn mermaid_role_is_convertible() {
    let f = activate(None, None);
    let page = notes_page();
    f.app.dispatch_context_menu(&target(&page, "role"));
    assert!(f.app.commands.is_enabled(DOWNLOAD_COMMAND));

    f.app.dispatch_context_menu(&target(&page, "icon"));
    assert!(!f.app.commands.is_enabled(DOWNLOAD_COMMAND));
}

#[test]
fn context_menu_is_scoped_to_markdown() {
    let f = activate(None, None);
    let page = notes_page();

    let inside = target(&page, "node-a");
    f.app.dispatch_context_menu(&inside);
    let entries = f.app.context_menu_entries(&inside);
    let labels: Vec<_> = entries.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, ["Copy as PNG", "Save as PNG"]);
    assert!(entries.iter().all(|e| e.enabled));

    let outside = target(&page, "role");
    f.app.dispatch_context_menu(&outside);
    assert!(f.app.context_menu_entries(&outside).is_empty());
}

#[test]
fn palette_entries() {
    let f = activate(None, None);
    let commands: Vec<_> = f.palette.items.iter().map(|i| i.command.as_str()).collect();
    assert_eq!(commands, [COPY_COMMAND, DOWNLOAD_COMMAND]);
}

#[test]
fn copy_inline_diagram() {
    let registry = StaticRegistry(settings_with_dpi(TEST_DPI));
    let f = activate(None, Some(&registry));
    let page = notes_page();

    f.app.dispatch_context_menu(&target(&page, "edge-ab"));
    assert!(f.app.commands.execute(COPY_COMMAND));

    let images = f.clipboard.images.borrow();
    assert_eq!(images.len(), 1);
    assert_eq!((images[0].width(), images[0].height()), (400, 200));
    assert_eq!(PngBlob::MIME_TYPE, "image/png");

    let pixels = decode_rgba(&images[0]).unwrap();
    assert_eq!((pixels.width, pixels.height), (400, 200));
    // The background is transparent.
    assert_eq!(pixels.data[3], 0);
}

#[test]
fn copy_image_proxy() {
    let registry = StaticRegistry(settings_with_dpi(TEST_DPI));
    let f = activate(None, Some(&registry));
    let page = notes_page();

    f.app.dispatch_context_menu(&target(&page, "proxy"));
    assert!(f.app.commands.execute(COPY_COMMAND));

    let images = f.clipboard.images.borrow();
    assert_eq!((images[0].width(), images[0].height()), (80, 60));

    let pixels = decode_rgba(&images[0]).unwrap();
    assert_eq!(&pixels.data[..4], &[0, 0, 255, 255]);
}

#[test]
fn copy_diagram_with_ampersand_label() {
    let registry = StaticRegistry(settings_with_dpi(TEST_DPI));
    let f = activate(None, Some(&registry));
    let page = notes_page();

    f.app.dispatch_context_menu(&target(&page, "label-qa"));
    assert!(f.app.commands.execute(COPY_COMMAND));

    let images = f.clipboard.images.borrow();
    assert_eq!((images[0].width(), images[0].height()), (120, 40));

    let markup = page.element_by_id("mermaid-2").unwrap().to_markup();
    assert!(markup.contains(r#"aria-label="Q &amp; A &lt;draft>""#));
    assert!(markup.contains(">Q &amp; A</text>"));
}

#[test]
fn download_uses_title_and_content_hash() {
    let registry = StaticRegistry(settings_with_dpi(TEST_DPI));
    let f = activate(Some("notes.md"), Some(&registry));
    let page = notes_page();

    f.app.dispatch_context_menu(&target(&page, "mermaid-1"));
    assert!(f.app.commands.execute(DOWNLOAD_COMMAND));

    let markup = page.element_by_id("mermaid-1").unwrap().to_markup();
    let files = f.downloads.files.borrow();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].0, format!("mermaid-notes-{}.png", content_hash(&markup)));
    assert_eq!((files[0].1.width(), files[0].1.height()), (400, 200));
}

#[test]
fn download_is_idempotent() {
    let registry = StaticRegistry(settings_with_dpi(TEST_DPI));
    let f = activate(None, Some(&registry));
    let page = notes_page();

    f.app.dispatch_context_menu(&target(&page, "proxy"));
    assert!(f.app.commands.execute(DOWNLOAD_COMMAND));
    assert!(f.app.commands.execute(DOWNLOAD_COMMAND));

    let files = f.downloads.files.borrow();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].0, files[1].0);
    assert!(files[0].0.starts_with("mermaid-diagram-"));
    assert_eq!(files[0].1, files[1].1);
}

#[test]
fn failures_are_swallowed() {
    let f = activate(None, None);
    let page = notes_page();

    // No context menu yet.
    assert!(!f.app.commands.execute(COPY_COMMAND));

    f.app.dispatch_context_menu(&target(&page, "intro"));
    assert!(!f.app.commands.execute(COPY_COMMAND));
    assert!(!f.app.commands.execute(DOWNLOAD_COMMAND));

    assert!(f.clipboard.images.borrow().is_empty());
    assert!(f.downloads.files.borrow().is_empty());
}

#[test]
fn settings_change_is_applied() {
    let settings = settings_with_dpi(TEST_DPI);
    let registry = StaticRegistry(settings.clone());
    let f = activate(None, Some(&registry));
    let page = notes_page();
    assert_eq!(f.extension.target_dpi(), TEST_DPI);

    settings.set("targetDPI", serde_json::Value::from(TEST_DPI * 2));
    assert_eq!(f.extension.target_dpi(), TEST_DPI * 2);

    f.app.dispatch_context_menu(&target(&page, "role"));
    assert!(f.app.commands.execute(COPY_COMMAND));
    let images = f.clipboard.images.borrow();
    assert_eq!((images[0].width(), images[0].height()), (120, 80));
}

#[test]
fn invalid_setting_keeps_previous_value() {
    let settings = settings_with_dpi(TEST_DPI);
    let registry = StaticRegistry(settings.clone());
    let f = activate(None, Some(&registry));

    settings.set("targetDPI", serde_json::Value::from(-5));
    assert_eq!(f.extension.target_dpi(), TEST_DPI);

    settings.set("targetDPI", serde_json::Value::from("600"));
    assert_eq!(f.extension.target_dpi(), TEST_DPI);
}

#[test]
fn missing_services_use_defaults() {
    let f = activate(None, None);
    assert_eq!(f.extension.target_dpi(), 600);

    let f = activate(None, Some(&NullSettingRegistry));
    assert_eq!(f.extension.target_dpi(), 600);
    assert!(f.extension.settings().is_none());
}
