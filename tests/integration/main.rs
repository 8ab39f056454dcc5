use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use once_cell::sync::Lazy;

use mermaid_png::dom::Document;
use mermaid_png::host::{Application, ContextTarget, FixedTitleShell, ListPalette};
use mermaid_png::settings::{SettingRegistry, Settings};
use mermaid_png::sink::{Clipboard, Downloads};
use mermaid_png::{Error, PngBlob};

mod commands;
mod pipeline;

static NOTES_PAGE: Lazy<String> = Lazy::new(|| {
    std::fs::read_to_string("tests/files/notes.xhtml").unwrap()
});

/// Twice the source resolution, so the output is exactly twice as big.
pub const TEST_DPI: u32 = 23;

pub fn notes_page() -> Rc<Document> {
    Rc::new(Document::parse(&NOTES_PAGE).unwrap())
}

pub fn target(page: &Rc<Document>, id: &str) -> ContextTarget {
    let node = page.element_by_id(id).unwrap().id();
    ContextTarget::new(page.clone(), node).unwrap()
}

#[derive(Default)]
pub struct RecordingClipboard {
    pub images: RefCell<Vec<PngBlob>>,
}

impl Clipboard for RecordingClipboard {
    fn write_image(&self, blob: &PngBlob) -> Result<(), Error> {
        self.images.borrow_mut().push(blob.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDownloads {
    pub files: RefCell<Vec<(String, PngBlob)>>,
}

impl Downloads for RecordingDownloads {
    fn save(&self, blob: &PngBlob, filename: &str) -> Result<PathBuf, Error> {
        self.files
            .borrow_mut()
            .push((filename.to_string(), blob.clone()));
        Ok(PathBuf::from(filename))
    }
}

/// A registry that always returns the same settings.
pub struct StaticRegistry(pub Rc<Settings>);

impl SettingRegistry for StaticRegistry {
    fn load(&self, _: &str) -> Result<Rc<Settings>, Error> {
        Ok(self.0.clone())
    }
}

pub fn settings_with_dpi(dpi: u32) -> Rc<Settings> {
    let mut user = serde_json::Map::new();
    user.insert("targetDPI".to_string(), serde_json::Value::from(dpi));
    Rc::new(Settings::new("test", user))
}

pub struct Fixture {
    pub app: Application,
    pub clipboard: Rc<RecordingClipboard>,
    pub downloads: Rc<RecordingDownloads>,
    pub palette: ListPalette,
    pub extension: mermaid_png::extension::Extension,
}

pub fn activate(title: Option<&str>, settings: Option<&dyn SettingRegistry>) -> Fixture {
    let clipboard = Rc::new(RecordingClipboard::default());
    let downloads = Rc::new(RecordingDownloads::default());
    let mut app = Application::new(
        Rc::new(FixedTitleShell(title.map(|s| s.to_string()))),
        clipboard.clone(),
        downloads.clone(),
    );

    let mut palette = ListPalette::default();
    let extension = mermaid_png::extension::activate(&mut app, Some(&mut palette), settings);

    Fixture {
        app,
        clipboard,
        downloads,
        palette,
        extension,
    }
}
