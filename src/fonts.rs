// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

#[cfg(feature = "text")]
use once_cell::sync::OnceCell;
#[cfg(feature = "text")]
use usvg::fontdb;

/// Fonts loading options.
#[derive(Clone, Debug)]
pub struct FontOptions {
    /// Do not load system fonts.
    pub skip_system_fonts: bool,
    /// Additional font files.
    pub font_files: Vec<PathBuf>,
    /// Additional font directories.
    pub font_dirs: Vec<PathBuf>,
    /// The `serif` font family.
    pub serif_family: String,
    /// The `sans-serif` font family.
    ///
    /// Mermaid themes fall back to it.
    pub sans_serif_family: String,
    /// The `monospace` font family.
    pub monospace_family: String,
}

impl Default for FontOptions {
    fn default() -> Self {
        FontOptions {
            skip_system_fonts: false,
            font_files: Vec::new(),
            font_dirs: Vec::new(),
            serif_family: "Times New Roman".to_string(),
            sans_serif_family: "Arial".to_string(),
            monospace_family: "Courier New".to_string(),
        }
    }
}

/// A lazily loaded fonts database.
///
/// Fonts are needed only for diagrams with `text` elements
/// and loading them is pretty expensive, so this is done on first use.
pub struct FontStore {
    #[cfg_attr(not(feature = "text"), allow(dead_code))]
    opt: FontOptions,
    #[cfg(feature = "text")]
    db: OnceCell<fontdb::Database>,
    #[cfg(feature = "text")]
    empty: fontdb::Database,
}

impl FontStore {
    /// Creates a new store. Nothing is loaded yet.
    pub fn new(opt: FontOptions) -> Self {
        FontStore {
            opt,
            #[cfg(feature = "text")]
            db: OnceCell::new(),
            #[cfg(feature = "text")]
            empty: fontdb::Database::new(),
        }
    }

    /// Checks that the fonts database was already loaded.
    pub fn is_loaded(&self) -> bool {
        #[cfg(feature = "text")]
        {
            self.db.get().is_some()
        }

        #[cfg(not(feature = "text"))]
        {
            false
        }
    }

    /// Returns a database suitable for an image.
    ///
    /// An image without text gets an empty database.
    #[cfg(feature = "text")]
    pub fn database(&self, has_text: bool) -> &fontdb::Database {
        if !has_text {
            return &self.empty;
        }

        self.db.get_or_init(|| {
            let mut db = fontdb::Database::new();
            load_fonts(&self.opt, &mut db);
            log::debug!("Loaded {} font faces.", db.len());
            db
        })
    }
}

impl Default for FontStore {
    fn default() -> Self {
        FontStore::new(FontOptions::default())
    }
}

impl std::fmt::Debug for FontStore {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "FontStore {{ loaded: {} }}", self.is_loaded())
    }
}

#[cfg(feature = "text")]
fn load_fonts(opt: &FontOptions, db: &mut fontdb::Database) {
    if !opt.skip_system_fonts {
        db.load_system_fonts();
    }

    for path in &opt.font_files {
        if let Err(e) = db.load_font_file(path) {
            log::warn!("Failed to load '{}' cause {}.", path.display(), e);
        }
    }

    for path in &opt.font_dirs {
        db.load_fonts_dir(path);
    }

    db.set_serif_family(opt.serif_family.clone());
    db.set_sans_serif_family(opt.sans_serif_family.clone());
    db.set_monospace_family(opt.monospace_family.clone());
}
