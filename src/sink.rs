// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Output services: the clipboard and downloads.

#[cfg(feature = "system-clipboard")]
use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::{Error, PngBlob};

/// A clipboard that accepts images.
pub trait Clipboard {
    /// Places an image onto the clipboard.
    fn write_image(&self, blob: &PngBlob) -> Result<(), Error>;
}

/// A file downloads service.
pub trait Downloads {
    /// Saves an image under a suggested file name.
    ///
    /// Returns the resulting path.
    fn save(&self, blob: &PngBlob, filename: &str) -> Result<PathBuf, Error>;
}

/// A clipboard that is always unavailable.
#[derive(Clone, Copy, Default, Debug)]
pub struct UnavailableClipboard;

impl Clipboard for UnavailableClipboard {
    fn write_image(&self, _: &PngBlob) -> Result<(), Error> {
        Err(Error::Clipboard(
            "clipboard support is not enabled".to_string(),
        ))
    }
}

/// The system clipboard.
///
/// The connection is opened on the first write and kept for the lifetime
/// of this object, since on Linux the clipboard contents are gone
/// once the last connection is closed.
#[cfg(feature = "system-clipboard")]
#[derive(Default)]
pub struct SystemClipboard {
    clipboard: RefCell<Option<arboard::Clipboard>>,
    wait: bool,
}

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
    /// Creates a new clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clipboard for short-lived processes.
    ///
    /// On Linux, each write blocks until another application replaces
    /// the clipboard contents. Elsewhere it is the same as [`SystemClipboard::new`].
    pub fn waiting() -> Self {
        SystemClipboard {
            clipboard: RefCell::default(),
            wait: true,
        }
    }

    /// Checks that a clipboard connection is open.
    pub fn is_open(&self) -> bool {
        self.clipboard.borrow().is_some()
    }
}

#[cfg(feature = "system-clipboard")]
impl Clipboard for SystemClipboard {
    fn write_image(&self, blob: &PngBlob) -> Result<(), Error> {
        let clipboard_err = |e: arboard::Error| Error::Clipboard(e.to_string());

        let image = decode_rgba(blob)?;

        let mut slot = self.clipboard.borrow_mut();
        if slot.is_none() {
            *slot = Some(arboard::Clipboard::new().map_err(clipboard_err)?);
        }

        let clipboard = slot
            .as_mut()
            .ok_or_else(|| Error::Clipboard("no clipboard connection".to_string()))?;

        let set = clipboard.set();
        #[cfg(target_os = "linux")]
        let set = if self.wait {
            log::info!("Waiting for the clipboard contents to be replaced.");
            arboard::SetExtLinux::wait(set)
        } else {
            set
        };

        set.image(arboard::ImageData {
            width: image.width as usize,
            height: image.height as usize,
            bytes: std::borrow::Cow::Owned(image.data),
        })
        .map_err(clipboard_err)
    }
}

#[cfg(feature = "system-clipboard")]
impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        f.debug_struct("SystemClipboard")
            .field("open", &self.is_open())
            .field("wait", &self.wait)
            .finish()
    }
}

/// A non-premultiplied RGBA8 image.
#[derive(Clone, PartialEq, Debug)]
pub struct RgbaImage {
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
    /// Pixels, row by row.
    pub data: Vec<u8>,
}

/// Decodes a PNG blob into RGBA pixels.
///
/// System clipboards expect raw pixels rather than an encoded file.
pub fn decode_rgba(blob: &PngBlob) -> Result<RgbaImage, Error> {
    let decode_err = |e: png::DecodingError| Error::Decode(e.to_string());

    let mut decoder = png::Decoder::new(blob.data());
    decoder.set_transformations(png::Transformations::EXPAND);
    let mut reader = decoder.read_info().map_err(decode_err)?;

    let mut data = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut data).map_err(decode_err)?;
    data.truncate(info.buffer_size());

    if info.color_type != png::ColorType::Rgba || info.bit_depth != png::BitDepth::Eight {
        return Err(Error::Decode(format!(
            "unsupported PNG format: {:?} {:?}",
            info.color_type, info.bit_depth
        )));
    }

    Ok(RgbaImage {
        width: info.width,
        height: info.height,
        data,
    })
}

/// Saves downloads into a directory.
///
/// Existing files are overwritten.
#[derive(Clone, Debug)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    /// Creates a new service.
    ///
    /// The directory will be created on the first save.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        DirectoryDownloads { dir: dir.into() }
    }

    /// Returns the output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Downloads for DirectoryDownloads {
    fn save(&self, blob: &PngBlob, filename: &str) -> Result<PathBuf, Error> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(sanitize_filename(filename));
        std::fs::write(&path, blob.data())?;
        Ok(path)
    }
}

/// Replaces characters that cannot be a part of a file name.
fn sanitize_filename(name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            _ => c,
        })
        .collect();

    match name.as_str() {
        "" | "." | ".." => "download.png".to_string(),
        _ => name,
    }
}
