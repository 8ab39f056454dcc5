// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// List of all errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to allocate a drawing surface.
    ///
    /// Probably because it's too big or there is not enough memory.
    #[error("failed to allocate a {width}x{height} drawing surface")]
    SurfaceUnavailable {
        /// Requested surface width.
        width: u32,
        /// Requested surface height.
        height: u32,
    },

    /// Failed to decode an image resource.
    #[error("failed to decode the image cause {0}")]
    Decode(String),

    /// Failed to encode the drawing surface into a PNG.
    #[error("failed to export the surface cause {0}")]
    Export(String),

    /// Settings service is missing or the settings cannot be read.
    #[error("configuration is unavailable cause {0}")]
    Configuration(String),

    /// A command was executed without a convertible context-menu target.
    #[error("no Mermaid diagram found")]
    NoTarget,

    /// An invalid CSS selector.
    #[error("'{0}' is not a valid selector")]
    InvalidSelector(String),

    /// A page cannot be parsed.
    #[error("page parsing failed cause {0}")]
    PageParsing(#[from] roxmltree::Error),

    /// A clipboard write failed.
    #[error("clipboard write failed cause {0}")]
    Clipboard(String),

    /// An I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Checks that the error is one of the terminal rasterization failures.
    pub fn is_rasterization(&self) -> bool {
        matches!(
            self,
            Error::SurfaceUnavailable { .. } | Error::Decode(_) | Error::Export(_)
        )
    }
}
