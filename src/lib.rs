// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`mermaid-png` converts rendered Mermaid diagrams into high-resolution PNG images.

A diagram is either an inline `svg` element or an `img` element with an SVG data URI.
It is rasterized at a configurable resolution and then either placed onto
the clipboard or saved into a content-addressed file.

## Example

```no_run
use std::rc::Rc;
use mermaid_png::dom::Document;
use mermaid_png::host::{Application, ContextTarget, FixedTitleShell};
use mermaid_png::sink::{DirectoryDownloads, UnavailableClipboard};

let page = Rc::new(Document::parse(&std::fs::read_to_string("page.xhtml").unwrap()).unwrap());
let mut app = Application::new(
    Rc::new(FixedTitleShell(Some("notes.md".to_string()))),
    Rc::new(UnavailableClipboard),
    Rc::new(DirectoryDownloads::new("out")),
);
mermaid_png::extension::activate(&mut app, None, None);

let svg = page.select_all("svg").unwrap()[0].id();
app.dispatch_context_menu(&ContextTarget::new(page.clone(), svg).unwrap());
app.commands.execute(mermaid_png::extension::DOWNLOAD_COMMAND);
```
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::field_reassign_with_default)]
#![allow(clippy::uninlined_format_args)]

pub use tiny_skia;
pub use usvg;

pub mod dimensions;
pub mod dom;
mod error;
pub mod extension;
pub mod filename;
mod fonts;
pub mod host;
pub mod image;
pub mod raster;
pub mod settings;
pub mod sink;
pub mod target;

pub use crate::dimensions::{DimensionSource, Dimensions};
pub use crate::error::Error;
pub use crate::fonts::{FontOptions, FontStore};
pub use crate::image::ImageResource;
pub use crate::raster::{PngBlob, Rasterizer};
