// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The Mermaid to PNG extension.

use std::cell::RefCell;
use std::rc::Rc;

use crate::filename::derive_filename;
use crate::host::{
    Application, Command, CommandPalette, ContextTarget, MenuItem, NullPalette, PluginDescriptor,
};
use crate::settings::{ResolutionSetting, SettingRegistry, Settings};
use crate::target::{ConversionSource, MARKDOWN_REGION_SELECTOR};
use crate::{Error, Rasterizer};

/// The extension descriptor.
pub const PLUGIN: PluginDescriptor = PluginDescriptor {
    id: "jupyterlab_mmd_to_png_extension:plugin",
    description: "Copies and saves rendered Mermaid diagrams as PNG images",
    auto_start: true,
};

/// Copies the diagram under the context menu to the clipboard.
pub const COPY_COMMAND: &str = "mermaid:copy-as-png";

/// Saves the diagram under the context menu to a file.
pub const DOWNLOAD_COMMAND: &str = "mermaid:download-as-png";

/// A command palette category of both commands.
pub const PALETTE_CATEGORY: &str = "Markdown";

/// The last context-menu target.
#[derive(Default, Debug)]
pub struct Session {
    last_target: RefCell<Option<ContextTarget>>,
}

impl Session {
    /// Returns the last context-menu target.
    pub fn last_target(&self) -> Option<ContextTarget> {
        self.last_target.borrow().clone()
    }

    fn record(&self, target: &ContextTarget) {
        *self.last_target.borrow_mut() = Some(target.clone());
    }

    fn is_convertible(&self) -> bool {
        match *self.last_target.borrow() {
            Some(ref target) => ConversionSource::resolve(target.node()).is_some(),
            None => false,
        }
    }
}

/// An activated extension.
pub struct Extension {
    session: Rc<Session>,
    resolution: ResolutionSetting,
    settings: Option<Rc<Settings>>,
}

impl Extension {
    /// Returns the current output resolution.
    pub fn target_dpi(&self) -> u32 {
        self.resolution.get()
    }

    /// Returns the shared output resolution.
    pub fn resolution(&self) -> &ResolutionSetting {
        &self.resolution
    }

    /// Returns the loaded settings.
    ///
    /// `None` when no settings registry was available or loading has failed.
    pub fn settings(&self) -> Option<&Rc<Settings>> {
        self.settings.as_ref()
    }

    /// Returns the session state.
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        f.debug_struct("Extension")
            .field("session", &self.session)
            .field("target_dpi", &self.resolution.get())
            .finish()
    }
}

/// Activates the extension with the default rasterizer.
pub fn activate(
    app: &mut Application,
    palette: Option<&mut dyn CommandPalette>,
    settings: Option<&dyn SettingRegistry>,
) -> Extension {
    activate_with(app, palette, settings, Rasterizer::default())
}

/// Activates the extension.
///
/// Settings are loaded first. Without them, or when loading fails,
/// the default resolution is used.
pub fn activate_with(
    app: &mut Application,
    palette: Option<&mut dyn CommandPalette>,
    settings: Option<&dyn SettingRegistry>,
    rasterizer: Rasterizer,
) -> Extension {
    let resolution = ResolutionSetting::default();
    let settings = match settings {
        Some(registry) => load_settings(registry, &resolution),
        None => {
            log::debug!("No settings registry. Using {} DPI.", resolution.get());
            None
        }
    };

    let session = Rc::new(Session::default());
    {
        let session = Rc::clone(&session);
        app.add_context_menu_listener(move |target| session.record(target));
    }

    let rasterizer = Rc::new(rasterizer);
    let copy = copy_command(app, &session, &resolution, &rasterizer);
    let download = download_command(app, &session, &resolution, &rasterizer);
    app.commands.add_command(COPY_COMMAND, copy);
    app.commands.add_command(DOWNLOAD_COMMAND, download);

    let mut null_palette = NullPalette;
    let palette: &mut dyn CommandPalette = match palette {
        Some(palette) => palette,
        None => &mut null_palette,
    };

    for (command, rank) in [(COPY_COMMAND, 10), (DOWNLOAD_COMMAND, 11)] {
        app.context_menu.add_item(MenuItem {
            command: command.to_string(),
            selector: MARKDOWN_REGION_SELECTOR.to_string(),
            rank,
        });
        palette.add_item(command, PALETTE_CATEGORY);
    }

    log::info!("{} is activated.", PLUGIN.id);

    Extension {
        session,
        resolution,
        settings,
    }
}

fn load_settings(
    registry: &dyn SettingRegistry,
    resolution: &ResolutionSetting,
) -> Option<Rc<Settings>> {
    let settings = match registry.load(PLUGIN.id) {
        Ok(v) => v,
        Err(e) => {
            log::error!("Failed to load settings cause {}. Using {} DPI.", e, resolution.get());
            return None;
        }
    };

    resolution.update_from(&settings);

    let resolution = resolution.clone();
    settings.connect_changed(move |settings| {
        resolution.update_from(settings);
    });

    Some(settings)
}

fn copy_command(
    app: &Application,
    session: &Rc<Session>,
    resolution: &ResolutionSetting,
    rasterizer: &Rc<Rasterizer>,
) -> Command {
    let enabled_session = Rc::clone(session);
    let session = Rc::clone(session);
    let resolution = resolution.clone();
    let rasterizer = Rc::clone(rasterizer);
    let clipboard = app.clipboard();

    Command {
        label: "Copy as PNG".to_string(),
        caption: "Copy Mermaid diagram as PNG image".to_string(),
        is_enabled: Box::new(move || enabled_session.is_convertible()),
        execute: Box::new(move || {
            let target = session.last_target().ok_or(Error::NoTarget)?;
            let source = ConversionSource::resolve(target.node()).ok_or(Error::NoTarget)?;

            let blob = source.rasterize(&rasterizer, resolution.get())?;
            clipboard.write_image(&blob)?;
            log::info!(
                "Copied a {}x{} diagram to the clipboard.",
                blob.width(),
                blob.height()
            );
            Ok(())
        }),
    }
}

fn download_command(
    app: &Application,
    session: &Rc<Session>,
    resolution: &ResolutionSetting,
    rasterizer: &Rc<Rasterizer>,
) -> Command {
    let enabled_session = Rc::clone(session);
    let session = Rc::clone(session);
    let resolution = resolution.clone();
    let rasterizer = Rc::clone(rasterizer);
    let shell = app.shell();
    let downloads = app.downloads();

    Command {
        label: "Save as PNG".to_string(),
        caption: "Save Mermaid diagram as PNG file".to_string(),
        is_enabled: Box::new(move || enabled_session.is_convertible()),
        execute: Box::new(move || {
            let target = session.last_target().ok_or(Error::NoTarget)?;
            let source = ConversionSource::resolve(target.node()).ok_or(Error::NoTarget)?;

            let content = source.hash_content()?;
            let blob = source.rasterize(&rasterizer, resolution.get())?;
            let filename = derive_filename(shell.current_title().as_deref(), &content);
            let path = downloads.save(&blob, &filename)?;
            log::info!("Saved a {}x{} diagram to '{}'.", blob.width(), blob.height(), path.display());
            Ok(())
        }),
    }
}

/// An extension status report.
#[derive(Clone, PartialEq, Debug, serde::Serialize)]
pub struct HealthStatus {
    /// Always `ok`.
    pub status: &'static str,
    /// A human-readable message.
    pub message: String,
    /// Where diagrams are rendered.
    pub rendering: &'static str,
}

/// Returns the extension status.
pub fn health() -> HealthStatus {
    let package = PLUGIN.id.split(':').next().unwrap_or(PLUGIN.id);
    HealthStatus {
        status: "ok",
        message: format!("{} is active", package),
        rendering: "client-side",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::host::{FixedTitleShell, ListPalette};
    use crate::settings::NullSettingRegistry;
    use crate::sink::{DirectoryDownloads, UnavailableClipboard};

    fn app() -> Application {
        Application::new(
            Rc::new(FixedTitleShell::default()),
            Rc::new(UnavailableClipboard),
            Rc::new(DirectoryDownloads::new(std::env::temp_dir())),
        )
    }

    #[test]
    fn registers_commands() {
        let mut app = app();
        let mut palette = ListPalette::default();
        activate(&mut app, Some(&mut palette), None);

        assert_eq!(app.commands.label(COPY_COMMAND), Some("Copy as PNG"));
        assert_eq!(app.commands.label(DOWNLOAD_COMMAND), Some("Save as PNG"));
        assert_eq!(
            app.commands.caption(DOWNLOAD_COMMAND),
            Some("Save Mermaid diagram as PNG file")
        );

        let ranks: Vec<_> = app.context_menu.items().iter().map(|i| i.rank).collect();
        assert_eq!(ranks, [10, 11]);
        assert!(app
            .context_menu
            .items()
            .iter()
            .all(|i| i.selector == ".jp-RenderedMarkdown"));

        assert_eq!(palette.items.len(), 2);
        assert!(palette.items.iter().all(|i| i.category == "Markdown"));
    }

    #[test]
    fn disabled_before_context_menu() {
        let mut app = app();
        activate(&mut app, None, None);
        assert!(!app.commands.is_enabled(COPY_COMMAND));
        assert!(!app.commands.is_enabled(DOWNLOAD_COMMAND));
        assert!(!app.commands.execute(DOWNLOAD_COMMAND));
    }

    #[test]
    fn unavailable_settings_use_default() {
        let mut app = app();
        let ext = activate(&mut app, None, Some(&NullSettingRegistry));
        assert_eq!(ext.target_dpi(), 600);
        assert!(ext.settings().is_none());
    }

    #[test]
    fn session_tracks_last_target() {
        let mut app = app();
        let ext = activate(&mut app, None, None);

        let doc = Rc::new(
            Document::parse(r#"<div><p id="a"/><svg id="mermaid-0" xmlns="http://www.w3.org/2000/svg"/></div>"#)
                .unwrap(),
        );
        let target = |id: &str| {
            ContextTarget::new(doc.clone(), doc.element_by_id(id).unwrap().id()).unwrap()
        };
        let p = target("a");
        let svg = target("mermaid-0");

        app.dispatch_context_menu(&svg);
        assert!(app.commands.is_enabled(COPY_COMMAND));

        app.dispatch_context_menu(&p);
        assert!(!app.commands.is_enabled(COPY_COMMAND));
        assert_eq!(ext.session().last_target().unwrap().node().element_id(), "a");
    }

    #[test]
    fn health_report() {
        let json = serde_json::to_value(health()).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["rendering"], "client-side");
        assert_eq!(json["message"], "jupyterlab_mmd_to_png_extension is active");
    }
}
