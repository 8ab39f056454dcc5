// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! User settings.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::raster::DEFAULT_TARGET_DPI;
use crate::Error;

/// The output resolution setting key.
pub const TARGET_DPI_KEY: &str = "targetDPI";

type ChangeListener = Rc<dyn Fn(&Settings)>;

/// Settings of a single extension.
///
/// A composite value is a user value when present and a schema default otherwise.
pub struct Settings {
    plugin_id: String,
    defaults: Map<String, Value>,
    user: RefCell<Map<String, Value>>,
    listeners: RefCell<Vec<ChangeListener>>,
}

impl Settings {
    /// Creates settings from user values.
    pub fn new(plugin_id: &str, user: Map<String, Value>) -> Self {
        Settings {
            plugin_id: plugin_id.to_string(),
            defaults: schema_defaults(),
            user: RefCell::new(user),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Returns the owner extension ID.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Returns a user value or a default one.
    pub fn composite(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.user.borrow().get(key) {
            return Some(value.clone());
        }

        self.defaults.get(key).cloned()
    }

    /// Returns a user value.
    pub fn user(&self, key: &str) -> Option<Value> {
        self.user.borrow().get(key).cloned()
    }

    /// Sets a user value and notifies listeners.
    pub fn set(&self, key: &str, value: Value) {
        self.user.borrow_mut().insert(key.to_string(), value);
        self.notify();
    }

    /// Removes a user value and notifies listeners.
    pub fn reset(&self, key: &str) {
        let removed = self.user.borrow_mut().remove(key);
        if removed.is_some() {
            self.notify();
        }
    }

    /// Subscribes to changes.
    pub fn connect_changed<F: Fn(&Settings) + 'static>(&self, f: F) {
        self.listeners.borrow_mut().push(Rc::new(f));
    }

    fn notify(&self) {
        // Listeners are allowed to subscribe or to modify settings.
        let listeners: Vec<_> = self.listeners.borrow().iter().cloned().collect();
        for listener in listeners {
            listener(self);
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        f.debug_struct("Settings")
            .field("plugin_id", &self.plugin_id)
            .field("user", &self.user.borrow())
            .finish()
    }
}

fn schema_defaults() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(TARGET_DPI_KEY.to_string(), Value::from(DEFAULT_TARGET_DPI));
    map
}

/// A settings provider.
pub trait SettingRegistry {
    /// Loads settings of an extension.
    fn load(&self, plugin_id: &str) -> Result<Rc<Settings>, Error>;
}

/// A registry without any settings.
#[derive(Clone, Copy, Default, Debug)]
pub struct NullSettingRegistry;

impl SettingRegistry for NullSettingRegistry {
    fn load(&self, _: &str) -> Result<Rc<Settings>, Error> {
        Err(Error::Configuration(
            "settings registry is not available".to_string(),
        ))
    }
}

/// A registry backed by a JSON file.
///
/// The file is an object with user values, like `{"targetDPI": 300}`.
/// A missing file means no user values.
#[derive(Clone, Debug)]
pub struct JsonSettingRegistry {
    path: PathBuf,
}

impl JsonSettingRegistry {
    /// Creates a new registry.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        JsonSettingRegistry { path: path.into() }
    }

    /// Returns the settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingRegistry for JsonSettingRegistry {
    fn load(&self, plugin_id: &str) -> Result<Rc<Settings>, Error> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("'{}' does not exist.", self.path.display());
                return Ok(Rc::new(Settings::new(plugin_id, Map::new())));
            }
            Err(e) => {
                return Err(Error::Configuration(format!(
                    "'{}' cannot be read ({})",
                    self.path.display(),
                    e
                )))
            }
        };

        let user = parse_user_settings(&text)
            .map_err(|e| Error::Configuration(format!("'{}' {}", self.path.display(), e)))?;
        Ok(Rc::new(Settings::new(plugin_id, user)))
    }
}

fn parse_user_settings(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("is not a JSON object".to_string()),
        Err(e) => Err(format!("is not a valid JSON ({})", e)),
    }
}

/// Parses a resolution value.
///
/// Only positive whole numbers are allowed.
pub fn parse_target_dpi(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok().filter(|n| *n > 0);
    }

    let n = value.as_f64()?;
    if n.is_finite() && n > 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
        Some(n as u32)
    } else {
        None
    }
}

/// The current output resolution.
///
/// Clones share the same value.
#[derive(Clone, Debug)]
pub struct ResolutionSetting(Rc<Cell<u32>>);

impl Default for ResolutionSetting {
    fn default() -> Self {
        ResolutionSetting(Rc::new(Cell::new(DEFAULT_TARGET_DPI)))
    }
}

impl ResolutionSetting {
    /// Returns the current resolution.
    #[inline]
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// Sets the current resolution.
    #[inline]
    pub fn set(&self, dpi: u32) {
        self.0.set(dpi);
    }

    /// Updates the resolution from settings.
    ///
    /// An invalid value is ignored and the current one is kept.
    /// Returns `true` when the value was accepted.
    pub fn update_from(&self, settings: &Settings) -> bool {
        let value = match settings.composite(TARGET_DPI_KEY) {
            Some(v) => v,
            None => return false,
        };

        match parse_target_dpi(&value) {
            Some(dpi) => {
                if dpi != self.get() {
                    log::debug!("Target resolution changed to {} DPI.", dpi);
                }
                self.set(dpi);
                true
            }
            None => {
                log::warn!(
                    "'{}' is not a valid {}. Keeping {} DPI.",
                    value,
                    TARGET_DPI_KEY,
                    self.get()
                );
                false
            }
        }
    }
}
