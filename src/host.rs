// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A host application model: commands, menus and services an extension plugs into.

use std::rc::Rc;

use crate::dom::{self, Document, Node, NodeId};
use crate::sink::{Clipboard, Downloads};
use crate::Error;

/// An extension descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PluginDescriptor {
    /// A unique identifier.
    pub id: &'static str,
    /// A human-readable description.
    pub description: &'static str,
    /// Activate on host start.
    pub auto_start: bool,
}

/// An element a context menu was opened on.
#[derive(Clone)]
pub struct ContextTarget {
    document: Rc<Document>,
    node: NodeId,
}

impl ContextTarget {
    /// Creates a new target.
    ///
    /// Returns `None` when `node` is not a part of `document`.
    pub fn new(document: Rc<Document>, node: NodeId) -> Option<Self> {
        document.node(node)?;
        Some(ContextTarget { document, node })
    }

    /// Returns target's document.
    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Returns the target node.
    #[inline]
    pub fn node(&self) -> Node {
        self.document.get(self.node)
    }
}

impl std::fmt::Debug for ContextTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "ContextTarget({:?})", self.node())
    }
}

/// A host command.
pub struct Command {
    /// A menu label.
    pub label: String,
    /// A tooltip.
    pub caption: String,
    /// Checks that the command can be executed right now.
    pub is_enabled: Box<dyn Fn() -> bool>,
    /// Executes the command.
    pub execute: Box<dyn Fn() -> Result<(), Error>>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "Command {{ label: {:?} }}", self.label)
    }
}

/// A list of registered commands.
#[derive(Default, Debug)]
pub struct CommandRegistry {
    commands: Vec<(String, Command)>,
}

impl CommandRegistry {
    /// Registers a command.
    ///
    /// A command with the same ID will be replaced.
    pub fn add_command(&mut self, id: &str, command: Command) {
        if let Some(idx) = self.commands.iter().position(|(i, _)| i == id) {
            log::warn!("Command '{}' is already registered. Replacing.", id);
            self.commands[idx].1 = command;
        } else {
            self.commands.push((id.to_string(), command));
        }
    }

    /// Checks that a command is registered.
    pub fn has_command(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Returns IDs of all commands in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|(id, _)| id.as_str())
    }

    /// Returns a command label.
    pub fn label(&self, id: &str) -> Option<&str> {
        self.get(id).map(|c| c.label.as_str())
    }

    /// Returns a command caption.
    pub fn caption(&self, id: &str) -> Option<&str> {
        self.get(id).map(|c| c.caption.as_str())
    }

    /// Checks that a command is registered and enabled.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.get(id).map(|c| (c.is_enabled)()).unwrap_or(false)
    }

    /// Executes a command.
    ///
    /// Errors are logged and dropped here, so a failed command never
    /// affects the host. Returns `true` when the command has succeeded.
    pub fn execute(&self, id: &str) -> bool {
        let command = match self.get(id) {
            Some(c) => c,
            None => {
                log::warn!("Command '{}' is not registered.", id);
                return false;
            }
        };

        match (command.execute)() {
            Ok(()) => true,
            Err(e) => {
                log::error!("'{}' failed cause {}.", command.label, e);
                false
            }
        }
    }

    fn get(&self, id: &str) -> Option<&Command> {
        self.commands.iter().find(|(i, _)| i == id).map(|(_, c)| c)
    }
}

/// A context menu item.
#[derive(Clone, PartialEq, Debug)]
pub struct MenuItem {
    /// Command ID.
    pub command: String,
    /// A CSS selector the item is scoped to.
    pub selector: String,
    /// Items with a smaller rank come first.
    pub rank: i32,
}

/// A context menu.
#[derive(Default, Debug)]
pub struct ContextMenu {
    items: Vec<MenuItem>,
}

impl ContextMenu {
    /// Adds an item.
    pub fn add_item(&mut self, item: MenuItem) {
        self.items.push(item);
    }

    /// Returns all items.
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Returns items applicable to a target, ordered by rank.
    ///
    /// An item applies when the target or any of its ancestors
    /// matches item's selector.
    pub fn items_for(&self, target: &ContextTarget) -> Vec<&MenuItem> {
        let node = target.node();
        let mut items: Vec<_> = self
            .items
            .iter()
            .filter(|item| match dom::parse_selector(&item.selector) {
                Ok(selector) => node.closest(&selector).is_some(),
                Err(e) => {
                    log::warn!("{}.", e);
                    false
                }
            })
            .collect();
        items.sort_by_key(|item| item.rank);
        items
    }
}

/// A command palette.
pub trait CommandPalette {
    /// Adds a command to the palette.
    fn add_item(&mut self, command: &str, category: &str);
}

/// A palette that ignores everything.
#[derive(Clone, Copy, Default, Debug)]
pub struct NullPalette;

impl CommandPalette for NullPalette {
    fn add_item(&mut self, _: &str, _: &str) {}
}

/// A command palette entry.
#[derive(Clone, PartialEq, Debug)]
pub struct PaletteItem {
    /// Command ID.
    pub command: String,
    /// Palette category.
    pub category: String,
}

/// A palette that keeps its items in a list.
#[derive(Clone, Default, Debug)]
pub struct ListPalette {
    /// Added items.
    pub items: Vec<PaletteItem>,
}

impl CommandPalette for ListPalette {
    fn add_item(&mut self, command: &str, category: &str) {
        self.items.push(PaletteItem {
            command: command.to_string(),
            category: category.to_string(),
        });
    }
}

/// An application shell.
pub trait Shell {
    /// Returns the title of the active document.
    fn current_title(&self) -> Option<String>;
}

/// A shell with a single document.
#[derive(Clone, Default, Debug)]
pub struct FixedTitleShell(pub Option<String>);

impl Shell for FixedTitleShell {
    fn current_title(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A context menu entry as presented to a user.
#[derive(Clone, PartialEq, Debug)]
pub struct MenuEntry {
    /// Command ID.
    pub command: String,
    /// Command label.
    pub label: String,
    /// Command state.
    pub enabled: bool,
}

type ContextMenuListener = Box<dyn Fn(&ContextTarget)>;

/// A host application handle.
pub struct Application {
    /// Registered commands.
    pub commands: CommandRegistry,
    /// The context menu.
    pub context_menu: ContextMenu,
    shell: Rc<dyn Shell>,
    clipboard: Rc<dyn Clipboard>,
    downloads: Rc<dyn Downloads>,
    listeners: Vec<ContextMenuListener>,
}

impl Application {
    /// Creates a new application.
    pub fn new(
        shell: Rc<dyn Shell>,
        clipboard: Rc<dyn Clipboard>,
        downloads: Rc<dyn Downloads>,
    ) -> Self {
        Application {
            commands: CommandRegistry::default(),
            context_menu: ContextMenu::default(),
            shell,
            clipboard,
            downloads,
            listeners: Vec::new(),
        }
    }

    /// Returns the shell.
    pub fn shell(&self) -> Rc<dyn Shell> {
        Rc::clone(&self.shell)
    }

    /// Returns the system clipboard.
    pub fn clipboard(&self) -> Rc<dyn Clipboard> {
        Rc::clone(&self.clipboard)
    }

    /// Returns the downloads service.
    pub fn downloads(&self) -> Rc<dyn Downloads> {
        Rc::clone(&self.downloads)
    }

    /// Subscribes to context menu events.
    pub fn add_context_menu_listener<F: Fn(&ContextTarget) + 'static>(&mut self, f: F) {
        self.listeners.push(Box::new(f));
    }

    /// Notifies listeners that a context menu was opened on a target.
    pub fn dispatch_context_menu(&self, target: &ContextTarget) {
        log::debug!("Context menu on {:?}.", target.node());
        for listener in &self.listeners {
            listener(target);
        }
    }

    /// Returns the context menu a user would see for a target.
    ///
    /// Should be called after [`Application::dispatch_context_menu`],
    /// since command states may depend on the last target.
    pub fn context_menu_entries(&self, target: &ContextTarget) -> Vec<MenuEntry> {
        self.context_menu
            .items_for(target)
            .into_iter()
            .filter_map(|item| {
                let label = self.commands.label(&item.command)?;
                Some(MenuEntry {
                    command: item.command.clone(),
                    label: label.to_string(),
                    enabled: self.commands.is_enabled(&item.command),
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        f.debug_struct("Application")
            .field("commands", &self.commands)
            .field("context_menu", &self.context_menu)
            .finish()
    }
}
