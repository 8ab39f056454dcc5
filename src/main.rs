// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#![allow(clippy::uninlined_format_args)]

use std::path;
use std::rc::Rc;

use mermaid_png::dom::{Document, Node};
use mermaid_png::extension::{self, COPY_COMMAND, DOWNLOAD_COMMAND};
use mermaid_png::host::{Application, ContextTarget, FixedTitleShell};
use mermaid_png::settings::{JsonSettingRegistry, SettingRegistry};
use mermaid_png::sink::{Clipboard, DirectoryDownloads};
use mermaid_png::target::ConversionSource;
use mermaid_png::{FontOptions, FontStore, Rasterizer};

fn main() {
    if let Err(e) = process() {
        eprintln!("Error: {}.", e);
        std::process::exit(1);
    }
}

fn process() -> Result<(), String> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            println!("{}", HELP);
            return Err(e);
        }
    };

    if !args.quiet {
        if let Ok(()) = log::set_logger(&LOGGER) {
            let level = if args.verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Warn
            };
            log::set_max_level(level);
        }
    }

    if args.health {
        let status = extension::health();
        let json = serde_json::to_string_pretty(&status).map_err(|e| e.to_string())?;
        println!("{}", json);
        return Ok(());
    }

    let in_page = args
        .in_page
        .as_ref()
        .ok_or("<in-page> must be set")?;

    let page_text = if in_page.as_os_str() == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut buf)
            .map_err(|_| "failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(in_page).map_err(|_| "failed to open the provided file")?
    };

    let page = Rc::new(Document::parse(&page_text).map_err(|e| e.to_string())?);

    let mut app = Application::new(
        Rc::new(FixedTitleShell(args.title.clone())),
        clipboard(),
        Rc::new(DirectoryDownloads::new(args.out_dir.clone())),
    );

    let registry = args.settings.clone().map(JsonSettingRegistry::new);
    let rasterizer = Rasterizer::new(FontStore::new(args.fonts.clone()));
    let ext = extension::activate_with(
        &mut app,
        None,
        registry.as_ref().map(|r| r as &dyn SettingRegistry),
        rasterizer,
    );

    if let Some(dpi) = args.dpi {
        ext.resolution().set(dpi);
    }

    let node = select_target(&page, args.target.as_deref(), args.index)?;
    let target =
        ContextTarget::new(page.clone(), node).ok_or("the target is not a part of the page")?;
    app.dispatch_context_menu(&target);

    if args.list_commands {
        for entry in app.context_menu_entries(&target) {
            let state = if entry.enabled { "enabled" } else { "disabled" };
            println!("{}: '{}', {}", entry.command, entry.label, state);
        }

        return Ok(());
    }

    let command = if args.copy {
        COPY_COMMAND
    } else {
        DOWNLOAD_COMMAND
    };

    if !app.commands.execute(command) {
        return Err(format!("'{}' has failed", command));
    }

    Ok(())
}

const HELP: &str = "\
mermaid-png converts rendered Mermaid diagrams into PNG images.

USAGE:
  mermaid-png [OPTIONS] <in-page>  # from file
  mermaid-png [OPTIONS] -          # from stdin

  mermaid-png notes.xhtml
  mermaid-png --title notes.md --out-dir images notes.xhtml
  mermaid-png --target '#flowchart' --copy notes.xhtml
  mermaid-png --dpi 300 --index 2 notes.xhtml

OPTIONS:
      --help                    Prints this help
  -V, --version                 Prints version

      --target SELECTOR         Selects the context-menu target with a CSS selector
                                [default: all Mermaid diagrams on the page]
      --index N                 Uses the N-th target when several are matched
                                [default: 0]
  -c, --copy                    Copies the diagram to the clipboard
                                instead of saving it.
                                On Linux, waits until the clipboard is replaced
      --out-dir DIR             Sets the directory for saved images
                                [default: current directory]
      --title TITLE             Sets the document title used in file names
                                Examples: 'notes.md', 'Report'
                                [default: diagram]
      --dpi DPI                 Sets the output resolution.
                                Overrides the settings file value
                                [default: 600] [possible values: 10..4000]
      --settings PATH           Loads settings from a JSON file
                                Example: {\"targetDPI\": 300}
      --list-commands           Prints the context menu for the target
      --health                  Prints the extension status as JSON

      --serif-family FAMILY     Sets the 'serif' font family
                                [default: Times New Roman]
      --sans-serif-family FAMILY
                                Sets the 'sans-serif' font family
                                [default: Arial]
      --monospace-family FAMILY Sets the 'monospace' font family
                                [default: Courier New]
      --use-font-file PATH      Loads a specified font file into the fonts database.
                                This option can be set multiple times
      --use-fonts-dir PATH      Loads all fonts from the specified directory
                                into the fonts database.
                                This option can be set multiple times
      --skip-system-fonts       Disables system fonts loading.
                                You should add some fonts manually using
                                --use-font-file and/or --use-fonts-dir
                                Otherwise, text elements will not be rendered

      --quiet                   Disables warnings
      --verbose                 Prints conversion details

ARGS:
  <in-page>                     A well-formed XHTML or SVG page
";

#[derive(Debug)]
struct CliArgs {
    target: Option<String>,
    index: usize,
    copy: bool,
    out_dir: Option<path::PathBuf>,
    title: Option<String>,
    dpi: Option<u32>,
    settings: Option<path::PathBuf>,
    list_commands: bool,
    health: bool,

    serif_family: Option<String>,
    sans_serif_family: Option<String>,
    monospace_family: Option<String>,
    font_files: Vec<path::PathBuf>,
    font_dirs: Vec<path::PathBuf>,
    skip_system_fonts: bool,

    quiet: bool,
    verbose: bool,

    input: Option<path::PathBuf>,
}

fn collect_args() -> Result<CliArgs, pico_args::Error> {
    let mut input = pico_args::Arguments::from_env();

    if input.contains("--help") {
        print!("{}", HELP);
        std::process::exit(0);
    }

    if input.contains(["-V", "--version"]) {
        println!("{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    Ok(CliArgs {
        target: input.opt_value_from_str("--target")?,
        index: input.opt_value_from_str("--index")?.unwrap_or(0),
        copy: input.contains(["-c", "--copy"]),
        out_dir: input.opt_value_from_str("--out-dir")?,
        title: input.opt_value_from_str("--title")?,
        dpi: input.opt_value_from_fn("--dpi", parse_dpi)?,
        settings: input.opt_value_from_str("--settings")?,
        list_commands: input.contains("--list-commands"),
        health: input.contains("--health"),

        serif_family: input.opt_value_from_str("--serif-family")?,
        sans_serif_family: input.opt_value_from_str("--sans-serif-family")?,
        monospace_family: input.opt_value_from_str("--monospace-family")?,
        font_files: input.values_from_str("--use-font-file")?,
        font_dirs: input.values_from_str("--use-fonts-dir")?,
        skip_system_fonts: input.contains("--skip-system-fonts"),

        quiet: input.contains("--quiet"),
        verbose: input.contains("--verbose"),

        input: input.opt_free_from_str()?,
    })
}

fn parse_dpi(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "invalid number")?;

    if (10..=4000).contains(&n) {
        Ok(n)
    } else {
        Err("DPI out of bounds".to_string())
    }
}

struct Args {
    in_page: Option<path::PathBuf>,
    target: Option<String>,
    index: usize,
    copy: bool,
    out_dir: path::PathBuf,
    title: Option<String>,
    dpi: Option<u32>,
    settings: Option<path::PathBuf>,
    list_commands: bool,
    health: bool,
    quiet: bool,
    verbose: bool,
    fonts: FontOptions,
}

fn parse_args() -> Result<Args, String> {
    let args = collect_args().map_err(|e| e.to_string())?;

    if !args.health && args.input.is_none() {
        return Err("<in-page> must be set".to_string());
    }

    if args.copy && args.out_dir.is_some() {
        println!("Warning: --out-dir has no effect with --copy.");
    }

    if args.copy && args.title.is_some() {
        println!("Warning: --title has no effect with --copy.");
    }

    let mut fonts = FontOptions {
        skip_system_fonts: args.skip_system_fonts,
        font_files: args.font_files,
        font_dirs: args.font_dirs,
        ..FontOptions::default()
    };

    if let Some(family) = args.serif_family {
        fonts.serif_family = family;
    }

    if let Some(family) = args.sans_serif_family {
        fonts.sans_serif_family = family;
    }

    if let Some(family) = args.monospace_family {
        fonts.monospace_family = family;
    }

    Ok(Args {
        in_page: args.input,
        target: args.target,
        index: args.index,
        copy: args.copy,
        out_dir: args.out_dir.unwrap_or_else(|| path::PathBuf::from(".")),
        title: args.title,
        dpi: args.dpi,
        settings: args.settings,
        list_commands: args.list_commands,
        health: args.health,
        quiet: args.quiet,
        verbose: args.verbose,
        fonts,
    })
}

#[cfg(feature = "system-clipboard")]
fn clipboard() -> Rc<dyn Clipboard> {
    // The process exits right after the copy.
    Rc::new(mermaid_png::sink::SystemClipboard::waiting())
}

#[cfg(not(feature = "system-clipboard"))]
fn clipboard() -> Rc<dyn Clipboard> {
    Rc::new(mermaid_png::sink::UnavailableClipboard)
}

/// Picks the element a context menu would be opened on.
fn select_target(
    page: &Document,
    selector: Option<&str>,
    index: usize,
) -> Result<mermaid_png::dom::NodeId, String> {
    let candidates: Vec<Node> = match selector {
        Some(selector) => page.select_all(selector).map_err(|e| e.to_string())?,
        None => page.descendants().filter(|n| is_diagram(*n)).collect(),
    };

    if candidates.is_empty() {
        return Err(match selector {
            Some(selector) => format!("'{}' matches nothing", selector),
            None => "no Mermaid diagrams found".to_string(),
        });
    }

    log::debug!("{} target(s) found.", candidates.len());

    candidates
        .get(index)
        .map(|n| n.id())
        .ok_or_else(|| format!("target {} is out of range (0..{})", index, candidates.len()))
}

/// Checks that an element is a diagram itself and not just a part of one.
fn is_diagram(node: Node) -> bool {
    if !(node.has_tag_name("svg") || node.has_tag_name("img")) {
        return false;
    }

    ConversionSource::resolve(node).map_or(false, |source| source.node() == node)
}

/// A simple stderr logger.
static LOGGER: SimpleLogger = SimpleLogger;
struct SimpleLogger;
impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let target = if !record.target().is_empty() {
                record.target()
            } else {
                record.module_path().unwrap_or_default()
            };

            let line = record.line().unwrap_or(0);
            let args = record.args();

            match record.level() {
                log::Level::Error => eprintln!("Error (in {}:{}): {}", target, line, args),
                log::Level::Warn => eprintln!("Warning (in {}:{}): {}", target, line, args),
                log::Level::Info => eprintln!("Info (in {}:{}): {}", target, line, args),
                log::Level::Debug => eprintln!("Debug (in {}:{}): {}", target, line, args),
                log::Level::Trace => eprintln!("Trace (in {}:{}): {}", target, line, args),
            }
        }
    }

    fn flush(&self) {}
}
