//! Command-line configuration for tiff-uml.
//!
//! Two subcommands share one set of report options:
//!
//! - `diagram` renders the annotated metadata tree through PlantUML
//! - `dump` writes the annotated metadata tree as YAML or JSON
//!
//! # Environment Variables
//!
//! Report options can also be set with the `TIFF_UML_` prefix:
//!
//! - `TIFF_UML_MINTHUMB` - Smallest thumbnail long edge (default: 64)
//! - `TIFF_UML_MAXTHUMB` - Largest thumbnail long edge (default: 512)
//! - `TIFF_UML_MAX_ITEMS` - Array items shown in the native dump (default: 6)
//! - `TIFF_UML_MAX_TEXT` - Text characters shown in the native dump (default: 40)
//! - `TIFF_UML_TIMEOUT` - External program timeout in seconds (default: 60)
//! - `TIFF_UML_OPTIPNG` - optipng executable (default: optipng)
//! - `TIFF_UML_TIFFTOOLS` - tifftools executable (default: tifftools)
//! - `TIFF_UML_PLANTUML` - plantuml executable (default: plantuml)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::annotate::{DEFAULT_MAX_THUMB, DEFAULT_MIN_THUMB};
use crate::report::{OverlaySelection, DEFAULT_MAX_ITEMS, DEFAULT_MAX_TEXT};

// =============================================================================
// Default Values
// =============================================================================

/// Default timeout for external programs, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default optimizer executable.
pub const DEFAULT_OPTIPNG: &str = "optipng";

/// Default external dumper executable.
pub const DEFAULT_TIFFTOOLS: &str = "tifftools";

/// Default diagram renderer executable.
pub const DEFAULT_PLANTUML: &str = "plantuml";

// =============================================================================
// CLI Arguments
// =============================================================================

/// tiff-uml - Diagrams of the internal structure of TIFF files.
///
/// Lists every Image File Directory of a TIFF or BigTIFF file, optionally
/// with thumbnails showing its tiling and the order its chunks were written.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiff-uml")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render the metadata tree as a PlantUML diagram.
    Diagram(DiagramConfig),

    /// Write the metadata tree as YAML or JSON.
    Dump(DumpConfig),
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ReportConfig {
    /// TIFF file to inspect.
    pub source: PathBuf,

    /// Destination file; stdout when absent or "-".
    #[arg(long = "out", visible_alias = "dest")]
    pub out: Option<PathBuf>,

    // =========================================================================
    // Images
    // =========================================================================
    /// Add a plain thumbnail of each directory.
    #[arg(long, visible_aliases = ["thumbnails", "images"], default_value_t = false)]
    pub thumb: bool,

    /// Draw the tile or strip grid on a thumbnail.
    #[arg(long, default_value_t = false)]
    pub structure: bool,

    /// Shade a thumbnail by the order tiles or strips were written.
    #[arg(long, default_value_t = false)]
    pub order: bool,

    /// Thumbnail long edge for the smallest directory.
    #[arg(long, default_value_t = DEFAULT_MIN_THUMB, env = "TIFF_UML_MINTHUMB")]
    pub minthumb: u32,

    /// Thumbnail long edge for the largest directory.
    #[arg(long, default_value_t = DEFAULT_MAX_THUMB, env = "TIFF_UML_MAXTHUMB")]
    pub maxthumb: u32,

    /// Do not run thumbnails through optipng.
    #[arg(long, default_value_t = false)]
    pub no_optimize: bool,

    // =========================================================================
    // Metadata Dump
    // =========================================================================
    /// Array items shown before truncating (native dump).
    #[arg(long, default_value_t = DEFAULT_MAX_ITEMS, env = "TIFF_UML_MAX_ITEMS")]
    pub max_items: usize,

    /// Text characters shown before truncating (native dump).
    #[arg(long, default_value_t = DEFAULT_MAX_TEXT, env = "TIFF_UML_MAX_TEXT")]
    pub max_text: usize,

    /// Dump metadata with `tifftools dump --yaml` instead of the built-in reader.
    #[arg(long, default_value_t = false)]
    pub tifftools: bool,

    /// Extra argument for `tifftools dump` (repeatable). Replaces the
    /// defaults `--max 6 --max-text 40`.
    #[arg(long = "dump-arg", allow_hyphen_values = true)]
    pub dump_args: Vec<String>,

    // =========================================================================
    // External Programs
    // =========================================================================
    /// Timeout for external programs, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "TIFF_UML_TIMEOUT")]
    pub timeout: u64,

    /// optipng executable.
    #[arg(long, default_value = DEFAULT_OPTIPNG, env = "TIFF_UML_OPTIPNG")]
    pub optipng: String,

    /// tifftools executable.
    #[arg(long = "tifftools-program", default_value = DEFAULT_TIFFTOOLS, env = "TIFF_UML_TIFFTOOLS")]
    pub tifftools_program: String,

    // =========================================================================
    // Logging
    // =========================================================================
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ReportConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.minthumb == 0 {
            return Err("minthumb must be at least 1".to_string());
        }
        if self.minthumb >= self.maxthumb {
            return Err(format!(
                "minthumb ({}) must be smaller than maxthumb ({})",
                self.minthumb, self.maxthumb
            ));
        }
        if self.timeout == 0 {
            return Err("timeout must be at least 1 second".to_string());
        }
        if self.max_items == 0 {
            return Err("max_items must be greater than 0".to_string());
        }
        if self.max_text == 0 {
            return Err("max_text must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn selection(&self) -> OverlaySelection {
        OverlaySelection {
            thumb: self.thumb,
            structure: self.structure,
            order: self.order,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Output path, `None` for stdout.
    pub fn destination(&self) -> Option<&PathBuf> {
        self.out.as_ref().filter(|p| p.as_os_str() != "-")
    }
}

/// `diagram` subcommand.
#[derive(Args, Debug, Clone)]
pub struct DiagramConfig {
    #[command(flatten)]
    pub report: ReportConfig,

    /// Also write the intermediate JSON-UML document here.
    #[arg(long)]
    pub uml: Option<PathBuf>,

    /// plantuml executable.
    #[arg(long, default_value = DEFAULT_PLANTUML, env = "TIFF_UML_PLANTUML")]
    pub plantuml: String,

    /// Arguments for plantuml after `--`; default `-tsvg`.
    #[arg(last = true)]
    pub plantuml_args: Vec<String>,
}

impl DiagramConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.report.validate()
    }
}

/// Output format of the `dump` subcommand.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DumpFormat {
    #[default]
    Yaml,
    Json,
}

/// `dump` subcommand.
#[derive(Args, Debug, Clone)]
pub struct DumpConfig {
    #[command(flatten)]
    pub report: ReportConfig,

    /// Output format.
    #[arg(long, value_enum, default_value_t = DumpFormat::Yaml)]
    pub format: DumpFormat,
}

impl DumpConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.report.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
