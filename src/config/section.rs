//! Configuration sections of `sitewright.toml`.
//!
//! Each asset class has its own section pairing a source location with a
//! destination inside the dist directory. Sections are required; fields
//! with an obvious convention carry a default mirroring the standard
//! project layout.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// `[serve]` - development server settings.
///
/// # Example
///
/// ```toml
/// [serve]
/// port = 8000
/// interface = "127.0.0.1"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// HTTP port number. Required.
    pub port: u16,

    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    #[serde(default = "default_interface")]
    pub interface: IpAddr,
}

fn default_interface() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

/// `[pages]` - template rendering paths.
///
/// Pages render against shared layouts, partials, and data. The helpers
/// directory is watched for parity with the layout/partial rules but holds
/// no executable code; helper functionality comes from the template
/// engine's built-in functions and filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    /// Directory of page templates. Required.
    pub source: PathBuf,

    /// Directory of layout templates, selected by frontmatter `layout:`.
    #[serde(default = "default_layouts")]
    pub layouts: PathBuf,

    /// Directory of partial templates available to `{% include %}`.
    #[serde(default = "default_partials")]
    pub partials: PathBuf,

    /// Directory of data files (json/yml/yaml/toml) exposed to templates
    /// keyed by file stem.
    #[serde(default = "default_data")]
    pub data: PathBuf,

    /// Helpers directory (watched; a change forces a full re-render).
    #[serde(default = "default_helpers")]
    pub helpers: PathBuf,
}

fn default_layouts() -> PathBuf {
    PathBuf::from("src/templates/layouts")
}

fn default_partials() -> PathBuf {
    PathBuf::from("src/templates/partials")
}

fn default_data() -> PathBuf {
    PathBuf::from("src/templates/data")
}

fn default_helpers() -> PathBuf {
    PathBuf::from("src/templates/helpers")
}

/// `[styles]` - Sass compilation paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Sass source directory. Top-level non-partial `*.scss` files are
    /// compiled; `_`-prefixed files are reachable only through `@use`.
    pub source: PathBuf,

    /// Destination subdirectory inside dist.
    #[serde(default = "default_styles_dest")]
    pub dest: PathBuf,

    /// Extra Sass include paths (e.g. a vendored framework).
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
}

fn default_styles_dest() -> PathBuf {
    PathBuf::from("css")
}

/// `[scripts]` - script bundling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Script source tree (watched).
    pub source: PathBuf,

    /// Entry points, each bundled independently to `<dest>/<stem>.js`.
    pub entries: Vec<PathBuf>,

    /// Destination subdirectory inside dist.
    #[serde(default = "default_scripts_dest")]
    pub dest: PathBuf,

    /// External bundler executable, resolved from PATH.
    #[serde(default = "default_bundler")]
    pub bundler: String,
}

fn default_scripts_dest() -> PathBuf {
    PathBuf::from("js")
}

fn default_bundler() -> String {
    "esbuild".to_string()
}

/// `[images]` - image processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Image source tree.
    pub source: PathBuf,

    /// Destination subdirectory inside dist.
    #[serde(default = "default_images_dest")]
    pub dest: PathBuf,
}

fn default_images_dest() -> PathBuf {
    PathBuf::from("img")
}

/// `[assets]` - verbatim static copy.
///
/// The exclude list keeps the image/script/style source trees out of the
/// copy; those are handled by their dedicated runners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Glob patterns (relative to the project root) selecting files to copy.
    pub sources: Vec<String>,

    /// Glob patterns excluded from the copy.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Base directory stripped from matches to form the dist-relative path.
    pub base: PathBuf,
}
