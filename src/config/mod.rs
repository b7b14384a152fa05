//! Configuration management for `sitewright.toml`.
//!
//! The configuration is loaded once at process start and is immutable for
//! the process lifetime. The config file itself is NOT watched: templates,
//! styles, scripts, and images are, but a config change requires a restart.
//!
//! # Sections
//!
//! | Key / section   | Purpose                                      |
//! |-----------------|----------------------------------------------|
//! | `dist`          | Output directory (required)                  |
//! | `compatibility` | Browserslist queries for CSS prefixing       |
//! | `[serve]`       | Development server (port, interface)         |
//! | `[pages]`       | Template source/layouts/partials/data paths  |
//! | `[styles]`      | Sass source, dest, include paths             |
//! | `[scripts]`     | Entry points, dest, bundler executable       |
//! | `[images]`      | Image source and dest                        |
//! | `[assets]`      | Static-copy globs, excludes, base            |

mod error;
mod section;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{
    AssetsConfig, ImagesConfig, PagesConfig, ScriptsConfig, ServeConfig, StylesConfig,
};

use crate::log;
use crate::utils::path::normalize_path;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration representing sitewright.toml.
///
/// Produced once by [`Config::load`]; all paths are absolute afterwards
/// (normalized against the config file's parent directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Output directory.
    pub dist: PathBuf,

    /// Browserslist queries driving vendor-prefix insertion
    /// (e.g. `["last 2 versions", "ie >= 9"]`).
    pub compatibility: Vec<String>,

    /// Development server settings.
    pub serve: ServeConfig,

    /// Template rendering paths.
    pub pages: PagesConfig,

    /// Sass compilation paths.
    pub styles: StylesConfig,

    /// Script bundling settings.
    pub scripts: ScriptsConfig,

    /// Image processing paths.
    pub images: ImagesConfig,

    /// Static-copy settings.
    pub assets: AssetsConfig,
}

impl Config {
    /// Load and validate configuration from a file path.
    ///
    /// Fails when the file is missing or unreadable (`Io`), when the TOML is
    /// malformed or a required key is absent (`Toml`), or when a semantic
    /// check fails (`Validation`). Performs no filesystem writes.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            // Unknown keys warn instead of prompting: the tool must keep
            // running unattended under watch
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.validate_raw()?;

        config.config_path = normalize_path(path);
        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.normalize_paths(&root);

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Join a path with the project root.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Normalize all configured paths to absolute form under `root`.
    ///
    /// Asset glob patterns stay relative; they are joined with the root at
    /// match time.
    fn normalize_paths(&mut self, root: &Path) {
        let root = normalize_path(root);

        self.dist = normalize_path(&root.join(&self.dist));

        self.pages.source = normalize_path(&root.join(&self.pages.source));
        self.pages.layouts = normalize_path(&root.join(&self.pages.layouts));
        self.pages.partials = normalize_path(&root.join(&self.pages.partials));
        self.pages.data = normalize_path(&root.join(&self.pages.data));
        self.pages.helpers = normalize_path(&root.join(&self.pages.helpers));

        self.styles.source = normalize_path(&root.join(&self.styles.source));
        self.styles.load_paths = self
            .styles
            .load_paths
            .iter()
            .map(|p| normalize_path(&root.join(p)))
            .collect();

        self.scripts.source = normalize_path(&root.join(&self.scripts.source));
        self.scripts.entries = self
            .scripts
            .entries
            .iter()
            .map(|p| normalize_path(&root.join(p)))
            .collect();

        self.images.source = normalize_path(&root.join(&self.images.source));
        self.assets.base = normalize_path(&root.join(&self.assets.base));

        self.root = root;
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Pre-validate paths before normalization.
    ///
    /// Must run before `normalize_paths` because normalization converts
    /// relative paths to absolute, making it impossible to detect that the
    /// user wrote an absolute path in the config.
    fn validate_raw(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        let relative_only: [(&str, &Path); 9] = [
            ("dist", &self.dist),
            ("pages.source", &self.pages.source),
            ("pages.layouts", &self.pages.layouts),
            ("pages.partials", &self.pages.partials),
            ("pages.data", &self.pages.data),
            ("pages.helpers", &self.pages.helpers),
            ("styles.source", &self.styles.source),
            ("scripts.source", &self.scripts.source),
            ("images.source", &self.images.source),
        ];
        for (field, path) in relative_only {
            if path.is_absolute() {
                diag.error(field, "must be relative to the project root");
            }
        }

        for pattern in self.assets.sources.iter().chain(&self.assets.exclude) {
            if Path::new(pattern).is_absolute() {
                diag.error("assets", format!("pattern `{pattern}` must be relative"));
            }
        }

        diag.into_result().map_err(ConfigError::Validation)
    }

    /// Validate semantic constraints after normalization.
    ///
    /// Collects all validation errors and returns them at once.
    fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if self.compatibility.is_empty() {
            diag.error_with_hint(
                "compatibility",
                "browser compatibility list must not be empty",
                "e.g. compatibility = [\"last 2 versions\"]",
            );
        }

        if self.scripts.entries.is_empty() {
            diag.error_with_hint(
                "scripts.entries",
                "at least one entry point is required",
                "e.g. entries = [\"src/js/app.js\"]",
            );
        }

        if self.assets.sources.is_empty() {
            diag.error("assets.sources", "at least one glob pattern is required");
        }

        // Parallel steps must not share a destination with clean's owner:
        // dist overlapping a source tree would let a build consume its own
        // output (or clean delete the sources)
        let sources: [(&str, &Path); 8] = [
            ("pages.source", &self.pages.source),
            ("pages.layouts", &self.pages.layouts),
            ("pages.partials", &self.pages.partials),
            ("pages.data", &self.pages.data),
            ("styles.source", &self.styles.source),
            ("scripts.source", &self.scripts.source),
            ("images.source", &self.images.source),
            ("assets.base", &self.assets.base),
        ];
        for (field, source) in sources {
            if source.starts_with(&self.dist) || self.dist.starts_with(source) {
                diag.error(
                    field,
                    format!("overlaps the dist directory `{}`", self.dist.display()),
                );
            }
        }

        diag.into_result().map_err(ConfigError::Validation)
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Build a fully-populated absolute-path config rooted at `root`.
/// Step runner tests lay fixture files out under the same layout.
#[cfg(test)]
pub(crate) fn test_config(root: &Path) -> Config {
    use std::net::{IpAddr, Ipv4Addr};

    Config {
        config_path: root.join("sitewright.toml"),
        root: root.to_path_buf(),
        dist: root.join("dist"),
        compatibility: vec!["last 2 versions".into()],
        serve: ServeConfig {
            port: 8000,
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        },
        pages: PagesConfig {
            source: root.join("src/templates/pages"),
            layouts: root.join("src/templates/layouts"),
            partials: root.join("src/templates/partials"),
            data: root.join("src/templates/data"),
            helpers: root.join("src/templates/helpers"),
        },
        styles: StylesConfig {
            source: root.join("src/scss"),
            dest: PathBuf::from("css"),
            load_paths: vec![],
        },
        scripts: ScriptsConfig {
            source: root.join("src/js"),
            entries: vec![root.join("src/js/app.js")],
            dest: PathBuf::from("js"),
            bundler: "esbuild".into(),
        },
        images: ImagesConfig {
            source: root.join("src/img"),
            dest: PathBuf::from("img"),
        },
        assets: AssetsConfig {
            sources: vec!["src/assets/**/*".into()],
            exclude: vec![
                "src/assets/img/**".into(),
                "src/assets/js/**".into(),
                "src/assets/scss/**".into(),
            ],
            base: root.join("src/assets"),
        },
    }
}

// ============================================================================
// tests
// ============================================================================
