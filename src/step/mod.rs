//! Build steps: one runner per named transformation.
//!
//! Every runner satisfies the same capability interface ([`StepRunner`])
//! and is registered in the explicit table in [`runner`] - no runtime
//! discovery. Runners are stateless between invocations, with one
//! sanctioned exception: the pages runner caches parsed layout/partial/data
//! state inside the [`Pipeline`] and the `reset-pages` step drops it.

pub mod clean;
pub mod copy;
pub mod images;
pub mod pages;
pub mod scripts;
pub mod styles;

use std::fmt;
use std::io;
use std::path::PathBuf;

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::Config;
use crate::core::Mode;

// ============================================================================
// StepId
// ============================================================================

/// Identifier of a named build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Clean,
    Pages,
    ResetPages,
    Styles,
    Scripts,
    Images,
    Copy,
}

impl StepId {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Pages => "pages",
            Self::ResetPages => "reset-pages",
            Self::Styles => "styles",
            Self::Scripts => "scripts",
            Self::Images => "images",
            Self::Copy => "copy",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// StepError
// ============================================================================

/// Failure of an individual step runner.
///
/// Carries the source location when the underlying tool provides one
/// (Sass and template errors embed line/column in their messages). Fatal
/// in a one-shot build; surfaced but non-fatal under watch.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("IO error on `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("template error in `{path}`: {message}")]
    Template { path: PathBuf, message: String },

    #[error("Sass compilation failed:\n{0}")]
    Sass(String),

    #[error("CSS post-processing failed for `{path}`: {message}")]
    Css { path: PathBuf, message: String },

    #[error("invalid browser compatibility list: {0}")]
    Targets(String),

    #[error("bundler `{0}` not found in PATH")]
    ToolMissing(String),

    #[error("bundler failed for `{entry}`:\n{stderr}")]
    Bundler { entry: PathBuf, stderr: String },

    #[error("image processing failed for `{path}`")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid glob pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
}

impl StepError {
    /// Shorthand for the common IO case.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ============================================================================
// StepReport / StepRunner
// ============================================================================

/// Success summary of a runner invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepReport {
    /// Number of files written to the dist directory.
    pub written: usize,
}

impl StepReport {
    pub const fn new(written: usize) -> Self {
        Self { written }
    }
}

/// Fixed capability interface every step runner satisfies.
pub trait StepRunner: Sync {
    fn id(&self) -> StepId;

    /// Transform the step's source file set into its destination file set.
    fn run(&self, pipeline: &Pipeline) -> Result<StepReport, StepError>;
}

/// The explicit step table. Adding a step means adding a row here.
pub fn runner(id: StepId) -> &'static dyn StepRunner {
    match id {
        StepId::Clean => &clean::CleanStep,
        StepId::Pages => &pages::PagesStep,
        StepId::ResetPages => &pages::ResetPagesStep,
        StepId::Styles => &styles::StylesStep,
        StepId::Scripts => &scripts::ScriptsStep,
        StepId::Images => &images::ImagesStep,
        StepId::Copy => &copy::CopyStep,
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Shared state handed to every runner: the immutable configuration, the
/// build mode, and the pages renderer cache.
///
/// No ambient globals: everything a runner needs comes in through here.
pub struct Pipeline {
    pub config: Config,
    pub mode: Mode,
    /// Cached template state. `None` until the pages step first runs;
    /// reset-pages drops it so the next render reparses everything.
    pub(crate) renderer: Mutex<Option<pages::Renderer>>,
}

impl Pipeline {
    pub fn new(config: Config, mode: Mode) -> Self {
        Self {
            config,
            mode,
            renderer: Mutex::new(None),
        }
    }

    /// Execute a single step through the runner table.
    pub fn run_step(&self, id: StepId) -> Result<StepReport, StepError> {
        runner(id).run(self)
    }
}
