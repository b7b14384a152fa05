//! The `styles` step: Sass compilation plus CSS post-processing.
//!
//! Each top-level non-partial `*.scss` file compiles with grass, then runs
//! through lightningcss with targets parsed from the configured
//! browserslist queries (vendor prefixing). Production output is minified
//! with no source map; development output is pretty-printed and carries a
//! `sourceMappingURL` reference with the map written next to the CSS.

use std::fs;
use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use super::{Pipeline, StepError, StepId, StepReport, StepRunner};
use crate::config::Config;

pub struct StylesStep;

impl StepRunner for StylesStep {
    fn id(&self) -> StepId {
        StepId::Styles
    }

    fn run(&self, pipeline: &Pipeline) -> Result<StepReport, StepError> {
        let config = &pipeline.config;
        let dest = config.dist.join(&config.styles.dest);
        fs::create_dir_all(&dest).map_err(|e| StepError::io(&dest, e))?;

        let targets = browser_targets(&config.compatibility)?;

        let mut written = 0;
        for entry in entry_files(&config.styles.source)? {
            written += compile_one(&entry, &dest, config, targets, pipeline.mode.is_production())?;
        }

        Ok(StepReport::new(written))
    }
}

/// Top-level `*.scss` files that are not `_`-prefixed partials.
fn entry_files(source: &Path) -> Result<Vec<PathBuf>, StepError> {
    if !source.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(source)
        .map_err(|e| StepError::io(source, e))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension().and_then(|e| e.to_str()) == Some("scss")
                && !p
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('_'))
        })
        .collect();
    entries.sort();
    Ok(entries)
}

/// Parse browserslist queries into lightningcss targets.
fn browser_targets(queries: &[String]) -> Result<Targets, StepError> {
    let browsers =
        Browsers::from_browserslist(queries).map_err(|e| StepError::Targets(e.to_string()))?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Compile a single entry. Returns the number of files written (css, plus
/// the map in development mode).
fn compile_one(
    entry: &Path,
    dest: &Path,
    config: &Config,
    targets: Targets,
    production: bool,
) -> Result<usize, StepError> {
    let stem = entry
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("styles");
    let css_path = dest.join(format!("{stem}.css"));

    let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
    for load_path in &config.styles.load_paths {
        options = options.load_path(load_path);
    }
    // node_modules mirrors the conventional Sass include path for vendored
    // frameworks pulled in with `@use`
    options = options.load_path(config.root_join("node_modules"));

    let css = grass::from_path(entry, &options).map_err(|e| StepError::Sass(e.to_string()))?;

    let filename = entry.to_string_lossy().into_owned();
    let sheet = StyleSheet::parse(
        &css,
        ParserOptions {
            filename,
            ..ParserOptions::default()
        },
    )
    .map_err(|e| StepError::Css {
        path: entry.to_path_buf(),
        message: e.to_string(),
    })?;

    if production {
        let out = sheet
            .to_css(PrinterOptions {
                minify: true,
                targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| StepError::Css {
                path: entry.to_path_buf(),
                message: e.to_string(),
            })?;
        fs::write(&css_path, out.code).map_err(|e| StepError::io(&css_path, e))?;
        return Ok(1);
    }

    let mut map = SourceMap::new("/");
    let out = sheet
        .to_css(PrinterOptions {
            minify: false,
            targets,
            source_map: Some(&mut map),
            ..PrinterOptions::default()
        })
        .map_err(|e| StepError::Css {
            path: entry.to_path_buf(),
            message: e.to_string(),
        })?;

    let map_name = format!("{stem}.css.map");
    let code = format!("{}\n/*# sourceMappingURL={map_name} */\n", out.code);
    fs::write(&css_path, code).map_err(|e| StepError::io(&css_path, e))?;

    let map_path = dest.join(map_name);
    let map_json = map.to_json(None).map_err(|e| StepError::Css {
        path: entry.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(&map_path, map_json).map_err(|e| StepError::io(&map_path, e))?;

    Ok(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::core::Mode;
    use tempfile::TempDir;

    const FIXTURE_SCSS: &str = "$accent: #336699;\nbody {\n  color: $accent;\n  margin: 0;\n}\n";

    fn fixture(mode: Mode) -> (TempDir, Pipeline) {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.styles.source).unwrap();
        fs::write(config.styles.source.join("app.scss"), FIXTURE_SCSS).unwrap();
        fs::write(config.styles.source.join("_partial.scss"), "em { x: 1; }").unwrap();
        fs::create_dir_all(&config.dist).unwrap();
        (temp, Pipeline::new(config, mode))
    }

    #[test]
    fn test_production_minified_no_source_map() {
        let (_temp, pipeline) = fixture(Mode::Production);
        let report = StylesStep.run(&pipeline).unwrap();

        assert_eq!(report.written, 1);
        let css = fs::read_to_string(pipeline.config.dist.join("css/app.css")).unwrap();
        assert!(!css.contains("sourceMappingURL"));
        // Minified: no indentation, compact declarations
        assert!(css.contains("body{"));
        assert!(!pipeline.config.dist.join("css/app.css.map").exists());
    }

    #[test]
    fn test_development_pretty_with_source_map() {
        let (_temp, pipeline) = fixture(Mode::Development);
        let report = StylesStep.run(&pipeline).unwrap();

        assert_eq!(report.written, 2);
        let css = fs::read_to_string(pipeline.config.dist.join("css/app.css")).unwrap();
        assert!(css.contains("sourceMappingURL=app.css.map"));
        // Not minified: declarations on separate lines
        assert!(css.contains("body {"));
        assert!(pipeline.config.dist.join("css/app.css.map").is_file());
    }

    #[test]
    fn test_same_input_two_modes_two_outputs() {
        let (_dev_temp, dev) = fixture(Mode::Development);
        let (_prod_temp, prod) = fixture(Mode::Production);
        StylesStep.run(&dev).unwrap();
        StylesStep.run(&prod).unwrap();

        let dev_css = fs::read_to_string(dev.config.dist.join("css/app.css")).unwrap();
        let prod_css = fs::read_to_string(prod.config.dist.join("css/app.css")).unwrap();
        assert_ne!(dev_css, prod_css);
    }

    #[test]
    fn test_production_rebuild_is_byte_identical() {
        let (_temp, pipeline) = fixture(Mode::Production);
        StylesStep.run(&pipeline).unwrap();
        let first = fs::read(pipeline.config.dist.join("css/app.css")).unwrap();

        StylesStep.run(&pipeline).unwrap();
        let second = fs::read(pipeline.config.dist.join("css/app.css")).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn test_underscore_partials_not_compiled() {
        let (_temp, pipeline) = fixture(Mode::Production);
        StylesStep.run(&pipeline).unwrap();

        assert!(!pipeline.config.dist.join("css/_partial.css").exists());
    }

    #[test]
    fn test_invalid_sass_reports_error() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.styles.source).unwrap();
        fs::write(config.styles.source.join("bad.scss"), "body { color: $undefined; }").unwrap();
        let pipeline = Pipeline::new(config, Mode::Development);

        let result = StylesStep.run(&pipeline);
        assert!(matches!(result, Err(StepError::Sass(_))));
    }
}
