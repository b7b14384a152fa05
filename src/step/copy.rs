//! The `copy` step: verbatim static-asset copy.
//!
//! Copies every file matching the configured source globs into dist,
//! preserving the path relative to the assets base directory. The exclude
//! globs keep the image/script/style trees out - those have dedicated
//! runners and must not be double-processed.

use std::path::Path;

use super::{Pipeline, StepError, StepId, StepReport, StepRunner};
use crate::config::Config;
use crate::utils::fs::copy_file;

pub struct CopyStep;

impl StepRunner for CopyStep {
    fn id(&self) -> StepId {
        StepId::Copy
    }

    fn run(&self, pipeline: &Pipeline) -> Result<StepReport, StepError> {
        let config = &pipeline.config;
        let exclude = compile_patterns(config, &config.assets.exclude)?;

        let mut written = 0;
        for pattern in &config.assets.sources {
            let full = config.root_join(pattern);
            let full = full.to_string_lossy();
            let matches = glob::glob(&full).map_err(|e| StepError::Pattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;

            for entry in matches {
                let path = match entry {
                    Ok(p) => p,
                    // Unreadable directory entries are skipped, not fatal
                    Err(e) => {
                        crate::debug!("copy"; "skipping unreadable entry: {}", e);
                        continue;
                    }
                };
                if !path.is_file() || is_excluded(&path, &exclude) {
                    continue;
                }

                let dest = config.dist.join(dist_relative(&path, config));
                copy_file(&path, &dest).map_err(|e| StepError::io(&path, e))?;
                written += 1;
            }
        }

        Ok(StepReport::new(written))
    }
}

/// Compile relative glob strings against the project root.
fn compile_patterns(config: &Config, patterns: &[String]) -> Result<Vec<glob::Pattern>, StepError> {
    patterns
        .iter()
        .map(|p| {
            let full = config.root_join(p);
            glob::Pattern::new(&full.to_string_lossy()).map_err(|e| StepError::Pattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn is_excluded(path: &Path, exclude: &[glob::Pattern]) -> bool {
    exclude.iter().any(|p| p.matches_path(path))
}

/// Path of the copied file inside dist: relative to the assets base, or
/// just the file name for matches outside it.
fn dist_relative<'a>(path: &'a Path, config: &Config) -> &'a Path {
    path.strip_prefix(&config.assets.base).unwrap_or_else(|_| {
        path.file_name()
            .map(Path::new)
            .unwrap_or_else(|| Path::new(""))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::core::Mode;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Pipeline) {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(config.assets.base.join("fonts")).unwrap();
        fs::create_dir_all(config.assets.base.join("img")).unwrap();
        fs::write(config.assets.base.join("robots.txt"), "User-agent: *").unwrap();
        fs::write(config.assets.base.join("fonts/body.woff2"), "woff").unwrap();
        fs::write(config.assets.base.join("img/skip-me.png"), "png").unwrap();
        fs::create_dir_all(&config.dist).unwrap();
        (temp, Pipeline::new(config, Mode::Development))
    }

    #[test]
    fn test_copy_preserves_relative_path() {
        let (_temp, pipeline) = fixture();
        let report = CopyStep.run(&pipeline).unwrap();

        assert_eq!(report.written, 2);
        assert!(pipeline.config.dist.join("robots.txt").is_file());
        assert!(pipeline.config.dist.join("fonts/body.woff2").is_file());
    }

    #[test]
    fn test_copy_skips_excluded_trees() {
        let (_temp, pipeline) = fixture();
        CopyStep.run(&pipeline).unwrap();

        // img/ is handled by the images runner, not the copy step
        assert!(!pipeline.config.dist.join("img/skip-me.png").exists());
    }

    #[test]
    fn test_copy_is_verbatim() {
        let (_temp, pipeline) = fixture();
        CopyStep.run(&pipeline).unwrap();

        let copied = fs::read(pipeline.config.dist.join("robots.txt")).unwrap();
        assert_eq!(copied, b"User-agent: *");
    }
}
