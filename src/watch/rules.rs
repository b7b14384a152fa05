//! The rule table mapping changed paths to pipeline steps.
//!
//! Each rule pairs a set of glob patterns with the step sequence it
//! triggers and whether connected browsers reload afterwards. Rules are
//! evaluated in table order; a changed path may match several rules and
//! each fires once per batch.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::step::StepId;

pub(super) struct WatchRule {
    pub(super) name: &'static str,
    pub(super) patterns: Vec<glob::Pattern>,
    pub(super) steps: Vec<StepId>,
    pub(super) reload: bool,
}

impl WatchRule {
    pub(super) fn matches(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches_path(path))
    }
}

fn pattern(dir: &Path, suffix: &str) -> Result<glob::Pattern, glob::PatternError> {
    glob::Pattern::new(&format!("{}/{suffix}", dir.display()))
}

/// Build the full rule table for a loaded config.
///
/// Template infrastructure (layouts, partials, data, helpers) resets the
/// cached template state before re-rendering, so every page picks up the
/// change. Page sources re-render without a reset. Static assets copy
/// without a browser reload.
pub(super) fn build_rules(config: &Config) -> Result<Vec<WatchRule>, glob::PatternError> {
    let pages = &config.pages;

    let mut asset_patterns = Vec::new();
    for source in &config.assets.sources {
        asset_patterns.push(glob::Pattern::new(
            &config.root_join(source).to_string_lossy(),
        )?);
    }

    // Data files by extension; the glob crate has no `{json,yml}` braces
    let mut data_patterns = Vec::new();
    for ext in ["json", "yml", "yaml", "toml"] {
        data_patterns.push(pattern(&pages.data, &format!("**/*.{ext}"))?);
    }

    Ok(vec![
        WatchRule {
            name: "assets",
            patterns: asset_patterns,
            steps: vec![StepId::Copy],
            reload: false,
        },
        WatchRule {
            name: "pages",
            patterns: vec![pattern(&pages.source, "**/*.html")?],
            steps: vec![StepId::Pages],
            reload: true,
        },
        WatchRule {
            name: "layouts",
            patterns: vec![pattern(&pages.layouts, "**/*.html")?],
            steps: vec![StepId::ResetPages, StepId::Pages],
            reload: true,
        },
        WatchRule {
            name: "partials",
            patterns: vec![pattern(&pages.partials, "**/*.html")?],
            steps: vec![StepId::ResetPages, StepId::Pages],
            reload: true,
        },
        WatchRule {
            name: "data",
            patterns: data_patterns,
            steps: vec![StepId::ResetPages, StepId::Pages],
            reload: true,
        },
        WatchRule {
            name: "helpers",
            patterns: vec![pattern(&pages.helpers, "**/*")?],
            steps: vec![StepId::ResetPages, StepId::Pages],
            reload: true,
        },
        WatchRule {
            name: "styles",
            patterns: vec![pattern(&config.styles.source, "**/*.scss")?],
            steps: vec![StepId::Styles],
            reload: true,
        },
        WatchRule {
            name: "scripts",
            patterns: vec![pattern(&config.scripts.source, "**/*.js")?],
            steps: vec![StepId::Scripts],
            reload: true,
        },
        WatchRule {
            name: "images",
            patterns: vec![pattern(&config.images.source, "**/*")?],
            steps: vec![StepId::Images],
            reload: true,
        },
    ])
}

/// Directories to register with the filesystem watcher. Missing
/// directories are skipped; notify errors on nonexistent roots.
pub(super) fn watch_roots(config: &Config) -> Vec<PathBuf> {
    let mut roots = vec![
        config.pages.source.clone(),
        config.pages.layouts.clone(),
        config.pages.partials.clone(),
        config.pages.data.clone(),
        config.pages.helpers.clone(),
        config.styles.source.clone(),
        config.scripts.source.clone(),
        config.images.source.clone(),
        config.assets.base.clone(),
    ];
    roots.retain(|r| r.is_dir());
    roots.dedup();
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use tempfile::TempDir;

    fn rule<'a>(rules: &'a [WatchRule], name: &str) -> &'a WatchRule {
        rules.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn test_layout_change_resets_then_renders() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let rules = build_rules(&config).unwrap();

        let path = config.pages.layouts.join("default.html");
        let matched: Vec<&WatchRule> = rules.iter().filter(|r| r.matches(&path)).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "layouts");
        assert_eq!(matched[0].steps, vec![StepId::ResetPages, StepId::Pages]);
        assert!(matched[0].reload);
    }

    #[test]
    fn test_page_change_renders_without_reset() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let rules = build_rules(&config).unwrap();

        let path = config.pages.source.join("blog/post.html");
        assert!(rule(&rules, "pages").matches(&path));
        assert_eq!(rule(&rules, "pages").steps, vec![StepId::Pages]);
    }

    #[test]
    fn test_asset_change_copies_without_reload() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let rules = build_rules(&config).unwrap();

        let path = config.assets.base.join("fonts/body.woff2");
        let asset_rule = rule(&rules, "assets");
        assert!(asset_rule.matches(&path));
        assert_eq!(asset_rule.steps, vec![StepId::Copy]);
        assert!(!asset_rule.reload);
    }

    #[test]
    fn test_data_extensions_matched_individually() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let rules = build_rules(&config).unwrap();

        let data = rule(&rules, "data");
        assert!(data.matches(&config.pages.data.join("site.yml")));
        assert!(data.matches(&config.pages.data.join("nav.json")));
        assert!(data.matches(&config.pages.data.join("deep/links.toml")));
        assert!(!data.matches(&config.pages.data.join("notes.txt")));
    }

    #[test]
    fn test_scss_change_triggers_styles_only() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let rules = build_rules(&config).unwrap();

        let path = config.styles.source.join("components/_card.scss");
        let matched: Vec<&str> = rules
            .iter()
            .filter(|r| r.matches(&path))
            .map(|r| r.name)
            .collect();
        assert_eq!(matched, vec!["styles"]);
    }
}
