//! The `pages` step: render page templates against shared layouts,
//! partials, and data.
//!
//! Rendering is two-phase: the page body renders first with the shared
//! context, then the selected layout renders with the body available as
//! `{{ body }}`. YAML frontmatter selects the layout (`layout:` key,
//! default `default`) and contributes page variables.
//!
//! Template names: partials register under their file stem (so a page or
//! layout writes `{% include "nav" %}`); layouts live in an internal
//! `layouts/` namespace looked up from frontmatter. Data files (json, yml,
//! yaml, toml) enter the context keyed by file stem. The helpers directory
//! holds no executable code; helper functionality maps to the engine's
//! built-in functions and filters, and the directory is still watched so a
//! change forces a reset.
//!
//! Parsed layout/partial/data state is cached on the [`Pipeline`] between
//! invocations; the `reset-pages` step invalidates it, which is how a
//! layout or partial change forces re-render of ALL pages.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use gray_matter::engine::YAML;
use gray_matter::{Matter, Pod};
use minijinja::value::Value;

use super::{Pipeline, StepError, StepId, StepReport, StepRunner};
use crate::config::Config;
use crate::utils::fs::{walk_files, walk_files_with_ext};

static MATTER: LazyLock<Matter<YAML>> = LazyLock::new(Matter::<YAML>::new);

pub struct PagesStep;
pub struct ResetPagesStep;

impl StepRunner for PagesStep {
    fn id(&self) -> StepId {
        StepId::Pages
    }

    fn run(&self, pipeline: &Pipeline) -> Result<StepReport, StepError> {
        let config = &pipeline.config;

        let mut guard = pipeline.renderer.lock();
        let renderer: &Renderer = match &mut *guard {
            Some(r) => r,
            slot @ None => slot.insert(Renderer::build(config)?),
        };

        let mut written = 0;
        for page in walk_files_with_ext(&config.pages.source, "html") {
            let rel = page.strip_prefix(&config.pages.source).unwrap_or(&page);
            let html = renderer.render_page(&page)?;

            let dest = config.dist.join(rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| StepError::io(parent, e))?;
            }
            fs::write(&dest, html).map_err(|e| StepError::io(&dest, e))?;
            written += 1;
        }

        Ok(StepReport::new(written))
    }
}

impl StepRunner for ResetPagesStep {
    fn id(&self) -> StepId {
        StepId::ResetPages
    }

    /// Drop the cached parse state so the next render reparses layouts,
    /// partials, and data. Always succeeds; used by watch rules, never in
    /// the build graph.
    fn run(&self, pipeline: &Pipeline) -> Result<StepReport, StepError> {
        *pipeline.renderer.lock() = None;
        Ok(StepReport::default())
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Cached template state: the engine environment holding layouts and
/// partials, plus the shared data context.
pub(crate) struct Renderer {
    env: minijinja::Environment<'static>,
    data: BTreeMap<String, Value>,
}

impl Renderer {
    /// Parse layouts, partials, and data files once.
    pub(crate) fn build(config: &Config) -> Result<Self, StepError> {
        let mut env = minijinja::Environment::new();

        for layout in walk_files_with_ext(&config.pages.layouts, "html") {
            let name = format!("layouts/{}", stem_of(&layout));
            add_template(&mut env, name, &layout)?;
        }

        for partial in walk_files_with_ext(&config.pages.partials, "html") {
            add_template(&mut env, stem_of(&partial).to_string(), &partial)?;
        }

        let mut data = BTreeMap::new();
        for file in walk_files(&config.pages.data) {
            if let Some((key, value)) = load_data_file(&file)? {
                data.insert(key, value);
            }
        }

        Ok(Self { env, data })
    }

    /// Two-phase render of one page file.
    fn render_page(&self, page: &Path) -> Result<String, StepError> {
        let raw = fs::read_to_string(page).map_err(|e| StepError::io(page, e))?;
        let entity = MATTER.parse(&raw).map_err(|e| StepError::Template {
            path: page.to_path_buf(),
            message: format!("malformed frontmatter: {e}"),
        })?;
        let front: serde_json::Value = entity
            .data
            .unwrap_or_else(Pod::new_hash)
            .deserialize()
            .map_err(|e| StepError::Template {
                path: page.to_path_buf(),
                message: format!("malformed frontmatter: {e}"),
            })?;

        // Shared data first, then page frontmatter on top
        let mut ctx: BTreeMap<String, Value> = self.data.clone();
        if let Some(map) = front.as_object() {
            for (key, value) in map {
                ctx.insert(key.clone(), Value::from_serialize(value));
            }
        }

        // Phase one: the page body
        let body = self
            .env
            .render_str(&entity.content, &ctx)
            .map_err(|e| StepError::Template {
                path: page.to_path_buf(),
                message: e.to_string(),
            })?;

        // Phase two: the layout, with the body in context
        let layout_name = front
            .get("layout")
            .and_then(|v| v.as_str())
            .unwrap_or("default");
        let layout = self
            .env
            .get_template(&format!("layouts/{layout_name}"))
            .map_err(|_| StepError::Template {
                path: page.to_path_buf(),
                message: format!("layout `{layout_name}` not found"),
            })?;

        ctx.insert("body".to_string(), Value::from(body));
        layout.render(&ctx).map_err(|e| StepError::Template {
            path: page.to_path_buf(),
            message: e.to_string(),
        })
    }
}

fn add_template(
    env: &mut minijinja::Environment<'static>,
    name: String,
    path: &Path,
) -> Result<(), StepError> {
    let source = fs::read_to_string(path).map_err(|e| StepError::io(path, e))?;
    env.add_template_owned(name, source)
        .map_err(|e| StepError::Template {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn stem_of(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("")
}

/// Parse a data file by extension into a context value keyed by file stem.
/// Unknown extensions are skipped.
fn load_data_file(path: &Path) -> Result<Option<(String, Value)>, StepError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let Some(ext) = ext else { return Ok(None) };

    let content = fs::read_to_string(path).map_err(|e| StepError::io(path, e))?;
    let template_err = |message: String| StepError::Template {
        path: path.to_path_buf(),
        message,
    };

    let value = match ext.as_str() {
        "json" => {
            let parsed: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| template_err(e.to_string()))?;
            Value::from_serialize(&parsed)
        }
        "yml" | "yaml" => {
            let parsed: serde_yaml_ng::Value =
                serde_yaml_ng::from_str(&content).map_err(|e| template_err(e.to_string()))?;
            Value::from_serialize(&parsed)
        }
        "toml" => {
            let parsed: toml::Value =
                toml::from_str(&content).map_err(|e| template_err(e.to_string()))?;
            Value::from_serialize(&parsed)
        }
        _ => return Ok(None),
    };

    Ok(Some((stem_of(path).to_string(), value)))
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::core::Mode;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Pipeline) {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        for dir in [
            &config.pages.source,
            &config.pages.layouts,
            &config.pages.partials,
            &config.pages.data,
        ] {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(
            config.pages.layouts.join("default.html"),
            "<html><body>v1 {{ body }}</body></html>",
        )
        .unwrap();
        fs::create_dir_all(&config.dist).unwrap();
        (temp, Pipeline::new(config, Mode::Development))
    }

    fn write_page(pipeline: &Pipeline, name: &str, content: &str) {
        fs::write(pipeline.config.pages.source.join(name), content).unwrap();
    }

    fn read_output(pipeline: &Pipeline, name: &str) -> String {
        fs::read_to_string(pipeline.config.dist.join(name)).unwrap()
    }

    #[test]
    fn test_render_mirrors_pages_tree() {
        let (_temp, pipeline) = fixture();
        write_page(&pipeline, "index.html", "<h1>Home</h1>");
        fs::create_dir_all(pipeline.config.pages.source.join("about")).unwrap();
        fs::write(
            pipeline.config.pages.source.join("about/index.html"),
            "<h1>About</h1>",
        )
        .unwrap();

        let report = PagesStep.run(&pipeline).unwrap();
        assert_eq!(report.written, 2);
        assert!(read_output(&pipeline, "index.html").contains("<h1>Home</h1>"));
        assert!(read_output(&pipeline, "about/index.html").contains("<h1>About</h1>"));
    }

    #[test]
    fn test_layout_wraps_body() {
        let (_temp, pipeline) = fixture();
        write_page(&pipeline, "index.html", "inner");

        PagesStep.run(&pipeline).unwrap();
        assert_eq!(
            read_output(&pipeline, "index.html"),
            "<html><body>v1 inner</body></html>"
        );
    }

    #[test]
    fn test_frontmatter_selects_layout_and_vars() {
        let (_temp, pipeline) = fixture();
        fs::write(
            pipeline.config.pages.layouts.join("post.html"),
            "<article>{{ body }}</article>",
        )
        .unwrap();
        write_page(
            &pipeline,
            "hello.html",
            "---\nlayout: post\ntitle: Hello\n---\n<h2>{{ title }}</h2>",
        );

        PagesStep.run(&pipeline).unwrap();
        assert_eq!(
            read_output(&pipeline, "hello.html"),
            "<article><h2>Hello</h2></article>"
        );
    }

    #[test]
    fn test_partial_include() {
        let (_temp, pipeline) = fixture();
        fs::write(
            pipeline.config.pages.partials.join("nav.html"),
            "<nav>menu</nav>",
        )
        .unwrap();
        write_page(&pipeline, "index.html", "{% include \"nav\" %}");

        PagesStep.run(&pipeline).unwrap();
        assert!(read_output(&pipeline, "index.html").contains("<nav>menu</nav>"));
    }

    #[test]
    fn test_data_files_in_context() {
        let (_temp, pipeline) = fixture();
        fs::write(
            pipeline.config.pages.data.join("site.yml"),
            "name: Sitewright\n",
        )
        .unwrap();
        fs::write(pipeline.config.pages.data.join("links.json"), "[\"a\"]").unwrap();
        write_page(&pipeline, "index.html", "{{ site.name }}/{{ links[0] }}");

        PagesStep.run(&pipeline).unwrap();
        assert!(read_output(&pipeline, "index.html").contains("Sitewright/a"));
    }

    #[test]
    fn test_layout_change_needs_reset_then_rerenders_all_pages() {
        let (_temp, pipeline) = fixture();
        write_page(&pipeline, "one.html", "one");
        write_page(&pipeline, "two.html", "two");
        PagesStep.run(&pipeline).unwrap();
        assert!(read_output(&pipeline, "one.html").contains("v1"));

        // Edit the shared layout
        fs::write(
            pipeline.config.pages.layouts.join("default.html"),
            "<html><body>v2 {{ body }}</body></html>",
        )
        .unwrap();

        // Without reset, the cached parse state still serves v1
        PagesStep.run(&pipeline).unwrap();
        assert!(read_output(&pipeline, "one.html").contains("v1"));

        // Reset then re-render: ALL pages pick up the new layout
        ResetPagesStep.run(&pipeline).unwrap();
        PagesStep.run(&pipeline).unwrap();
        assert!(read_output(&pipeline, "one.html").contains("v2"));
        assert!(read_output(&pipeline, "two.html").contains("v2"));
    }

    #[test]
    fn test_rerender_is_byte_identical() {
        let (_temp, pipeline) = fixture();
        fs::write(
            pipeline.config.pages.data.join("site.yml"),
            "name: Sitewright\n",
        )
        .unwrap();
        write_page(&pipeline, "index.html", "{{ site.name }}");

        PagesStep.run(&pipeline).unwrap();
        let first = read_output(&pipeline, "index.html");
        PagesStep.run(&pipeline).unwrap();
        assert_eq!(read_output(&pipeline, "index.html"), first);
    }

    #[test]
    fn test_missing_layout_is_template_error() {
        let (_temp, pipeline) = fixture();
        write_page(&pipeline, "index.html", "---\nlayout: nope\n---\nbody");

        let result = PagesStep.run(&pipeline);
        assert!(matches!(result, Err(StepError::Template { .. })));
    }

    #[test]
    fn test_invalid_template_syntax_is_error() {
        let (_temp, pipeline) = fixture();
        write_page(&pipeline, "index.html", "{% if %}");

        let result = PagesStep.run(&pipeline);
        assert!(matches!(result, Err(StepError::Template { .. })));
    }
}
