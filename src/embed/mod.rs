//! Embedded static resources.
//!
//! The dev server serves the live-reload client from memory rather than
//! writing it into dist, so production output never carries dev tooling.

use std::marker::PhantomData;

/// Trait for template variable sets.
pub trait TemplateVars {
    fn apply(&self, content: &str) -> String;
}

/// Template with typed variable injection.
#[derive(Debug, Clone, Copy)]
pub struct Template<V> {
    content: &'static str,
    _marker: PhantomData<V>,
}

impl<V> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _marker: PhantomData,
        }
    }
}

impl<V: TemplateVars> Template<V> {
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}

/// Variables for hotreload.js.
pub struct HotreloadVars {
    pub ws_port: u16,
}

impl TemplateVars for HotreloadVars {
    fn apply(&self, content: &str) -> String {
        content.replace("__SW_WS_PORT__", &self.ws_port.to_string())
    }
}

/// Live-reload client with WebSocket port injection.
pub const HOTRELOAD_JS: Template<HotreloadVars> = Template::new(include_str!("hotreload.js"));

/// URL the dev server serves the client from.
pub const HOTRELOAD_JS_PATH: &str = "/__sitewright/hotreload.js";

/// Script tag injected before `</body>` in served HTML.
pub fn script_tag() -> String {
    format!(r#"<script src="{HOTRELOAD_JS_PATH}"></script>"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_port() {
        let js = HOTRELOAD_JS.render(&HotreloadVars { ws_port: 35729 });
        assert!(js.contains("var port = 35729;"));
        assert!(!js.contains("__SW_WS_PORT__"));
    }

    #[test]
    fn test_script_tag_points_at_served_path() {
        assert_eq!(
            script_tag(),
            "<script src=\"/__sitewright/hotreload.js\"></script>"
        );
    }
}
