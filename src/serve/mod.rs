//! Development HTTP server with live reload.
//!
//! Serves the dist tree, injecting the live-reload script tag into every
//! HTML response and serving the client script itself from memory. The
//! bind is strict: a port already in use is an error, never a silent
//! fallback, since the printed URL and the reload client both assume the
//! configured ports.

mod reload;
mod response;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tiny_http::{Request, Server};

pub use reload::{DEFAULT_WS_PORT, ReloadHandle, start as start_reload_hub};

use crate::config::Config;
use crate::embed::HOTRELOAD_JS_PATH;
use crate::{core, log};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },
}

pub struct DevServer {
    server: Arc<Server>,
    config: Arc<Config>,
    ws_port: u16,
}

impl DevServer {
    /// Bind the HTTP server without starting the request loop.
    pub fn bind(config: Arc<Config>, ws_port: u16) -> Result<Self, ServerError> {
        let addr = SocketAddr::new(config.serve.interface, config.serve.port);
        let server = Server::http(addr).map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            message: e.to_string(),
        })?;
        let server = Arc::new(server);

        // Ctrl-C unblocks the accept loop through this registration
        core::register_server(Arc::clone(&server));

        log!("serve"; "http://{addr}");

        Ok(Self {
            server,
            config,
            ws_port,
        })
    }

    /// Run the request loop until shutdown (blocking).
    ///
    /// Requests are handled on a small pool so a slow disk read never
    /// blocks other clients.
    pub fn run(&self) {
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(4).build() {
            Ok(pool) => pool,
            Err(e) => {
                log!("serve"; "failed to create thread pool: {e}");
                return;
            }
        };

        for request in self.server.incoming_requests() {
            if core::is_shutdown() {
                let _ = response::respond_unavailable(request);
                break;
            }

            let config = Arc::clone(&self.config);
            let ws_port = self.ws_port;
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &config, ws_port) {
                    log!("serve"; "request error: {e}");
                }
            });
        }
    }
}

fn handle_request(request: Request, config: &Config, ws_port: u16) -> anyhow::Result<()> {
    if core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    if request.url() == HOTRELOAD_JS_PATH {
        return response::respond_hotreload_js(request, ws_port);
    }

    if let Some(path) = resolve_path(request.url(), &config.dist) {
        return response::respond_file(request, &path);
    }

    response::respond_not_found(request, config)
}

/// Resolve URL to filesystem path, handling index.html for directories.
fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject traversal early; canonicalization below catches the rest
    if clean.contains("..") {
        return None;
    }

    let local = serve_root.join(&clean);

    let canonical = local.canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Normalize URL: decode, strip query string, trim slashes.
fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;
    let decoded = percent_decode_str(url)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    let path = decoded.split('?').next().unwrap_or(&decoded);
    path.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("blog")).unwrap();
        fs::write(temp.path().join("index.html"), "<html/>").unwrap();
        fs::write(temp.path().join("blog/index.html"), "<html/>").unwrap();
        fs::write(temp.path().join("style.css"), "body{}").unwrap();
        temp
    }

    #[test]
    fn test_resolve_root_serves_index() {
        let temp = site();
        let path = resolve_path("/", temp.path()).unwrap();
        assert!(path.ends_with("index.html"));
    }

    #[test]
    fn test_resolve_directory_serves_its_index() {
        let temp = site();
        let path = resolve_path("/blog/", temp.path()).unwrap();
        assert!(path.ends_with("blog/index.html"));
    }

    #[test]
    fn test_resolve_strips_query_string() {
        let temp = site();
        let path = resolve_path("/style.css?v=3", temp.path()).unwrap();
        assert!(path.ends_with("style.css"));
    }

    #[test]
    fn test_resolve_decodes_percent_encoding() {
        let temp = site();
        fs::write(temp.path().join("a b.html"), "x").unwrap();
        let path = resolve_path("/a%20b.html", temp.path()).unwrap();
        assert!(path.ends_with("a b.html"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let temp = site();
        assert!(resolve_path("/../etc/passwd", temp.path()).is_none());
        assert!(resolve_path("/%2e%2e/etc/passwd", temp.path()).is_none());
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let temp = site();
        assert!(resolve_path("/nope.html", temp.path()).is_none());
    }
}
