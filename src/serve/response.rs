//! HTTP response handlers.

use std::fs;
use std::path::Path;

use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::config::Config;
use crate::embed;
use crate::utils::mime;
use crate::utils::mime::types::{HTML, JAVASCRIPT, PLAIN};

/// Respond with a static file, injecting the live-reload script into HTML.
pub fn respond_file(request: Request, path: &Path) -> anyhow::Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path)?;
    let body = maybe_inject_reload(body, content_type);
    send_body(request, 200, content_type, body)
}

/// Respond with 404 page (custom or default).
pub fn respond_not_found(request: Request, config: &Config) -> anyhow::Result<()> {
    let custom_404 = config.dist.join("404.html");
    let has_custom = custom_404.is_file();

    if is_head_request(&request) {
        let mime = if has_custom { HTML } else { PLAIN };
        return send_head(request, 404, mime);
    }

    if has_custom
        && let Ok(body) = fs::read(&custom_404)
    {
        let body = maybe_inject_reload(body, HTML);
        return send_body(request, 404, HTML, body);
    }

    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> anyhow::Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

/// Respond with the live-reload client from memory.
pub fn respond_hotreload_js(request: Request, ws_port: u16) -> anyhow::Result<()> {
    let body = embed::HOTRELOAD_JS.render(&embed::HotreloadVars { ws_port });
    send_body(request, 200, JAVASCRIPT, body.into_bytes())
}

/// Inject the reload script tag before `</body>` in HTML bodies.
fn maybe_inject_reload(body: Vec<u8>, content_type: &str) -> Vec<u8> {
    if !content_type.starts_with("text/html") {
        return body;
    }

    let script = embed::script_tag();
    let script_bytes = script.as_bytes();

    const PATTERN: &[u8] = b"</body>";

    // Reverse search so the last </body> wins in documents embedding HTML
    if let Some(pos) = body
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        let mut result = Vec::with_capacity(body.len() + script_bytes.len());
        result.extend_from_slice(&body[..pos]);
        result.extend_from_slice(script_bytes);
        result.extend_from_slice(&body[pos..]);
        return result;
    }

    // No </body> found, append to end (browsers handle this gracefully)
    let mut result = Vec::with_capacity(body.len() + script_bytes.len());
    result.extend_from_slice(&body);
    result.extend_from_slice(script_bytes);
    result
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> anyhow::Result<()> {
    let response =
        Response::empty(StatusCode(status)).with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> anyhow::Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    // Both arguments are static ASCII literals
    Header::from_bytes(key, value).unwrap_or_else(|_| unreachable!())
}
