//! Development HTTP server.
//!
//! A pure static file server over two roots: the assets root mounted at a
//! configurable URL prefix, everything else served from the build root. A
//! URL without a file extension is treated as a directory and `index.html`
//! is appended. Missing files answer 404 with a structured error log and
//! never crash the server.
//!
//! The server binds the configured port (0 = ephemeral) and reports the
//! bound port once listening. The watcher runs on its own thread; the two
//! share nothing but the session's graph and fragment caches.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, anyhow};
use std::{
    borrow::Cow,
    fs,
    io::Cursor,
    path::{Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

// ============================================================================
// Server Entry Point
// ============================================================================

/// Start the development server; blocks until Ctrl+C.
pub fn serve_site(config: &'static SiteConfig) -> Result<()> {
    let server = Server::http(("127.0.0.1", config.server.port))
        .map_err(|err| anyhow!("Failed to bind port {}: {err}", config.server.port))?;
    let server = Arc::new(server);

    let port = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.port())
        .unwrap_or(config.server.port);

    // Ctrl+C unblocks `incoming_requests` for a clean exit
    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://localhost:{port}");

    for request in server.incoming_requests() {
        if let Err(err) = handle_request(request, config) {
            log!("serve"; "request error: {err}");
        }
    }

    Ok(())
}

// ============================================================================
// Request Handling
// ============================================================================

/// Handle a single request: resolve the file and serve it, or 404.
fn handle_request(request: Request, config: &SiteConfig) -> Result<()> {
    if *request.method() != Method::Get {
        return serve_not_found(request);
    }

    let url = urlencoding::decode(request.url())
        .map(Cow::into_owned)
        .unwrap_or_default();
    let url_path = url.split('?').next().unwrap_or(&url);
    let local_path = resolve_request_path(config, url_path);

    match fs::read(&local_path) {
        Ok(content) => {
            let content_type = guess_content_type(&local_path);
            let response = Response::from_data(content)
                .with_header(Header::from_bytes("Content-Type", content_type).unwrap());
            request.respond(response)?;
            Ok(())
        }
        Err(err) => {
            log!("serve"; "{:?} {} - {}", err.kind(), url_path, err);
            serve_not_found(request)
        }
    }
}

/// Map a URL path onto the assets or build root.
///
/// Extension-less paths are treated as directories and get `index.html`
/// appended.
fn resolve_request_path(config: &SiteConfig, url_path: &str) -> PathBuf {
    let assets_prefix = config.server.assets.as_str();
    // The mount only matches whole path segments: `/assets-extra` is not
    // under an `/assets` mount.
    let mut path = match url_path.strip_prefix(assets_prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            config.assets.join(rest.trim_start_matches('/'))
        }
        _ => config.build.join(url_path.trim_matches('/')),
    };

    if path.extension().is_none() {
        path = path.join("index.html");
    }
    path
}

/// Serve the plain-text 404 response.
fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::new(
        StatusCode(404),
        vec![Header::from_bytes("Content-Type", "text/plain").unwrap()],
        Cursor::new("404\n"),
        Some(4),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json" | "map") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",

        // Default binary
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Tests
// ============================================================================
