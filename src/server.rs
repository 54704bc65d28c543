//! Static file server with an API pass-through: anything under `/api/` is
//! forwarded to the bank with the bearer token injected server-side, so a
//! local frontend never has to hold the credential; everything else is
//! served from the root directory.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tiny_http::{Header, Method, Response, Server};
use url::Url;

use crate::{ApiConfig, join_url};

// Upstream bodies and proxied request bodies are capped; the bank's
// payloads are small JSON documents.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub(crate) fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "csv" => "text/csv",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ico" => "image/x-icon",
        "txt" | "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Decode and normalize a request path into a relative filesystem path.
/// Rejects anything containing a `..` component.
pub(crate) fn sanitize_request_path(url_path: &str) -> Option<PathBuf> {
    let without_query = url_path.split('?').next().unwrap_or(url_path);
    let decoded = urlencoding::decode(without_query).ok()?;
    let mut out = PathBuf::new();
    for part in decoded.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            part => out.push(part),
        }
    }
    Some(out)
}

fn plain_response(status: u16, text: &str) -> Response<Cursor<Vec<u8>>> {
    Response::from_data(text.as_bytes().to_vec()).with_status_code(status)
}

fn with_content_type(
    response: Response<Cursor<Vec<u8>>>,
    content_type: &str,
) -> Response<Cursor<Vec<u8>>> {
    match Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(_) => response,
    }
}

fn serve_static(root: &Path, url_path: &str) -> Response<Cursor<Vec<u8>>> {
    let Some(relative) = sanitize_request_path(url_path) else {
        return plain_response(400, "bad path");
    };
    let mut path = root.join(relative);
    if path.is_dir() {
        path = path.join("index.html");
    }
    match fs::read(&path) {
        Ok(bytes) => {
            let content_type = content_type_for(&path);
            with_content_type(Response::from_data(bytes), content_type)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => plain_response(404, "not found"),
        Err(err) => plain_response(500, &format!("read error: {err}")),
    }
}

fn proxy_method(method: &Method) -> Option<&'static str> {
    match method {
        Method::Get => Some("GET"),
        Method::Post => Some("POST"),
        Method::Patch => Some("PATCH"),
        Method::Put => Some("PUT"),
        Method::Delete => Some("DELETE"),
        _ => None,
    }
}

fn proxy_request(
    agent: &ureq::Agent,
    config: &ApiConfig,
    request: &mut tiny_http::Request,
    raw_url: &str,
) -> Response<Cursor<Vec<u8>>> {
    let Some(method) = proxy_method(request.method()) else {
        return plain_response(405, "method not allowed");
    };

    let rest = raw_url.trim_start_matches("/api").trim_start_matches('/');
    let upstream = join_url(&config.base_url, rest);
    if Url::parse(&upstream).is_err() {
        return plain_response(400, "bad upstream path");
    }

    let mut body = Vec::new();
    if request
        .as_reader()
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut body)
        .is_err()
    {
        return plain_response(400, "unreadable body");
    }
    if body.len() > MAX_BODY_BYTES {
        return plain_response(413, "body too large");
    }

    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("content-type"))
        .map(|h| h.value.to_string())
        .unwrap_or_else(|| "application/json".to_string());

    let upstream_request = agent
        .request(method, &upstream)
        .set("authorization", &format!("Bearer {}", config.token))
        .set("content-type", &content_type);

    let result = if body.is_empty() && method == "GET" {
        upstream_request.call()
    } else {
        upstream_request.send_bytes(&body)
    };

    match result {
        Ok(resp) => relay(resp),
        // Relay upstream errors as-is: the frontend wants the real status
        Err(ureq::Error::Status(_, resp)) => relay(resp),
        Err(ureq::Error::Transport(err)) => plain_response(502, &format!("upstream: {err}")),
    }
}

fn relay(resp: ureq::Response) -> Response<Cursor<Vec<u8>>> {
    let status = resp.status();
    let content_type = resp
        .header("content-type")
        .unwrap_or("application/json")
        .to_string();
    let mut bytes = Vec::new();
    if resp
        .into_reader()
        .take(MAX_BODY_BYTES as u64)
        .read_to_end(&mut bytes)
        .is_err()
    {
        return plain_response(502, "upstream body unreadable");
    }
    with_content_type(Response::from_data(bytes).with_status_code(status), &content_type)
}

pub(crate) fn run_server(
    config: &ApiConfig,
    root: &Path,
    bind: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{bind}:{port}");
    let server = Server::http(&addr)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("server: {e}")))?;
    eprintln!(
        "[serve] listening on http://{addr}, root {}, proxying /api/ to {}",
        root.display(),
        config.base_url
    );

    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(config.timeout_secs))
        .timeout_read(Duration::from_secs(config.timeout_secs))
        .timeout_write(Duration::from_secs(config.timeout_secs))
        .build();

    for mut request in server.incoming_requests() {
        let raw_url = request.url().to_string();
        if raw_url == "/api" || raw_url.starts_with("/api/") || raw_url.starts_with("/api?") {
            let response = proxy_request(&agent, config, &mut request, &raw_url);
            let _ = request.respond(response);
            continue;
        }
        if *request.method() != Method::Get {
            let _ = request.respond(plain_response(405, "method not allowed"));
            continue;
        }
        let response = serve_static(root, &raw_url);
        let _ = request.respond(response);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_table() {
        assert_eq!(content_type_for(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("app.JS")), "application/javascript");
        assert_eq!(content_type_for(Path::new("data.csv")), "text/csv");
        assert_eq!(content_type_for(Path::new("blob.bin")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("no_extension")), "application/octet-stream");
    }

    #[test]
    fn test_sanitize_request_path() {
        assert_eq!(
            sanitize_request_path("/css/site.css"),
            Some(PathBuf::from("css/site.css"))
        );
        assert_eq!(sanitize_request_path("/"), Some(PathBuf::new()));
        assert_eq!(
            sanitize_request_path("/a//b/./c"),
            Some(PathBuf::from("a/b/c"))
        );
        // Query strings are not part of the filesystem path
        assert_eq!(
            sanitize_request_path("/page.html?x=1"),
            Some(PathBuf::from("page.html"))
        );
        // Percent-encoding is decoded before the traversal check
        assert_eq!(
            sanitize_request_path("/my%20file.csv"),
            Some(PathBuf::from("my file.csv"))
        );
        assert_eq!(sanitize_request_path("/../etc/passwd"), None);
        assert_eq!(sanitize_request_path("/a/%2e%2e/b"), None);
    }
}
