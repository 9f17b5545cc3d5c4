use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::ServerConfig;

#[derive(Debug)]
pub struct HttpResponse {
    pub version: String,
    pub status_code: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16, status_text: &str) -> Self {
        Self {
            version: "HTTP/1.1".to_string(),
            status_code,
            status_text: status_text.to_string(),
            headers: HashMap::from([
                ("content-length".to_string(), "0".to_string()),
                ("connection".to_string(), "close".to_string()),
            ]),
            body: Vec::new(),
        }
    }

    pub fn set_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.headers.insert(key.to_lowercase(), value.to_string());
        self
    }

    pub fn set_body(&mut self, body: Vec<u8>, content_type: &str) -> &mut Self {
        self.headers
            .insert("content-length".to_string(), body.len().to_string());
        self.headers
            .insert("content-type".to_string(), content_type.to_string());
        self.body = body;
        self
    }

    pub fn set_status_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.status_text = status_text(code).to_string();
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut res = self.to_bytes_headers_only();
        res.extend_from_slice(&self.body);
        res
    }

    pub fn to_bytes_headers_only(&self) -> Vec<u8> {
        let mut res = format!("{} {} {}\r\n", self.version, self.status_code, self.status_text).into_bytes();
        for (key, val) in &self.headers {
            res.extend_from_slice(format!("{}: {}\r\n", to_pascal_case(key), val).as_bytes());
        }
        res.extend_from_slice(b"\r\n");
        res
    }

    pub fn redirect(code: u16, target_url: &str) -> Self {
        let mut res = HttpResponse::new(code, status_text(code));
        res.set_header("Location", target_url)
            .set_header("Content-Length", "0")
            .set_header("Connection", "close");
        res
    }
}

fn to_pascal_case(s: &str) -> String {
    s.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// The canonical reason phrase for every status code this core can emit,
/// directly or via the error-page fallback template.
pub fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

pub fn get_mime_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

pub fn generate_autoindex(response: &mut HttpResponse, path: &Path, original_url: &str) {
    let mut html = format!("<html><body><h1>Index of {}</h1><ul>", original_url);
    if let Ok(entries) = path.read_dir() {
        for entry in entries.flatten() {
            if let Ok(name) = entry.file_name().into_string() {
                html.push_str(&format!(
                    "<li><a href=\"{}/{}\">{}</a></li>",
                    original_url.trim_end_matches('/'),
                    name,
                    name
                ));
            }
        }
    }
    html.push_str("</ul></body></html>");
    response.set_status_code(200);
    response.set_body(html.into_bytes(), "text/html");
}

/// Builds an error response, consulting the resolved server's error-page
/// map and falling back to an inline plain-text template.
pub fn handle_error(response: &mut HttpResponse, code: u16, s_cfg: Option<&Arc<ServerConfig>>) {
    if let Some(cfg) = s_cfg {
        if let Some(path_str) = cfg.error_pages.get(&code) {
            let root = Path::new(&cfg.root);
            let err_path = root.join(path_str.trim_start_matches('/'));
            if let Ok(content) = fs::read(err_path) {
                response.set_status_code(code).set_body(content, "text/html");
                return;
            }
        }
    }

    response.set_status_code(code);
    let body = format!("{} {}", code, status_text(code)).into_bytes();
    response.set_body(body, "text/plain");
}
