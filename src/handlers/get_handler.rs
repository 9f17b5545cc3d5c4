use std::fs::File;
use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ResolvedRoute, ServerConfig};
use crate::http::response::{generate_autoindex, get_mime_type, handle_error};
use crate::http::{HttpRequest, HttpResponse};

/// Maps the request path onto the filesystem under the resolved route's
/// root and serves it whole -- no range requests, no streaming.
pub fn handle_get(request: &HttpRequest, route: &ResolvedRoute, s_cfg: &Arc<ServerConfig>) -> HttpResponse {
    let mut response = HttpResponse::new(200, "OK");
    let relative = request.path().strip_prefix(&route.path).unwrap_or(request.path());

    let mut path = PathBuf::from(&route.root);
    path.push(relative.trim_start_matches('/'));

    if path.is_dir() {
        let index_path = path.join(&route.index);
        match File::open(&index_path) {
            Ok(file) => {
                serve_open_file(&mut response, file, &index_path);
            }
            Err(_) if route.autoindex => {
                generate_autoindex(&mut response, &path, request.path());
            }
            Err(_) => {
                handle_error(&mut response, 403, Some(s_cfg));
            }
        }
        return response;
    }

    match File::open(&path) {
        Ok(file) => serve_open_file(&mut response, file, &path),
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::NotFound => 404,
                ErrorKind::PermissionDenied => 403,
                _ => 500,
            };
            handle_error(&mut response, code, Some(s_cfg));
        }
    }
    response
}

fn serve_open_file(response: &mut HttpResponse, mut file: File, path: &std::path::Path) {
    use std::io::Read;
    let mut body = match file.metadata() {
        Ok(meta) => Vec::with_capacity(meta.size() as usize),
        Err(_) => Vec::new(),
    };
    if file.read_to_end(&mut body).is_err() {
        response.set_status_code(500);
        response.set_body(b"500 Internal Server Error".to_vec(), "text/plain");
        return;
    }
    let mime = get_mime_type(path.extension().and_then(|s| s.to_str()));
    response.set_status_code(200);
    response.set_body(body, mime);
}
