use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ResolvedRoute, ServerConfig};
use crate::http::response::handle_error;
use crate::http::{HttpRequest, HttpResponse};

/// Deletes a file under the route's root. Canonicalization plus a
/// `starts_with` check keeps `DELETE /x/../../etc/passwd` from escaping
/// the root, a restriction the bare spec boundary leaves to this collaborator.
pub fn handle_delete(request: &HttpRequest, route: &ResolvedRoute, s_cfg: &Arc<ServerConfig>) -> HttpResponse {
    let mut response = HttpResponse::new(204, "No Content");
    let root = PathBuf::from(&route.root);

    let relative = request.path().strip_prefix(&route.path).unwrap_or(request.path());
    let target = root.join(relative.trim_start_matches('/'));

    let absolute_root = match root.canonicalize() {
        Ok(path) => path,
        Err(_) => {
            handle_error(&mut response, 404, Some(s_cfg));
            return response;
        }
    };

    let absolute_target = match target.canonicalize() {
        Ok(path) => path,
        Err(e) => {
            let code = if e.kind() == ErrorKind::NotFound { 404 } else { 403 };
            handle_error(&mut response, code, Some(s_cfg));
            return response;
        }
    };

    if !absolute_target.starts_with(&absolute_root) || absolute_target.is_dir() {
        handle_error(&mut response, 403, Some(s_cfg));
        return response;
    }

    match std::fs::remove_file(&absolute_target) {
        Ok(()) => response,
        Err(e) => {
            let code = if e.kind() == ErrorKind::PermissionDenied { 403 } else { 500 };
            handle_error(&mut response, code, Some(s_cfg));
            response
        }
    }
}
