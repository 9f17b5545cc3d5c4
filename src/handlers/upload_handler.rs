use std::os::unix::io::RawFd;

use crate::config::ResolvedRoute;
use crate::http::{HttpRequest, HttpResponse};
use crate::upload;

/// Thin entry point over `upload::handle_upload`, kept as its own handler
/// module to mirror the per-method layout of `get_handler`/`delete_handler`.
pub fn handle_upload(request: &HttpRequest, route: &ResolvedRoute, fd: RawFd) -> HttpResponse {
    upload::handle_upload(request, route, fd)
}
