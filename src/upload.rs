use std::fs;
use std::os::unix::io::RawFd;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::ResolvedRoute;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;

/// Writes the whole request body verbatim to
/// `{upload_dir}/upload_{fd}_{unix_seconds}.bin`. No multipart parsing: the
/// body, chunked or not, has already been fully decoded by the request
/// state machine by the time a handler calls this.
pub fn handle_upload(request: &HttpRequest, route: &ResolvedRoute, fd: RawFd) -> HttpResponse {
    if route.upload_dir.is_empty() {
        let mut res = HttpResponse::new(403, "Forbidden");
        res.set_body(b"403 Forbidden".to_vec(), "text/plain");
        return res;
    }

    let unix_seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let filename = format!("upload_{}_{}.bin", fd, unix_seconds);
    let target: PathBuf = PathBuf::from(&route.upload_dir).join(&filename);

    match fs::write(&target, request.body()) {
        Ok(()) => HttpResponse::new(201, "Created"),
        Err(_) => {
            let mut res = HttpResponse::new(500, "Internal Server Error");
            res.set_body(b"500 Internal Server Error".to_vec(), "text/plain");
            res
        }
    }
}
