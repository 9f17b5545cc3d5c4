pub mod delete_handler;
pub mod get_handler;
pub mod upload_handler;

use std::os::unix::io::RawFd;
use std::sync::Arc;

use crate::config::{ResolvedRoute, ServerConfig};
use crate::http::response::status_text;
use crate::http::{HttpRequest, HttpResponse};
use crate::router;

/// What `process_request` decided to do with a fully-parsed request. CGI
/// dispatch is reported rather than performed here because launching the
/// child and registering its pipe needs the event loop's `Poll`.
pub enum Outcome {
    Response(HttpResponse),
    Cgi,
}

/// The request-processing boundary described as an external collaborator:
/// given a completed request and its resolved route, produce a response
/// (or defer to CGI). Runs once a connection enters PROCESSING.
///
/// CGI and POST take precedence over a configured redirect; a redirect
/// only fires on the GET/DELETE static path (see `dispatch_static`).
pub fn process_request(
    request: &HttpRequest,
    route: &ResolvedRoute,
    s_cfg: &Arc<ServerConfig>,
    fd: RawFd,
) -> Outcome {
    if !route.methods.iter().any(|m| m == &request.method) {
        let mut res = HttpResponse::new(405, status_text(405));
        res.set_body(b"405 Method Not Allowed".to_vec(), "text/plain");
        return Outcome::Response(res);
    }

    if router::is_cgi_request(route, request.path()) {
        return Outcome::Cgi;
    }

    Outcome::Response(dispatch_static(request, route, s_cfg, fd))
}

/// Serves a request through the non-CGI pipeline: a POST upload, or the
/// GET/DELETE static path where a configured redirect takes effect. Also
/// used as the fallback when a CGI launch itself fails -- the request is
/// served through this same branch rather than the connection getting an
/// internal-error response.
pub fn dispatch_static(
    request: &HttpRequest,
    route: &ResolvedRoute,
    s_cfg: &Arc<ServerConfig>,
    fd: RawFd,
) -> HttpResponse {
    if request.method == "POST" {
        return upload_handler::handle_upload(request, route, fd);
    }

    if let Some((code, target)) = &route.redirect {
        return HttpResponse::redirect(*code, target);
    }

    if request.method == "DELETE" {
        delete_handler::handle_delete(request, route, s_cfg)
    } else {
        get_handler::handle_get(request, route, s_cfg)
    }
}
