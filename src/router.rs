use std::sync::Arc;

use crate::config::{ResolvedRoute, RouteConfig, ServerConfig};

#[derive(Debug)]
pub enum RoutingError {
    NotFound,
    MethodNotAllowed,
}

/// Picks the virtual host among `configs` bound to `port`. The first config
/// encountered for that port is remembered as the fallback (used when the
/// request carries no Host header, or no server_name matches it); later
/// configs are preferred only on an exact server_name match.
pub fn select_config(configs: &[Arc<ServerConfig>], port: u16, host: Option<&str>) -> Arc<ServerConfig> {
    let mut fallback: Option<&Arc<ServerConfig>> = None;
    let host = host.map(|h| h.split(':').next().unwrap_or(h));

    for config in configs.iter().filter(|c| c.listen == port) {
        if fallback.is_none() {
            fallback = Some(config);
        }
        if let Some(host) = host {
            if config.server_name == host {
                return Arc::clone(config);
            }
        }
    }

    match fallback {
        Some(config) => Arc::clone(config),
        None => Arc::new(ServerConfig::default()),
    }
}

/// Picks the longest-prefix route on `server` matching `request_path`,
/// later routes winning ties, and merges unset fields from `server`.
pub fn resolve_route(server: &ServerConfig, request_path: &str) -> ResolvedRoute {
    let mut best: Option<&RouteConfig> = None;

    for route in &server.routes {
        if !request_path.starts_with(route.path.as_str()) {
            continue;
        }
        match best {
            Some(current) if route.path.len() < current.path.len() => {}
            _ => best = Some(route),
        }
    }

    match best {
        Some(route) => merge_route(server, route),
        None => ResolvedRoute {
            path: "/".to_string(),
            root: server.root.clone(),
            index: server.index.clone(),
            autoindex: server.autoindex,
            upload_dir: server.upload_dir.clone(),
            methods: server.methods.clone(),
            cgi_ext: server.cgi_ext.clone(),
            max_body_size: server.max_body_size,
            redirect: None,
        },
    }
}

fn merge_route(server: &ServerConfig, route: &RouteConfig) -> ResolvedRoute {
    ResolvedRoute {
        path: route.path.clone(),
        root: route.root.clone().unwrap_or_else(|| server.root.clone()),
        index: route.index.clone().unwrap_or_else(|| server.index.clone()),
        autoindex: route.autoindex.unwrap_or(server.autoindex),
        upload_dir: route.upload_dir.clone().unwrap_or_else(|| server.upload_dir.clone()),
        methods: route.methods.clone().unwrap_or_else(|| server.methods.clone()),
        cgi_ext: route.cgi_ext.clone().unwrap_or_else(|| server.cgi_ext.clone()),
        max_body_size: route.max_body_size.unwrap_or(server.max_body_size),
        redirect: route.redirect.clone(),
    }
}

/// A request targets CGI when its path's final extension appears in the
/// resolved route's CGI extension list.
pub fn is_cgi_request(route: &ResolvedRoute, request_path: &str) -> bool {
    let path_only = request_path.split('?').next().unwrap_or(request_path);
    match path_only.rfind('.') {
        Some(pos) => route.cgi_ext.iter().any(|ext| ext == &path_only[pos..]),
        None => false,
    }
}
