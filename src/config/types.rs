use std::collections::HashMap;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ROOT: &str = "./www";
pub const DEFAULT_INDEX: &str = "index.html";
pub const DEFAULT_MAX_BODY_SIZE: usize = 1_048_576; // 1 MiB
pub const DEFAULT_ROUTE_PATH: &str = "/";

pub fn default_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "DELETE".to_string()]
}

/// A `location` block. Every field is `Option` so the resolver (see
/// `router::resolve_route`) can tell "explicitly set on this route" from
/// "inherit from the server block" -- an unset field is `None`.
#[derive(Debug, Clone, Default)]
pub struct RouteConfig {
    pub path: String,
    pub root: Option<String>,
    pub index: Option<String>,
    pub autoindex: Option<bool>,
    pub upload_dir: Option<String>,
    pub methods: Option<Vec<String>>,
    pub cgi_ext: Option<Vec<String>>,
    pub max_body_size: Option<usize>,
    pub redirect: Option<(u16, String)>,
}

impl RouteConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: u16,
    pub server_name: String,
    pub root: String,
    pub index: String,
    pub autoindex: bool,
    pub upload_dir: String,
    pub methods: Vec<String>,
    pub cgi_ext: Vec<String>,
    pub max_body_size: usize,
    pub error_pages: HashMap<u16, String>,
    pub routes: Vec<RouteConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_PORT,
            server_name: String::new(),
            root: DEFAULT_ROOT.to_string(),
            index: DEFAULT_INDEX.to_string(),
            autoindex: true,
            upload_dir: String::new(),
            methods: default_methods(),
            cgi_ext: Vec::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            error_pages: HashMap::new(),
            routes: Vec::new(),
        }
    }
}

/// The fully-merged view of a route used to serve a single request: every
/// field inherited from the owning `ServerConfig` has already been folded
/// in by `router::resolve_route`.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub path: String,
    pub root: String,
    pub index: String,
    pub autoindex: bool,
    pub upload_dir: String,
    pub methods: Vec<String>,
    pub cgi_ext: Vec<String>,
    pub max_body_size: usize,
    pub redirect: Option<(u16, String)>,
}
