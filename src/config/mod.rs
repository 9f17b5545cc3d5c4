pub mod display;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod validate;

pub use display::display_config;
pub use parser::{ConfigError, parse_config};
pub use types::{ResolvedRoute, RouteConfig, ServerConfig};
pub use validate::validate_configs;

/// Reads and parses a configuration file, dropping conflicting server
/// blocks (see `validate::validate_configs`).
pub fn load_config(path: &str) -> crate::error::Result<Vec<ServerConfig>> {
    let content = std::fs::read_to_string(path)?;
    let servers = parse_config(&content)?;
    Ok(validate_configs(servers))
}
