use std::process::exit;

use proxy_log::errors;
use server_proxy::config::{display_config, load_config};
use server_proxy::error::Result;
use server_proxy::server::Server;
use server_proxy::shutdown;

fn run() -> Result<()> {
    let config_path = std::env::args().nth(1).ok_or("usage: server_proxy <config-file>")?;

    let configs = load_config(&config_path)?;
    display_config(&configs);

    shutdown::install();
    let mut server = Server::new(configs)?;
    server.run()
}

fn main() {
    if let Err(e) = run() {
        errors!("{}", e);
        exit(1);
    }
}
