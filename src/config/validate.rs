use std::collections::{HashMap, HashSet};

use crate::config::types::ServerConfig;

/// Drops server blocks that conflict on `(listen, server_name)` or that
/// reference nonexistent files/directories, printing a diagnostic for each.
pub fn validate_configs(configs: Vec<ServerConfig>) -> Vec<ServerConfig> {
    let mut dropped = HashSet::new();

    let mut usage: HashMap<(u16, String), Vec<usize>> = HashMap::new();
    for (idx, config) in configs.iter().enumerate() {
        let key = (config.listen, config.server_name.clone());
        usage.entry(key).or_default().push(idx);
    }

    for ((port, name), indices) in usage {
        if indices.len() > 1 {
            println!(
                "❌ \x1b[1;31mConflict Detected:\x1b[0m Multiple servers defined for port {} with name '{}'. Dropping conflicting configurations.",
                port, name
            );
            dropped.extend(indices);
        }
    }

    for (idx, config) in configs.iter().enumerate() {
        let mut valid = true;

        for (code, path) in &config.error_pages {
            if *code < 100 || *code > 599 {
                println!(
                    "❌ \x1b[1;31mInvalid Status Code:\x1b[0m Server '{}' has invalid error page code {}.",
                    config.server_name, code
                );
                valid = false;
            }
            if std::fs::File::open(path).is_err() {
                println!(
                    "❌ \x1b[1;31mFile Error:\x1b[0m Server '{}' refers to missing error page '{}' for code {}.",
                    config.server_name, path, code
                );
                valid = false;
            }
        }

        if std::fs::read_dir(&config.root).is_err() {
            println!(
                "❌ \x1b[1;31mDirectory Error:\x1b[0m Server '{}' refers to invalid root directory '{}'.",
                config.server_name, config.root
            );
            valid = false;
        }

        for route in &config.routes {
            if let Some(root) = &route.root {
                if std::fs::read_dir(root).is_err() {
                    println!(
                        "❌ \x1b[1;31mDirectory Error:\x1b[0m Server '{}' route '{}' refers to invalid root directory '{}'.",
                        config.server_name, route.path, root
                    );
                    valid = false;
                }
            }
        }

        if !valid {
            dropped.insert(idx);
        }
    }

    if !dropped.is_empty() {
        println!(
            "⚠️ \x1b[33mResult:\x1b[0m {} configuration(s) were dropped due to conflicts.",
            dropped.len()
        );
    }

    configs
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !dropped.contains(idx))
        .map(|(_, c)| c)
        .collect()
}
