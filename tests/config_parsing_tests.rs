use std::fs;

use server_proxy::config::load_config;

fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_a_minimal_config_file() {
    let www = std::env::temp_dir().join("config_load_www");
    fs::create_dir_all(&www).unwrap();

    let path = write_temp(
        "config_load_minimal.conf",
        &format!(
            "server {{ listen 8090; server_name example.com; root {}; }}",
            www.to_str().unwrap()
        ),
    );

    let configs = load_config(path.to_str().unwrap()).unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].listen, 8090);
    assert_eq!(configs[0].server_name, "example.com");

    let _ = fs::remove_file(path);
    let _ = fs::remove_dir_all(www);
}

#[test]
fn duplicate_listen_and_name_pairs_are_dropped_by_validation() {
    let www = std::env::temp_dir().join("config_load_dup_www");
    fs::create_dir_all(&www).unwrap();
    let root = www.to_str().unwrap();

    let path = write_temp(
        "config_load_dup.conf",
        &format!(
            "server {{ listen 8091; server_name dup.com; root {root}; }}\n\
             server {{ listen 8091; server_name dup.com; root {root}; }}\n\
             server {{ listen 8092; server_name unique.com; root {root}; }}"
        ),
    );

    let configs = load_config(path.to_str().unwrap()).unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].server_name, "unique.com");

    let _ = fs::remove_file(path);
    let _ = fs::remove_dir_all(www);
}

#[test]
fn missing_config_file_is_an_error() {
    let result = load_config("/nonexistent/path/to/server.conf");
    assert!(result.is_err());
}

#[test]
fn location_blocks_inherit_unset_fields_from_the_server_block() {
    let www = std::env::temp_dir().join("config_load_locations_www");
    fs::create_dir_all(&www).unwrap();

    let path = write_temp(
        "config_load_locations.conf",
        &format!(
            "server {{\n\
                 listen 8093;\n\
                 root {};\n\
                 client_max_body_size 4096;\n\
                 location /api {{\n\
                     cgi_ext .py;\n\
                 }}\n\
             }}",
            www.to_str().unwrap()
        ),
    );

    let configs = load_config(path.to_str().unwrap()).unwrap();
    let server = &configs[0];
    assert_eq!(server.routes.len(), 1);
    assert_eq!(server.routes[0].path, "/api");
    assert_eq!(server.routes[0].cgi_ext.as_ref().unwrap(), &vec![".py".to_string()]);
    assert!(server.routes[0].root.is_none());
    assert_eq!(server.max_body_size, 4096);

    let _ = fs::remove_file(path);
    let _ = fs::remove_dir_all(www);
}
