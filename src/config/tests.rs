use super::load_config;
use super::settings::Settings;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.socket.namespace, "/chat");
    assert_eq!(settings.logging.level, "info");
    assert_eq!(settings.bind_addr(), "127.0.0.1:8080");
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    let cfg = load_config();

    env::set_current_dir(orig).expect("restore cwd");
    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.socket.namespace, "/chat");
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    // load_config reads config/default.toml relative to the working directory
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [socket]
        namespace = "/game"
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config();

    env::set_current_dir(orig).expect("restore cwd");
    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.socket.namespace, "/game");
    assert_eq!(cfg.logging.level, "info");
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    temp_env::with_vars(
        [
            ("STEEPLEJACK_SERVER_PORT", Some("7070")),
            ("STEEPLEJACK_LOGGING_LEVEL", Some("debug")),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.port, 7070);
            assert_eq!(cfg.server.host, "127.0.0.1");
            assert_eq!(cfg.logging.level, "debug");
        },
    );
}
