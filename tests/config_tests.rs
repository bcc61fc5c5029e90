use harborctl::config::generate::generate_starter_config;
use harborctl::config::load_engine_config;
use std::sync::Mutex;
use tempfile::TempDir;

// CONTAINER_DIR/TZ are process-global; serialize tests that touch them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn generated_config_loads_back_with_container_dir_set() {
    let _guard = ENV_LOCK.lock().unwrap();

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    std::fs::write(&config_path, generate_starter_config()).unwrap();

    std::env::set_var("CONTAINER_DIR", "/srv/services-override");
    std::env::remove_var("TZ");
    let config = load_engine_config(Some(&config_path)).unwrap();
    std::env::remove_var("CONTAINER_DIR");

    // CONTAINER_DIR always overrides whatever the starter config's root says.
    assert_eq!(
        config.root,
        std::path::PathBuf::from("/srv/services-override")
    );
    assert_eq!(config.timezone, chrono_tz::UTC);
    assert_eq!(config.soft_cap_bytes, 16 * 1024 * 1024);
    assert_eq!(config.listen, "127.0.0.1:8080");
    assert!(!config.strict_monotonicity);
}

#[test]
fn missing_config_file_falls_back_to_defaults_plus_env() {
    let _guard = ENV_LOCK.lock().unwrap();

    std::env::set_var("CONTAINER_DIR", "/srv/only-env");
    std::env::set_var("TZ", "America/New_York");
    let config = load_engine_config(None).unwrap();
    std::env::remove_var("CONTAINER_DIR");
    std::env::remove_var("TZ");

    assert_eq!(config.root, std::path::PathBuf::from("/srv/only-env"));
    assert_eq!(config.timezone, chrono_tz::America::New_York);
}
