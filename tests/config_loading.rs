use readmission_client::config::{Config, ConfigOverrides};
use readmission_client::risk::NumberFormat;
use std::io::Write;

const VARS: [&str; 7] = [
    "READMISSION_CONFIG",
    "RDM_ENV_FILE",
    "RDM_ENDPOINT",
    "RDM_BASE_URL",
    "RDM_TIMEOUT_MS",
    "RDM_NUMBER_FORMAT",
    "RDM_SCROLL_INTO_VIEW",
];

fn clear_env() {
    for var in VARS {
        unsafe {
            std::env::remove_var(var);
        }
    }
}

// Environment is process-global, so every scenario runs in one test.
#[test]
fn test_load_file_then_env_overrides() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readmission.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
[endpoint]
url = "marcapasso"
base_url = "http://127.0.0.1:9000/"

[display]
format = "locale"
"#
    )
    .unwrap();

    unsafe {
        std::env::set_var("READMISSION_CONFIG", &path);
        std::env::set_var("RDM_ENV_FILE", dir.path().join("missing.env"));
    }

    // File only
    let config = Config::load().unwrap();
    assert_eq!(
        config.endpoint.resolve().unwrap().as_str(),
        "http://127.0.0.1:9000/marcapasso"
    );
    assert_eq!(config.display.format, NumberFormat::Locale);

    // Env wins over file
    unsafe {
        std::env::set_var("RDM_ENDPOINT", "http://scoring.internal:8080/calcula");
        std::env::set_var("RDM_NUMBER_FORMAT", "raw");
        std::env::set_var("RDM_TIMEOUT_MS", "1500");
        std::env::set_var("RDM_SCROLL_INTO_VIEW", "true");
    }
    let config = Config::load().unwrap();
    assert_eq!(
        config.endpoint.resolve().unwrap().as_str(),
        "http://scoring.internal:8080/calcula"
    );
    assert_eq!(config.display.format, NumberFormat::Raw);
    assert_eq!(config.endpoint.timeout_ms, Some(1500));
    assert!(config.display.scroll_into_view);

    // Invalid values surface as errors rather than silent defaults
    unsafe {
        std::env::set_var("RDM_NUMBER_FORMAT", "percent");
    }
    assert!(Config::load().is_err());

    unsafe {
        std::env::set_var("RDM_NUMBER_FORMAT", "raw");
        std::env::set_var("RDM_ENDPOINT", "marcapasso");
        std::env::remove_var("READMISSION_CONFIG");
    }
    // No file means no base_url, so a relative endpoint cannot resolve.
    let empty = dir.path().join("empty");
    std::fs::create_dir(&empty).unwrap();
    std::env::set_current_dir(&empty).unwrap();
    assert!(Config::load().is_err());

    // Command-line values are applied before validation, and the env vars
    // they replace are never parsed.
    unsafe {
        std::env::set_var("RDM_NUMBER_FORMAT", "percent");
    }
    let overrides = ConfigOverrides {
        endpoint: Some("http://127.0.0.1:9/calcula".to_string()),
        format: Some(NumberFormat::Locale),
    };
    let config = Config::load_with_overrides(&overrides).unwrap();
    assert_eq!(
        config.endpoint.resolve().unwrap().as_str(),
        "http://127.0.0.1:9/calcula"
    );
    assert_eq!(config.display.format, NumberFormat::Locale);
    assert!(Config::load().is_err());
    unsafe {
        std::env::set_var("RDM_NUMBER_FORMAT", "raw");
    }

    // RDM_ENV_FILE is honoured even when a .env sits in the working directory
    std::fs::write(
        empty.join(".env"),
        "RDM_ENDPOINT=http://from-dot-env:1/calcula\n",
    )
    .unwrap();
    let env_path = dir.path().join("test.env");
    std::fs::write(&env_path, "RDM_ENDPOINT=http://from-dotenv:8080/calcula\n").unwrap();
    unsafe {
        std::env::remove_var("RDM_ENDPOINT");
        std::env::set_var("RDM_ENV_FILE", &env_path);
    }
    let config = Config::load().unwrap();
    assert_eq!(config.endpoint.url, "http://from-dotenv:8080/calcula");

    // Without RDM_ENV_FILE the working directory's .env is used
    unsafe {
        std::env::remove_var("RDM_ENDPOINT");
        std::env::remove_var("RDM_ENV_FILE");
    }
    let config = Config::load().unwrap();
    assert_eq!(config.endpoint.url, "http://from-dot-env:1/calcula");

    clear_env();
}
