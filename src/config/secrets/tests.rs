use super::*;
use serial_test::serial;
use std::collections::HashMap;
use tempfile::TempDir;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn file_values_take_precedence_over_environment() {
    let file = SecretsFile {
        api_key: Some("sk-file".to_string()),
        password: None,
    };
    let secrets = Secrets::resolve(
        file,
        env_from(&[(API_KEY_VAR, "sk-env"), (PASSWORD_VAR, "heslo")]),
    );

    assert_eq!(secrets.api_key().expect("api key present"), "sk-file");
    assert_eq!(secrets.require_password().expect("password present"), "heslo");
}

#[test]
fn blank_values_are_treated_as_missing() {
    let file = SecretsFile {
        api_key: Some("   ".to_string()),
        password: Some(String::new()),
    };
    let secrets = Secrets::resolve(file, env_from(&[(API_KEY_VAR, "sk-env")]));

    assert_eq!(secrets.api_key().expect("falls back to env"), "sk-env");
    assert!(!secrets.has_password());
    assert!(matches!(
        secrets.require_password(),
        Err(ConfigError::MissingSecret(PASSWORD_VAR))
    ));
}

#[test]
fn missing_api_key_reports_variable_name() {
    let secrets = Secrets::resolve(SecretsFile::default(), env_from(&[]));
    let err = secrets.api_key().expect_err("no api key configured");
    assert!(err.to_string().contains(API_KEY_VAR));
}

#[test]
fn password_comparison() {
    let secrets = Secrets::new(None, Some("tajne".to_string()));
    assert!(secrets.password_matches("tajne"));
    assert!(!secrets.password_matches("tajnE"));
    assert!(!secrets.password_matches("tajne "));
    assert!(!secrets.password_matches(""));

    let without_password = Secrets::new(None, None);
    assert!(!without_password.password_matches(""));
}

#[test]
fn debug_output_is_redacted() {
    let secrets = Secrets::new(Some("sk-very-secret".to_string()), None);
    let rendered = format!("{secrets:?}");
    assert!(!rendered.contains("sk-very-secret"));
    assert!(rendered.contains("<set>"));
    assert!(rendered.contains("<unset>"));
}

#[test]
fn read_secrets_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("secrets.toml");
    std::fs::write(&path, "OPENAI_API_KEY = \"sk-test\"\nAPP_PASSWORD = \"pw\"\n")
        .expect("should write secrets");

    let file = SecretsFile::read(&path).expect("should parse secrets");
    assert_eq!(file.api_key.as_deref(), Some("sk-test"));
    assert_eq!(file.password.as_deref(), Some("pw"));

    let missing = SecretsFile::read(&temp_dir.path().join("absent.toml"))
        .expect("missing file is not an error");
    assert!(missing.api_key.is_none());
}

#[test]
fn malformed_secrets_file_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("secrets.toml");
    std::fs::write(&path, "OPENAI_API_KEY = [").expect("should write secrets");
    assert!(SecretsFile::read(&path).is_err());
}

#[test]
#[serial]
fn load_reads_process_environment() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("should load defaults");

    // SAFETY: serialized with other environment-mutating tests
    unsafe {
        std::env::set_var(PASSWORD_VAR, "from-env");
    }
    let secrets = Secrets::load(&config).expect("should load secrets");
    // SAFETY: serialized with other environment-mutating tests
    unsafe {
        std::env::remove_var(PASSWORD_VAR);
    }

    assert!(secrets.password_matches("from-env"));
}
