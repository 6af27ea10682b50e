use std::env;
use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard, OnceLock};

use glyphic_server::config;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("config env mutex poisoned")
}

fn snapshot_env(vars: &[&'static str]) -> Vec<(&'static str, Option<OsString>)> {
    vars.iter().map(|&name| (name, env::var_os(name))).collect()
}

fn restore_env(vars: Vec<(&'static str, Option<OsString>)>) {
    for (name, value) in vars {
        match value {
            Some(val) => env::set_var(name, val),
            None => env::remove_var(name),
        }
    }
}

const TRACKED: [&str; 4] = [
    "OCR_PORT",
    "OCR_MODEL_PATH",
    "OCR_MAX_FILE_SIZE",
    "OCR_CROP_MODE",
];

fn clear_tracked() {
    for name in TRACKED {
        env::remove_var(name);
    }
}

#[test]
fn load_without_environment_yields_defaults() {
    let _guard = env_guard();
    let snapshot = snapshot_env(&TRACKED);
    clear_tracked();

    let settings = config::load().expect("defaults must load");
    assert_eq!(settings.host, "0.0.0.0");
    assert_eq!(settings.port, 8000);
    assert_eq!(settings.model_path, "deepseek-ai/DeepSeek-OCR");
    assert_eq!(settings.max_file_size, 50 * 1024 * 1024);

    restore_env(snapshot);
}

#[test]
fn ocr_prefixed_variables_override_defaults() {
    let _guard = env_guard();
    let snapshot = snapshot_env(&TRACKED);
    clear_tracked();

    env::set_var("OCR_PORT", "9100");
    env::set_var("OCR_MODEL_PATH", "local/checkpoint");
    env::set_var("OCR_MAX_FILE_SIZE", "1048576");
    env::set_var("OCR_CROP_MODE", "false");

    let settings = config::load().expect("overrides must load");
    assert_eq!(settings.port, 9100);
    assert_eq!(settings.model_path, "local/checkpoint");
    assert_eq!(settings.max_file_size, 1_048_576);
    assert!(!settings.crop_mode);
    // Untouched fields keep their defaults.
    assert_eq!(settings.host, "0.0.0.0");

    restore_env(snapshot);
}

#[test]
fn non_numeric_port_fails_at_load_time() {
    let _guard = env_guard();
    let snapshot = snapshot_env(&TRACKED);
    clear_tracked();

    env::set_var("OCR_PORT", "not-a-port");
    let result = config::load();
    assert!(result.is_err(), "bad port must abort settings load");

    restore_env(snapshot);
}
