//! Settings loading from file and `OCR_`-prefixed environment variables.

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE: &str = "config/settings";
const ENV_PREFIX: &str = "OCR";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

/// Process-wide configuration, loaded once at startup and passed by reference
/// or shared ownership from there on. Several knobs (`cleanup_interval`, the
/// crop and concurrency settings) are consumed only by the future OCR
/// pipeline; they are declared here so deployments can configure them ahead
/// of that work.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "Settings::default_host")]
    pub host: String,
    #[serde(default = "Settings::default_port")]
    pub port: u16,
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "Settings::default_model_path")]
    pub model_path: String,
    #[serde(default = "Settings::default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default = "Settings::default_temp_dir")]
    pub temp_dir: PathBuf,
    #[serde(default = "Settings::default_cleanup_interval")]
    pub cleanup_interval: u64,

    #[serde(default = "Settings::default_prompt")]
    pub default_prompt: String,
    #[serde(default = "Settings::default_base_size")]
    pub base_size: u32,
    #[serde(default = "Settings::default_image_size")]
    pub image_size: u32,
    #[serde(default = "Settings::default_crop_mode")]
    pub crop_mode: bool,
    #[serde(default = "Settings::default_min_crops")]
    pub min_crops: u32,
    #[serde(default = "Settings::default_max_crops")]
    pub max_crops: u32,
    #[serde(default = "Settings::default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "Settings::default_num_workers")]
    pub num_workers: usize,
    #[serde(default = "Settings::default_skip_repeat")]
    pub skip_repeat: bool,

    #[serde(default = "Settings::default_log_level")]
    pub log_level: String,
}

impl Settings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8000
    }

    fn default_model_path() -> String {
        "deepseek-ai/DeepSeek-OCR".to_string()
    }

    fn default_max_file_size() -> u64 {
        50 * 1024 * 1024
    }

    fn default_temp_dir() -> PathBuf {
        PathBuf::from("/tmp/ocr_temp")
    }

    fn default_cleanup_interval() -> u64 {
        3600
    }

    fn default_prompt() -> String {
        "<image>\n<|grounding|>Convert the document to markdown.".to_string()
    }

    fn default_base_size() -> u32 {
        1024
    }

    fn default_image_size() -> u32 {
        640
    }

    fn default_crop_mode() -> bool {
        true
    }

    fn default_min_crops() -> u32 {
        2
    }

    fn default_max_crops() -> u32 {
        6
    }

    fn default_max_concurrency() -> usize {
        100
    }

    fn default_num_workers() -> usize {
        64
    }

    fn default_skip_repeat() -> bool {
        true
    }

    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            debug: false,
            model_path: Self::default_model_path(),
            max_file_size: Self::default_max_file_size(),
            temp_dir: Self::default_temp_dir(),
            cleanup_interval: Self::default_cleanup_interval(),
            default_prompt: Self::default_prompt(),
            base_size: Self::default_base_size(),
            image_size: Self::default_image_size(),
            crop_mode: Self::default_crop_mode(),
            min_crops: Self::default_min_crops(),
            max_crops: Self::default_max_crops(),
            max_concurrency: Self::default_max_concurrency(),
            num_workers: Self::default_num_workers(),
            skip_repeat: Self::default_skip_repeat(),
            log_level: Self::default_log_level(),
        }
    }
}

/// Loads settings from the optional `config/settings` file, then applies
/// `OCR_*` environment overrides. Malformed values (a non-numeric
/// `OCR_PORT`, say) fail here rather than surfacing later.
pub fn load() -> Result<Settings, SettingsError> {
    let cfg = Config::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX))
        .build()?;
    Ok(cfg.try_deserialize()?)
}
