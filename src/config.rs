use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime settings, loaded from the environment (a `.env` file is read
/// first if present). `API_USERNAME`, `API_PASSWORD`, `EXPERIMENT_ID` and
/// `RUN_ID` are required; everything else has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_username: String,
    pub api_password: String,
    pub experiment_id: String,
    pub run_id: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_model_path")]
    pub model_path: String,

    #[serde(default = "default_features_path")]
    pub features_path: String,

    #[serde(default = "default_demographics_path")]
    pub demographics_path: String,

    #[serde(default = "default_log_path")]
    pub log_path: String,

    #[serde(default = "default_full_log_path")]
    pub full_log_path: String,
}

fn default_port() -> u16 {
    8000
}

fn default_model_path() -> String {
    "model/model.json".to_string()
}

fn default_features_path() -> String {
    "model/model_features.json".to_string()
}

fn default_demographics_path() -> String {
    "data/zipcode_demographics.csv".to_string()
}

fn default_log_path() -> String {
    "data/prediction_logs.csv".to_string()
}

fn default_full_log_path() -> String {
    "data/prediction_logs_all_inputs.csv".to_string()
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        envy::from_env::<Settings>().context("failed to load settings from environment")
    }
}
