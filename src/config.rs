//! Loading service configuration (session code settings + optional survey bank) from TOML.
//!
//! See `AppConfig` for the expected schema:
//!
//! ```toml
//! [codes]
//! min_digits = 4
//! max_digits = 6
//! attempts_per_width = 32
//!
//! [[surveys]]
//! title = "Course feedback"
//! group_by = 1
//!
//! [[surveys.questions]]
//! number = 1
//! title = "Section"
//! type = "DP"
//! required = true
//! choices = [{ value = "a", description = "Section A" }]
//! ```

use serde::Deserialize;
use tracing::{error, info};

use crate::codes::CodeConfig;
use crate::schema::SurveyDraft;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub codes: CodeConfig,
  #[serde(default)]
  pub surveys: Vec<SurveyDraft>,
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Attempt to load `AppConfig` from SURVEY_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("SURVEY_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "survey_core", %path, surveys = cfg.surveys.len(), "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "survey_core", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "survey_core", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
