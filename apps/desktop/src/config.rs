use std::{collections::HashMap, fs};

use gemini_integration::GeminiOptions;

const SETTINGS_FILE: &str = "assistant.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base_url: String,
    pub questions_per_quiz: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = GeminiOptions::new(String::new());
        Self {
            gemini_api_key: defaults.api_key,
            gemini_model: defaults.model,
            gemini_api_base_url: defaults.api_base_url,
            questions_per_quiz: defaults.questions_per_quiz,
        }
    }
}

impl Settings {
    pub fn into_gemini_options(self) -> GeminiOptions {
        GeminiOptions {
            api_key: self.gemini_api_key,
            model: self.gemini_model,
            api_base_url: self.gemini_api_base_url,
            questions_per_quiz: self.questions_per_quiz,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings);

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };

    if let Some(v) = file_cfg.get("gemini_api_key") {
        settings.gemini_api_key = v.clone();
    }
    if let Some(v) = file_cfg.get("gemini_model") {
        settings.gemini_model = v.clone();
    }
    if let Some(v) = file_cfg.get("gemini_api_base_url") {
        settings.gemini_api_base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("questions_per_quiz") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.questions_per_quiz = parsed;
        }
    }
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = std::env::var("GEMINI_API_KEY") {
        settings.gemini_api_key = v;
    }
    if let Ok(v) = std::env::var("APP__GEMINI_API_KEY") {
        settings.gemini_api_key = v;
    }

    if let Ok(v) = std::env::var("GEMINI_MODEL") {
        settings.gemini_model = v;
    }
    if let Ok(v) = std::env::var("APP__GEMINI_MODEL") {
        settings.gemini_model = v;
    }

    if let Ok(v) = std::env::var("GEMINI_API_BASE_URL") {
        settings.gemini_api_base_url = v;
    }
    if let Ok(v) = std::env::var("APP__GEMINI_API_BASE_URL") {
        settings.gemini_api_base_url = v;
    }

    if let Ok(v) = std::env::var("APP__QUESTIONS_PER_QUIZ") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.questions_per_quiz = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
