use super::{apply_file_overrides, Settings};

#[test]
fn defaults_point_at_the_public_api() {
    let settings = Settings::default();

    assert!(settings.gemini_api_key.is_empty());
    assert!(settings.gemini_api_base_url.starts_with("https://"));
    assert!(!settings.gemini_model.is_empty());
    assert!(settings.questions_per_quiz >= 1);
}

#[test]
fn file_overrides_replace_defaults() {
    let mut settings = Settings::default();
    apply_file_overrides(
        &mut settings,
        r#"
gemini_api_key = "file-key"
gemini_model = "gemini-test"
gemini_api_base_url = "http://127.0.0.1:9999"
questions_per_quiz = "8"
"#,
    );

    assert_eq!(settings.gemini_api_key, "file-key");
    assert_eq!(settings.gemini_model, "gemini-test");
    assert_eq!(settings.gemini_api_base_url, "http://127.0.0.1:9999");
    assert_eq!(settings.questions_per_quiz, 8);
}

#[test]
fn unparseable_question_count_keeps_default() {
    let mut settings = Settings::default();
    let default_count = settings.questions_per_quiz;
    apply_file_overrides(&mut settings, "questions_per_quiz = \"lots\"\n");

    assert_eq!(settings.questions_per_quiz, default_count);
}

#[test]
fn malformed_file_is_ignored() {
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, "not [valid toml");

    assert!(settings.gemini_api_key.is_empty());
}

#[test]
fn settings_map_onto_gemini_options() {
    let mut settings = Settings::default();
    settings.gemini_api_key = "abc".to_string();
    settings.questions_per_quiz = 3;

    let options = settings.into_gemini_options();

    assert_eq!(options.api_key, "abc");
    assert_eq!(options.questions_per_quiz, 3);
}
