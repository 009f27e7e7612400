//! Language-aware lookups over screenshots and project language management.

use std::path::Path;
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::app::domain::asset::ImageHandle;
use crate::app::domain::language::is_known_language;
use crate::app::domain::project::ProjectState;
use crate::app::domain::screenshot::Screenshot;
use crate::app::domain::settings::TextField;
use crate::app::infrastructure::error::{AppError, Result};

/// Image to draw for `lang`: the localized variant, then the legacy single
/// image, then nothing.
pub fn resolve_image<'a>(screenshot: &'a Screenshot, lang: &str) -> Option<&'a ImageHandle> {
    screenshot
        .localized_images
        .get(lang)
        .and_then(|entry| entry.image.as_ref())
        .or(screenshot.image.as_ref())
}

/// Text to draw for `lang`, falling back to the field's primary language.
pub fn resolve_text<'a>(screenshot: &'a Screenshot, field: TextField, lang: &str) -> &'a str {
    let text = &screenshot.settings.text;
    let value = text.text(field, lang);
    if !value.is_empty() {
        return value;
    }
    let primary = match field {
        TextField::Headline => text.headline_languages.first(),
        TextField::Subheadline => text.subheadline_languages.first(),
    };
    primary.map(|p| text.text(field, p)).unwrap_or("")
}

/// True when every project language has an image variant.
pub fn is_complete(screenshot: &Screenshot, project_languages: &[String]) -> bool {
    project_languages
        .iter()
        .all(|lang| screenshot.localized_images.contains_key(lang))
}

pub fn missing_languages(screenshot: &Screenshot, project_languages: &[String]) -> Vec<String> {
    project_languages
        .iter()
        .filter(|lang| !screenshot.localized_images.contains_key(*lang))
        .cloned()
        .collect()
}

fn normalize_code(lang: &str) -> Result<String> {
    let code = lang.trim().to_ascii_lowercase().replace('_', "-");
    let valid = !code.is_empty()
        && code.len() <= 10
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(AppError::Language(format!("invalid language code '{}'", lang)));
    }
    Ok(code)
}

/// Add `lang` to the project and seed empty text slots for it on the
/// defaults and every screenshot. Returns false if it was already present.
pub fn add_language(state: &mut ProjectState, lang: &str) -> Result<bool> {
    let code = normalize_code(lang)?;
    if state.project_languages.contains(&code) {
        return Ok(false);
    }
    state.project_languages.push(code.clone());
    state.defaults.text.add_language(&code);
    for shot in &mut state.screenshots {
        shot.settings.text.add_language(&code);
    }
    log::info!("Added language '{}' to project {}", code, state.id);
    Ok(true)
}

/// Remove `lang` from the project, its text slots and its image variants.
/// Refused when it is the only language left.
pub fn remove_language(state: &mut ProjectState, lang: &str) -> Result<bool> {
    let code = normalize_code(lang)?;
    if !state.project_languages.contains(&code) {
        return Ok(false);
    }
    if state.project_languages.len() == 1 {
        return Err(AppError::Language(
            "a project needs at least one language".to_string(),
        ));
    }
    state.project_languages.retain(|l| *l != code);
    if state.current_language == code {
        state.current_language = state.project_languages[0].clone();
    }
    let current = state.current_language.clone();

    state.defaults.text.remove_language(&code);
    for shot in &mut state.screenshots {
        shot.settings.text.remove_language(&code);
        shot.localized_images.remove(&code);
        shot.image = None;
        shot.src = None;
        shot.sync_legacy_image(&current);
    }
    log::info!("Removed language '{}' from project {}", code, state.id);
    Ok(true)
}

/// Make `lang` the displayed language, adding it to the project if needed.
pub fn set_current_language(state: &mut ProjectState, lang: &str) -> Result<()> {
    let code = normalize_code(lang)?;
    add_language(state, &code)?;
    state.current_language = code.clone();
    state.defaults.text.set_current_language(&code);
    for shot in &mut state.screenshots {
        shot.settings.text.set_current_language(&code);
        shot.sync_legacy_image(&code);
    }
    Ok(())
}

fn region_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[_-]([a-z]{2})[-_]([a-z]{2,4})$").expect("valid regex"))
}

fn simple_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[_-]([a-z]{2})$").expect("valid regex"))
}

fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_ascii_lowercase()
}

/// Split a lowercase stem into (base, language) when it ends in a known
/// language suffix: `_xx`, `-xx` or `_xx-yy`.
fn split_suffix(stem: &str) -> Option<(String, String)> {
    if let Some(caps) = region_suffix().captures(stem) {
        let whole = caps.get(0)?;
        let full = format!("{}-{}", &caps[1], &caps[2]);
        let base = stem[..whole.start()].to_string();
        if is_known_language(&full) {
            return Some((base, full));
        }
        if is_known_language(&caps[1]) && !is_known_language(&caps[2]) {
            return Some((base, caps[1].to_string()));
        }
    }
    let caps = simple_suffix().captures(stem)?;
    let whole = caps.get(0)?;
    if is_known_language(&caps[1]) {
        return Some((stem[..whole.start()].to_string(), caps[1].to_string()));
    }
    None
}

/// Language encoded in an upload's filename, if it has a recognizable suffix.
pub fn parse_language_suffix(filename: &str) -> Option<String> {
    split_suffix(&file_stem(filename)).map(|(_, lang)| lang)
}

pub fn detect_language(filename: &str, fallback: &str) -> String {
    parse_language_suffix(filename).unwrap_or_else(|| fallback.to_string())
}

/// Lowercase filename stem with any language suffix removed.
pub fn base_filename(filename: &str) -> String {
    let stem = file_stem(filename);
    match split_suffix(&stem) {
        Some((base, _)) => base,
        None => stem,
    }
}

/// Index of the screenshot an upload belongs to as a language variant.
pub fn find_variant_target(state: &ProjectState, filename: &str) -> Option<usize> {
    let base = base_filename(filename);
    if base.is_empty() {
        return None;
    }
    state.screenshots.iter().position(|shot| {
        base_filename(&shot.name) == base
            || shot
                .localized_images
                .values()
                .any(|entry| base_filename(&entry.name) == base)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::domain::asset::LocalizedImage;
    use image::{DynamicImage, RgbaImage};

    fn handle() -> ImageHandle {
        ImageHandle::new(DynamicImage::ImageRgba8(RgbaImage::new(2, 4)))
    }

    fn project_with_shot(name: &str) -> ProjectState {
        let mut state = ProjectState::new("p1");
        let index = state.add_screenshot(name);
        state.screenshots[index].set_localized_image(
            "en",
            LocalizedImage::new(handle(), "data:".into(), name.into()),
        );
        state
    }

    #[test]
    fn test_parse_language_suffix() {
        assert_eq!(parse_language_suffix("S1_de.png"), Some("de".to_string()));
        assert_eq!(parse_language_suffix("home-fr.jpg"), Some("fr".to_string()));
        assert_eq!(parse_language_suffix("home_pt-BR.png"), Some("pt-br".to_string()));
        assert_eq!(parse_language_suffix("home_en_US.png"), Some("en-us".to_string()));
        assert_eq!(parse_language_suffix("home_de-xx.png"), Some("de".to_string()));
        assert_eq!(parse_language_suffix("foo_ab_en.png"), Some("en".to_string()));
        assert_eq!(parse_language_suffix("screen.png"), None);
        assert_eq!(parse_language_suffix("shot_v2.png"), None);
        assert_eq!(parse_language_suffix("my_app_screen.png"), None);
    }

    #[test]
    fn test_detect_language_fallback() {
        assert_eq!(detect_language("hero.png", "en"), "en");
        assert_eq!(detect_language("hero_ja.png", "en"), "ja");
    }

    #[test]
    fn test_base_filename() {
        assert_eq!(base_filename("S1_de.png"), "s1");
        assert_eq!(base_filename("S1_en.png"), "s1");
        assert_eq!(base_filename("home_pt-BR.png"), "home");
        assert_eq!(base_filename("hero.png"), "hero");
    }

    #[test]
    fn test_find_variant_target() {
        let state = project_with_shot("S1_en.png");
        assert_eq!(find_variant_target(&state, "S1_de.png"), Some(0));
        assert_eq!(find_variant_target(&state, "other_en.png"), None);
    }

    #[test]
    fn test_resolve_image_fallbacks() {
        let mut state = project_with_shot("S1_en.png");
        let shot = &mut state.screenshots[0];
        assert!(resolve_image(shot, "en").is_some());
        assert!(resolve_image(shot, "de").is_none());

        let legacy = handle();
        shot.image = Some(legacy.clone());
        assert_eq!(resolve_image(shot, "de"), Some(&legacy));

        shot.localized_images.insert("fr".into(), LocalizedImage::pending("x".into(), "x".into()));
        assert_eq!(resolve_image(shot, "fr"), Some(&legacy));
    }

    #[test]
    fn test_completeness() {
        let mut state = project_with_shot("S1_en.png");
        let langs = vec!["en".to_string(), "de".to_string()];
        assert!(!is_complete(&state.screenshots[0], &langs));
        assert_eq!(missing_languages(&state.screenshots[0], &langs), vec!["de".to_string()]);
        state.screenshots[0].set_localized_image(
            "de",
            LocalizedImage::new(handle(), "data:".into(), "S1_de.png".into()),
        );
        assert!(is_complete(&state.screenshots[0], &langs));
    }

    #[test]
    fn test_add_language_seeds_every_screenshot() {
        let mut state = project_with_shot("S1_en.png");
        state.add_screenshot("S2");
        assert!(add_language(&mut state, "DE").unwrap());
        assert!(!add_language(&mut state, "de").unwrap());
        assert_eq!(state.project_languages, vec!["en".to_string(), "de".to_string()]);
        for shot in &state.screenshots {
            assert!(shot.settings.text.headline_languages.contains(&"de".to_string()));
            assert_eq!(shot.settings.text.subheadlines.get("de").map(String::as_str), Some(""));
        }
        assert!(add_language(&mut state, "  ").is_err());
    }

    #[test]
    fn test_remove_last_language_rejected() {
        let mut state = project_with_shot("S1_en.png");
        let before = state.clone();
        assert!(matches!(remove_language(&mut state, "en"), Err(AppError::Language(_))));
        assert_eq!(state, before);
    }

    #[test]
    fn test_remove_language_switches_current() {
        let mut state = project_with_shot("S1_en.png");
        add_language(&mut state, "de").unwrap();
        set_current_language(&mut state, "de").unwrap();
        assert!(remove_language(&mut state, "de").unwrap());
        assert_eq!(state.current_language, "en");
        let text = &state.screenshots[0].settings.text;
        assert!(!text.headline_languages.contains(&"de".to_string()));
        assert_eq!(text.current_headline_lang, "en");
        assert!(!remove_language(&mut state, "fr").unwrap());
    }

    #[test]
    fn test_set_current_language_syncs_text() {
        let mut state = project_with_shot("S1_en.png");
        set_current_language(&mut state, "ja").unwrap();
        assert!(state.project_languages.contains(&"ja".to_string()));
        assert_eq!(state.screenshots[0].settings.text.current_headline_lang, "ja");
        assert_eq!(state.defaults.text.current_subheadline_lang, "ja");
    }

    #[test]
    fn test_resolve_text_falls_back_to_primary() {
        let mut state = project_with_shot("S1_en.png");
        add_language(&mut state, "de").unwrap();
        let shot = &mut state.screenshots[0];
        shot.settings.text.set_text(TextField::Headline, "en", "Hello");
        assert_eq!(resolve_text(shot, TextField::Headline, "de"), "Hello");
        shot.settings.text.set_text(TextField::Headline, "de", "Hallo");
        assert_eq!(resolve_text(shot, TextField::Headline, "de"), "Hallo");
    }
}
