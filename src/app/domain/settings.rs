//! Visual settings shared by project defaults and every screenshot.
//!
//! A [`SettingsTree`] is the unit that gets seeded from defaults, snapshotted
//! by history and copied by style propagation. All structs tolerate missing
//! fields on deserialization so older records keep loading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::asset::{ImageHandle, ImageSource};

/// Which branch of a settings tree an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsKind {
    Background,
    Screenshot,
    Text,
}

impl SettingsKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Screenshot => "screenshot",
            Self::Text => "text",
        }
    }

    pub fn all() -> &'static [SettingsKind] {
        &[Self::Background, Self::Screenshot, Self::Text]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    #[default]
    Gradient,
    Solid,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Stretch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub color: String,
    /// Percentage along the gradient axis, 0..=100.
    pub position: f32,
}

impl GradientStop {
    pub fn new(color: &str, position: f32) -> Self {
        Self {
            color: color.to_string(),
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gradient {
    pub angle: f32,
    pub stops: Vec<GradientStop>,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            angle: 135.0,
            stops: vec![
                GradientStop::new("#667eea", 0.0),
                GradientStop::new("#764ba2", 100.0),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Background {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    pub gradient: Gradient,
    pub solid: String,
    #[serde(skip)]
    pub image: Option<ImageHandle>,
    /// Persisted source of the background image, if one was chosen.
    pub image_src: Option<ImageSource>,
    pub image_fit: ImageFit,
    pub image_blur: f32,
    pub overlay_color: String,
    pub overlay_opacity: f32,
    pub noise: bool,
    pub noise_intensity: f32,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Gradient,
            gradient: Gradient::default(),
            solid: "#1a1a2e".to_string(),
            image: None,
            image_src: None,
            image_fit: ImageFit::Cover,
            image_blur: 0.0,
            overlay_color: "#000000".to_string(),
            overlay_opacity: 0.0,
            noise: false,
            noise_intensity: 10.0,
        }
    }
}

impl Background {
    /// Repair values a renderer cannot use: stop positions outside 0..=100
    /// and gradients with fewer than two stops.
    pub fn normalize(&mut self) {
        for stop in &mut self.gradient.stops {
            stop.position = stop.position.clamp(0.0, 100.0);
        }
        if self.kind == BackgroundKind::Gradient && self.gradient.stops.len() < 2 {
            let fallback = Gradient::default();
            match self.gradient.stops.first().cloned() {
                Some(only) => {
                    let end = if only.position >= 100.0 { 0.0 } else { 100.0 };
                    self.gradient.stops.push(GradientStop::new(&only.color, end));
                    self.gradient
                        .stops
                        .sort_by(|a, b| a.position.total_cmp(&b.position));
                }
                None => self.gradient.stops = fallback.stops,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Rotation3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shadow {
    pub enabled: bool,
    pub color: String,
    pub blur: f32,
    pub opacity: f32,
    pub x: f32,
    pub y: f32,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            enabled: true,
            color: "#000000".to_string(),
            blur: 40.0,
            opacity: 30.0,
            x: 0.0,
            y: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frame {
    pub enabled: bool,
    pub color: String,
    pub width: f32,
    pub opacity: f32,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "#1d1d1f".to_string(),
            width: 12.0,
            opacity: 100.0,
        }
    }
}

/// Placement of the device mockup. Persisted under the `screenshot` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceTransform {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub perspective: f32,
    pub corner_radius: f32,
    #[serde(rename = "use3D")]
    pub use_3d: bool,
    #[serde(rename = "device3D")]
    pub device_3d: String,
    #[serde(rename = "rotation3D")]
    pub rotation_3d: Rotation3D,
    pub shadow: Shadow,
    pub frame: Frame,
}

impl Default for DeviceTransform {
    fn default() -> Self {
        Self {
            scale: 70.0,
            x: 50.0,
            y: 60.0,
            rotation: 0.0,
            perspective: 0.0,
            corner_radius: 24.0,
            use_3d: false,
            device_3d: "iphone".to_string(),
            rotation_3d: Rotation3D::default(),
            shadow: Shadow::default(),
            frame: Frame::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    #[default]
    Top,
    Bottom,
}

/// Which localized string of a [`TextBlock`] an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Headline,
    Subheadline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextBlock {
    pub headline_enabled: bool,
    pub headlines: BTreeMap<String, String>,
    pub headline_languages: Vec<String>,
    pub current_headline_lang: String,
    pub headline_font: String,
    pub headline_size: f32,
    pub headline_weight: String,
    pub headline_color: String,
    pub headline_italic: bool,
    pub headline_underline: bool,
    pub headline_strikethrough: bool,
    pub position: TextPosition,
    pub offset_y: f32,
    pub line_height: f32,
    pub stacked_text: bool,
    pub subheadline_enabled: bool,
    pub subheadlines: BTreeMap<String, String>,
    pub subheadline_languages: Vec<String>,
    pub current_subheadline_lang: String,
    pub subheadline_font: String,
    pub subheadline_size: f32,
    pub subheadline_weight: String,
    pub subheadline_color: String,
    pub subheadline_italic: bool,
    pub subheadline_underline: bool,
    pub subheadline_strikethrough: bool,
    pub subheadline_opacity: f32,
}

const DEFAULT_FONT: &str = "-apple-system, BlinkMacSystemFont, 'SF Pro Display', sans-serif";

impl Default for TextBlock {
    fn default() -> Self {
        let languages = vec!["en".to_string()];
        let mut headlines = BTreeMap::new();
        headlines.insert("en".to_string(), String::new());
        let subheadlines = headlines.clone();
        Self {
            headline_enabled: true,
            headlines,
            headline_languages: languages.clone(),
            current_headline_lang: "en".to_string(),
            headline_font: DEFAULT_FONT.to_string(),
            headline_size: 100.0,
            headline_weight: "600".to_string(),
            headline_color: "#ffffff".to_string(),
            headline_italic: false,
            headline_underline: false,
            headline_strikethrough: false,
            position: TextPosition::Top,
            offset_y: 12.0,
            line_height: 110.0,
            stacked_text: false,
            subheadline_enabled: false,
            subheadlines,
            subheadline_languages: languages,
            current_subheadline_lang: "en".to_string(),
            subheadline_font: DEFAULT_FONT.to_string(),
            subheadline_size: 50.0,
            subheadline_weight: "400".to_string(),
            subheadline_color: "#ffffff".to_string(),
            subheadline_italic: false,
            subheadline_underline: false,
            subheadline_strikethrough: false,
            subheadline_opacity: 70.0,
        }
    }
}

impl TextBlock {
    /// Defaults seeded for the given project languages instead of `en` only.
    pub fn for_languages(languages: &[String], current: &str) -> Self {
        let mut text = Self {
            headlines: BTreeMap::new(),
            headline_languages: Vec::new(),
            subheadlines: BTreeMap::new(),
            subheadline_languages: Vec::new(),
            ..Self::default()
        };
        for lang in languages {
            text.add_language(lang);
        }
        text.set_current_language(current);
        text
    }

    pub fn text(&self, field: TextField, lang: &str) -> &str {
        let map = match field {
            TextField::Headline => &self.headlines,
            TextField::Subheadline => &self.subheadlines,
        };
        map.get(lang).map(String::as_str).unwrap_or("")
    }

    pub fn set_text(&mut self, field: TextField, lang: &str, value: &str) {
        let (map, languages) = match field {
            TextField::Headline => (&mut self.headlines, &mut self.headline_languages),
            TextField::Subheadline => (&mut self.subheadlines, &mut self.subheadline_languages),
        };
        if !languages.iter().any(|l| l == lang) {
            languages.push(lang.to_string());
        }
        map.insert(lang.to_string(), value.to_string());
    }

    /// Seed an empty string for `lang` in both maps, keeping existing text.
    pub fn add_language(&mut self, lang: &str) {
        if !self.headline_languages.iter().any(|l| l == lang) {
            self.headline_languages.push(lang.to_string());
        }
        self.headlines.entry(lang.to_string()).or_default();
        if !self.subheadline_languages.iter().any(|l| l == lang) {
            self.subheadline_languages.push(lang.to_string());
        }
        self.subheadlines.entry(lang.to_string()).or_default();
    }

    pub fn remove_language(&mut self, lang: &str) {
        self.headline_languages.retain(|l| l != lang);
        self.headlines.remove(lang);
        self.subheadline_languages.retain(|l| l != lang);
        self.subheadlines.remove(lang);
        self.normalize();
    }

    pub fn set_current_language(&mut self, lang: &str) {
        self.add_language(lang);
        self.current_headline_lang = lang.to_string();
        self.current_subheadline_lang = lang.to_string();
    }

    /// Languages lists must cover every key of their text map, and the
    /// current language of each field must be one of its listed languages.
    pub fn normalize(&mut self) {
        for key in self.headlines.keys() {
            if !self.headline_languages.contains(key) {
                self.headline_languages.push(key.clone());
            }
        }
        for key in self.subheadlines.keys() {
            if !self.subheadline_languages.contains(key) {
                self.subheadline_languages.push(key.clone());
            }
        }
        repair_current(&mut self.current_headline_lang, &mut self.headline_languages);
        repair_current(&mut self.current_subheadline_lang, &mut self.subheadline_languages);
    }

    /// Copy every styling field from `source`, keeping this block's own
    /// localized strings and language bookkeeping.
    pub fn copy_style_from(&mut self, source: &TextBlock) {
        let headlines = std::mem::take(&mut self.headlines);
        let headline_languages = std::mem::take(&mut self.headline_languages);
        let current_headline_lang = std::mem::take(&mut self.current_headline_lang);
        let subheadlines = std::mem::take(&mut self.subheadlines);
        let subheadline_languages = std::mem::take(&mut self.subheadline_languages);
        let current_subheadline_lang = std::mem::take(&mut self.current_subheadline_lang);

        *self = Self {
            headlines,
            headline_languages,
            current_headline_lang,
            subheadlines,
            subheadline_languages,
            current_subheadline_lang,
            ..source.clone()
        };
    }
}

fn repair_current(current: &mut String, languages: &mut Vec<String>) {
    if languages.iter().any(|l| l == current) {
        return;
    }
    match languages.first() {
        Some(first) => *current = first.clone(),
        None if !current.is_empty() => languages.push(current.clone()),
        None => {
            *current = "en".to_string();
            languages.push(current.clone());
        }
    }
}

/// The three independent settings branches of one screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SettingsTree {
    pub background: Background,
    pub screenshot: DeviceTransform,
    pub text: TextBlock,
}

impl SettingsTree {
    pub fn normalize(&mut self) {
        self.background.normalize();
        self.text.normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let tree = SettingsTree::default();
        assert_eq!(tree.background.kind, BackgroundKind::Gradient);
        assert_eq!(tree.background.gradient.stops.len(), 2);
        assert_eq!(tree.screenshot.scale, 70.0);
        assert!(tree.screenshot.shadow.enabled);
        assert_eq!(tree.text.headline_languages, vec!["en".to_string()]);
        assert_eq!(tree.text.current_headline_lang, "en");
    }

    #[test]
    fn test_partial_background_uses_defaults() {
        let json = r##"{"type": "solid", "solid": "#ff0000"}"##;
        let bg: Background = serde_json::from_str(json).unwrap();
        assert_eq!(bg.kind, BackgroundKind::Solid);
        assert_eq!(bg.solid, "#ff0000");
        assert_eq!(bg.gradient, Gradient::default());
        assert_eq!(bg.noise_intensity, 10.0);
    }

    #[test]
    fn test_device_transform_field_names() {
        let json = serde_json::to_value(DeviceTransform::default()).unwrap();
        assert!(json.get("use3D").is_some());
        assert!(json.get("device3D").is_some());
        assert!(json.get("rotation3D").is_some());
        assert!(json.get("cornerRadius").is_some());
    }

    #[test]
    fn test_normalize_repairs_gradient() {
        let mut bg = Background::default();
        bg.gradient.stops = vec![GradientStop::new("#fff", 140.0)];
        bg.normalize();
        assert_eq!(bg.gradient.stops.len(), 2);
        assert!(bg.gradient.stops.iter().all(|s| (0.0..=100.0).contains(&s.position)));

        bg.gradient.stops.clear();
        bg.normalize();
        assert_eq!(bg.gradient.stops, Gradient::default().stops);
    }

    #[test]
    fn test_solid_background_keeps_single_stop() {
        let mut bg = Background {
            kind: BackgroundKind::Solid,
            ..Default::default()
        };
        bg.gradient.stops.truncate(1);
        bg.normalize();
        assert_eq!(bg.gradient.stops.len(), 1);
    }

    #[test]
    fn test_text_normalize_covers_map_keys() {
        let mut text = TextBlock::default();
        text.headlines.insert("de".into(), "Hallo".into());
        text.current_subheadline_lang = "fr".into();
        text.normalize();
        assert!(text.headline_languages.contains(&"de".to_string()));
        assert_eq!(text.current_subheadline_lang, "en");
    }

    #[test]
    fn test_set_text_registers_language() {
        let mut text = TextBlock::default();
        text.set_text(TextField::Subheadline, "ja", "こんにちは");
        assert_eq!(text.text(TextField::Subheadline, "ja"), "こんにちは");
        assert!(text.subheadline_languages.contains(&"ja".to_string()));
        assert_eq!(text.text(TextField::Headline, "ja"), "");
    }

    #[test]
    fn test_copy_style_keeps_strings() {
        let mut target = TextBlock::default();
        target.set_text(TextField::Headline, "en", "Target copy");
        let mut source = TextBlock::default();
        source.set_text(TextField::Headline, "en", "Source copy");
        source.headline_size = 140.0;
        source.headline_color = "#ff00ff".into();

        target.copy_style_from(&source);
        assert_eq!(target.text(TextField::Headline, "en"), "Target copy");
        assert_eq!(target.headline_size, 140.0);
        assert_eq!(target.headline_color, "#ff00ff");
    }

    #[test]
    fn test_for_languages() {
        let langs = vec!["en".to_string(), "de".to_string()];
        let text = TextBlock::for_languages(&langs, "de");
        assert_eq!(text.headline_languages, langs);
        assert_eq!(text.current_headline_lang, "de");
        assert_eq!(text.headlines.get("de").map(String::as_str), Some(""));
    }
}
