use serde::{Deserialize, Serialize};

use super::screenshot::{Screenshot, ScreenshotId};
use super::settings::{SettingsTree, TextBlock};

/// Version written into every record saved by this build. Records without
/// a version tag are treated as version 0.
pub const SCHEMA_VERSION: u32 = 2;

/// Entry of the project list kept in the metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub screenshot_count: usize,
}

/// Export target for the composed images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputDevice {
    #[default]
    #[serde(rename = "iphone-6.9")]
    Iphone69,
    #[serde(rename = "iphone-6.7")]
    Iphone67,
    #[serde(rename = "iphone-6.5")]
    Iphone65,
    #[serde(rename = "iphone-5.5")]
    Iphone55,
    #[serde(rename = "ipad-12.9")]
    Ipad129,
    #[serde(rename = "ipad-11")]
    Ipad11,
    #[serde(rename = "android-phone")]
    AndroidPhone,
    #[serde(rename = "android-tablet")]
    AndroidTablet,
    #[serde(rename = "custom")]
    Custom,
}

impl OutputDevice {
    /// Pixel size of the export, `None` for [`OutputDevice::Custom`].
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Iphone69 => Some((1320, 2868)),
            Self::Iphone67 => Some((1290, 2796)),
            Self::Iphone65 => Some((1284, 2778)),
            Self::Iphone55 => Some((1242, 2208)),
            Self::Ipad129 => Some((2048, 2732)),
            Self::Ipad11 => Some((1668, 2388)),
            Self::AndroidPhone => Some((1080, 1920)),
            Self::AndroidTablet => Some((1600, 2560)),
            Self::Custom => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Iphone69 => "iPhone 6.9\"",
            Self::Iphone67 => "iPhone 6.7\"",
            Self::Iphone65 => "iPhone 6.5\"",
            Self::Iphone55 => "iPhone 5.5\"",
            Self::Ipad129 => "iPad 12.9\"",
            Self::Ipad11 => "iPad 11\"",
            Self::AndroidPhone => "Android Phone",
            Self::AndroidTablet => "Android Tablet",
            Self::Custom => "Custom",
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<String> {
    vec![default_language()]
}

fn default_custom_width() -> u32 {
    1290
}

fn default_custom_height() -> u32 {
    2796
}

/// Full persisted state of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub screenshots: Vec<Screenshot>,
    #[serde(default)]
    pub selected_index: usize,
    #[serde(default)]
    pub output_device: OutputDevice,
    #[serde(default = "default_custom_width")]
    pub custom_width: u32,
    #[serde(default = "default_custom_height")]
    pub custom_height: u32,
    #[serde(default = "default_language")]
    pub current_language: String,
    #[serde(default = "default_languages")]
    pub project_languages: Vec<String>,
    #[serde(default)]
    pub defaults: SettingsTree,
    #[serde(skip)]
    next_screenshot_id: u64,
}

impl ProjectState {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            version: SCHEMA_VERSION,
            screenshots: Vec::new(),
            selected_index: 0,
            output_device: OutputDevice::default(),
            custom_width: default_custom_width(),
            custom_height: default_custom_height(),
            current_language: default_language(),
            project_languages: default_languages(),
            defaults: SettingsTree::default(),
            next_screenshot_id: 1,
        }
    }

    /// Export size in pixels, honoring the custom dimensions.
    pub fn output_size(&self) -> (u32, u32) {
        self.output_device
            .dimensions()
            .unwrap_or((self.custom_width.max(1), self.custom_height.max(1)))
    }

    /// The selected index, clamped into range. The clamp is written back.
    pub fn selected_index(&mut self) -> usize {
        let max = self.screenshots.len().saturating_sub(1);
        if self.selected_index > max {
            self.selected_index = max;
        }
        self.selected_index
    }

    pub fn select(&mut self, index: usize) -> usize {
        self.selected_index = index;
        self.selected_index()
    }

    /// Settings of the selected screenshot, or the project defaults when the
    /// project has no screenshots.
    pub fn current_settings(&mut self) -> &mut SettingsTree {
        let index = self.selected_index();
        match self.screenshots.get_mut(index) {
            Some(shot) => &mut shot.settings,
            None => &mut self.defaults,
        }
    }

    pub fn next_id(&mut self) -> ScreenshotId {
        self.next_screenshot_id = self.next_screenshot_id.max(1);
        let id = ScreenshotId(self.next_screenshot_id);
        self.next_screenshot_id += 1;
        id
    }

    /// Give every screenshot a fresh runtime id. Run after deserializing.
    pub fn assign_ids(&mut self) {
        self.next_screenshot_id = 1;
        for i in 0..self.screenshots.len() {
            let id = self.next_id();
            self.screenshots[i].id = id;
        }
    }

    pub fn index_of(&self, id: ScreenshotId) -> Option<usize> {
        self.screenshots.iter().position(|s| s.id == id)
    }

    pub fn screenshot_mut(&mut self, id: ScreenshotId) -> Option<&mut Screenshot> {
        self.screenshots.iter_mut().find(|s| s.id == id)
    }

    /// A new screenshot seeded from the defaults, with text slots for every
    /// project language. Returns its index; it becomes the selection.
    pub fn add_screenshot(&mut self, name: &str) -> usize {
        let id = self.next_id();
        let mut shot = Screenshot::new(id, name, &self.defaults);
        let mut text = TextBlock::for_languages(&self.project_languages, &self.current_language);
        text.copy_style_from(&self.defaults.text);
        for (lang, value) in &self.defaults.text.headlines {
            if !value.is_empty() {
                text.headlines.insert(lang.clone(), value.clone());
            }
        }
        for (lang, value) in &self.defaults.text.subheadlines {
            if !value.is_empty() {
                text.subheadlines.insert(lang.clone(), value.clone());
            }
        }
        text.normalize();
        shot.settings.text = text;
        self.screenshots.push(shot);
        self.selected_index = self.screenshots.len() - 1;
        self.selected_index
    }

    pub fn remove_screenshot(&mut self, index: usize) -> Option<Screenshot> {
        if index >= self.screenshots.len() {
            return None;
        }
        let removed = self.screenshots.remove(index);
        if self.selected_index > index {
            self.selected_index -= 1;
        }
        self.selected_index();
        Some(removed)
    }

    pub fn duplicate_screenshot(&mut self, index: usize) -> Option<usize> {
        let mut copy = self.screenshots.get(index)?.clone();
        copy.id = self.next_id();
        copy.name = format!("{} copy", copy.name);
        self.screenshots.insert(index + 1, copy);
        self.selected_index = index + 1;
        Some(index + 1)
    }

    /// Move a screenshot, keeping the same screenshot selected.
    pub fn move_screenshot(&mut self, from: usize, to: usize) -> bool {
        let len = self.screenshots.len();
        if from >= len || to >= len {
            return false;
        }
        let selected = self.selected_index();
        let selected_id = self.screenshots.get(selected).map(|s| s.id);
        let shot = self.screenshots.remove(from);
        self.screenshots.insert(to, shot);
        if let Some(index) = selected_id.and_then(|id| self.index_of(id)) {
            self.selected_index = index;
        }
        true
    }

    /// Repair invariants that may be broken in records from disk.
    pub fn normalize(&mut self) {
        let mut seen = Vec::with_capacity(self.project_languages.len());
        for lang in self.project_languages.drain(..) {
            if !lang.is_empty() && !seen.contains(&lang) {
                seen.push(lang);
            }
        }
        self.project_languages = seen;
        if self.current_language.is_empty() {
            self.current_language = self
                .project_languages
                .first()
                .cloned()
                .unwrap_or_else(default_language);
        }
        if !self.project_languages.contains(&self.current_language) {
            self.project_languages.push(self.current_language.clone());
        }
        self.defaults.normalize();
        for shot in &mut self.screenshots {
            shot.settings.normalize();
        }
        self.selected_index();
    }

    /// Equality over user-editable content. Selection, runtime ids and
    /// decoded handles are volatile and ignored.
    pub fn same_content(&self, other: &ProjectState) -> bool {
        self.id == other.id
            && self.output_device == other.output_device
            && self.custom_width == other.custom_width
            && self.custom_height == other.custom_height
            && self.current_language == other.current_language
            && self.project_languages == other.project_languages
            && self.defaults.screenshot == other.defaults.screenshot
            && self.defaults.text == other.defaults.text
            && self.defaults.background.image_src == other.defaults.background.image_src
            && {
                let mut a = self.defaults.background.clone();
                let mut b = other.defaults.background.clone();
                a.image = None;
                b.image = None;
                a == b
            }
            && self.screenshots.len() == other.screenshots.len()
            && self
                .screenshots
                .iter()
                .zip(other.screenshots.iter())
                .all(|(a, b)| a.same_content(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_defaults() {
        let state = ProjectState::new("p1");
        assert_eq!(state.version, SCHEMA_VERSION);
        assert_eq!(state.project_languages, vec!["en".to_string()]);
        assert_eq!(state.current_language, "en");
        assert!(state.screenshots.is_empty());
    }

    #[test]
    fn test_selected_index_clamps_on_read() {
        let mut state = ProjectState::new("p1");
        state.add_screenshot("One");
        state.selected_index = 999;
        assert_eq!(state.selected_index(), 0);
        assert_eq!(state.selected_index, 0);
    }

    #[test]
    fn test_current_settings_falls_back_to_defaults() {
        let mut state = ProjectState::new("p1");
        state.current_settings().screenshot.scale = 42.0;
        assert_eq!(state.defaults.screenshot.scale, 42.0);
        assert!(state.screenshots.is_empty());
    }

    #[test]
    fn test_add_screenshot_seeds_project_languages() {
        let mut state = ProjectState::new("p1");
        state.project_languages.push("de".into());
        state.defaults.screenshot.rotation = 5.0;
        let index = state.add_screenshot("Home");
        let text = &state.screenshots[index].settings.text;
        assert_eq!(text.headline_languages, vec!["en".to_string(), "de".to_string()]);
        assert_eq!(state.screenshots[index].settings.screenshot.rotation, 5.0);
    }

    #[test]
    fn test_screenshots_get_distinct_ids() {
        let mut state = ProjectState::new("p1");
        state.add_screenshot("A");
        state.add_screenshot("B");
        state.duplicate_screenshot(0);
        let ids: Vec<_> = state.screenshots.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids[0] != ids[1] && ids[1] != ids[2] && ids[0] != ids[2]);
    }

    #[test]
    fn test_remove_screenshot_adjusts_selection() {
        let mut state = ProjectState::new("p1");
        state.add_screenshot("A");
        state.add_screenshot("B");
        state.add_screenshot("C");
        state.select(2);
        state.remove_screenshot(0);
        assert_eq!(state.selected_index(), 1);
        assert_eq!(state.screenshots[1].name, "C");
        state.remove_screenshot(1);
        assert_eq!(state.selected_index(), 0);
        assert!(state.remove_screenshot(5).is_none());
    }

    #[test]
    fn test_move_keeps_selection() {
        let mut state = ProjectState::new("p1");
        state.add_screenshot("A");
        state.add_screenshot("B");
        state.add_screenshot("C");
        state.select(0);
        assert!(state.move_screenshot(0, 2));
        assert_eq!(state.screenshots[2].name, "A");
        assert_eq!(state.selected_index(), 2);
        assert!(!state.move_screenshot(0, 3));
    }

    #[test]
    fn test_normalize_repairs_languages() {
        let mut state = ProjectState::new("p1");
        state.project_languages = vec![];
        state.current_language = "fr".into();
        state.normalize();
        assert_eq!(state.project_languages, vec!["fr".to_string()]);

        state.project_languages = vec!["de".into(), "de".into()];
        state.current_language = String::new();
        state.normalize();
        assert_eq!(state.project_languages, vec!["de".to_string()]);
        assert_eq!(state.current_language, "de");
    }

    #[test]
    fn test_output_size() {
        let mut state = ProjectState::new("p1");
        assert_eq!(state.output_size(), (1320, 2868));
        state.output_device = OutputDevice::Custom;
        state.custom_width = 800;
        state.custom_height = 600;
        assert_eq!(state.output_size(), (800, 600));
    }

    #[test]
    fn test_same_content_ignores_selection() {
        let mut a = ProjectState::new("p1");
        a.add_screenshot("A");
        a.add_screenshot("B");
        let mut b = a.clone();
        b.select(0);
        assert!(a.same_content(&b));
        b.screenshots[0].name = "Renamed".into();
        assert!(!a.same_content(&b));
    }
}
