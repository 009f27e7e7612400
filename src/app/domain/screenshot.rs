use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::asset::{ImageHandle, ImageSource, LocalizedImage};
use super::settings::SettingsTree;

/// Runtime identity of a screenshot. Indices shift on reorder and delete;
/// ids do not, so background work is addressed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScreenshotId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeviceType {
    #[default]
    #[serde(rename = "iPhone")]
    Iphone,
    #[serde(rename = "iPad")]
    Ipad,
}

impl DeviceType {
    /// Tablets are noticeably squarer than phones: an iPad portrait capture is
    /// about 0.75 wide-to-high, an iPhone capture about 0.46.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height == 0 {
            return Self::Iphone;
        }
        let ratio = width.min(height) as f32 / width.max(height) as f32;
        if ratio > 0.6 { Self::Ipad } else { Self::Iphone }
    }
}

/// One slide of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    #[serde(skip)]
    pub id: ScreenshotId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device_type: DeviceType,
    /// Legacy single-image mirror of the current language's entry.
    #[serde(skip)]
    pub image: Option<ImageHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<ImageSource>,
    #[serde(default)]
    pub localized_images: BTreeMap<String, LocalizedImage>,
    #[serde(flatten)]
    pub settings: SettingsTree,
    /// Pre-localization per-slide override bag, carried through untouched.
    #[serde(default)]
    pub overrides: Map<String, Value>,
    /// True while localized images are still being decoded.
    #[serde(skip)]
    pub loading: bool,
}

impl Screenshot {
    pub fn new(id: ScreenshotId, name: &str, defaults: &SettingsTree) -> Self {
        Self {
            id,
            name: name.to_string(),
            device_type: DeviceType::default(),
            image: None,
            src: None,
            localized_images: BTreeMap::new(),
            settings: defaults.clone(),
            overrides: Map::new(),
            loading: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.loading
    }

    /// Insert or replace the variant for `lang`. The device type follows the
    /// first decoded image.
    pub fn set_localized_image(&mut self, lang: &str, entry: LocalizedImage) {
        if self.localized_images.is_empty() {
            if let Some(handle) = &entry.image {
                self.device_type = DeviceType::from_dimensions(handle.width(), handle.height());
            }
        }
        self.localized_images.insert(lang.to_string(), entry);
    }

    /// Point the legacy single-image fields at the entry for `lang`, if any.
    pub fn sync_legacy_image(&mut self, lang: &str) {
        if let Some(entry) = self.localized_images.get(lang) {
            self.image = entry.image.clone();
            self.src = Some(entry.src.clone());
        }
    }

    /// Equality over everything a user edits; ids, load state and decoded
    /// handles are ignored.
    pub fn same_content(&self, other: &Screenshot) -> bool {
        self.name == other.name
            && self.device_type == other.device_type
            && self.src == other.src
            && self.settings.background.image_src == other.settings.background.image_src
            && self.overrides == other.overrides
            && self.localized_images.len() == other.localized_images.len()
            && self
                .localized_images
                .iter()
                .zip(other.localized_images.iter())
                .all(|((la, a), (lb, b))| la == lb && a.src == b.src && a.name == b.name)
            && same_settings(&self.settings, &other.settings)
    }
}

fn same_settings(a: &SettingsTree, b: &SettingsTree) -> bool {
    // Background::eq compares handles by identity; drop them for content checks.
    let mut bg_a = a.background.clone();
    let mut bg_b = b.background.clone();
    bg_a.image = None;
    bg_b.image = None;
    bg_a == bg_b && a.screenshot == b.screenshot && a.text == b.text
}
