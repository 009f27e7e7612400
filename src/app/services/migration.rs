//! Upgrade persisted project records to the current schema.
//!
//! Records carry a `version` tag. Untagged records are version 0: the flat
//! format with `background`/`screenshot`/`text` at the top level and
//! screenshots that may have no settings of their own. Version 1 has
//! per-screenshot settings but single-image screenshots and single-string
//! headlines. Version 2 is the localized format.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::app::domain::asset::LocalizedImage;
use crate::app::domain::project::{ProjectState, SCHEMA_VERSION};
use crate::app::domain::screenshot::Screenshot;
use crate::app::domain::settings::{Background, DeviceTransform, SettingsKind, SettingsTree, TextBlock};
use crate::app::infrastructure::error::Result;
use crate::app::services::localization::parse_language_suffix;

/// A record read from the store, ready to become the live project state.
#[derive(Debug)]
pub struct UpgradedRecord {
    pub state: ProjectState,
    /// Version the record had on disk.
    pub from_version: u32,
}

impl UpgradedRecord {
    pub fn migrated(&self) -> bool {
        self.from_version < SCHEMA_VERSION
    }
}

/// Version tag of a raw record. Tags too large for `u32` count as newer
/// than any schema this build knows.
pub fn record_version(raw: &Value) -> u32 {
    raw.get("version")
        .and_then(Value::as_u64)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Parse and upgrade a stored record. Unknown or malformed settings fall back
/// to schema defaults rather than failing the load.
pub fn upgrade_record(mut raw: Value, project_id: &str, fallback_language: &str) -> Result<UpgradedRecord> {
    let from_version = record_version(&raw);
    if from_version > SCHEMA_VERSION {
        log::warn!(
            "Project {} was written by a newer schema (v{}); loading what this build understands",
            project_id,
            from_version
        );
    }

    let mut version = from_version;
    while version < SCHEMA_VERSION {
        match version {
            0 => migrate_v0_to_v1(&mut raw),
            1 => migrate_v1_to_v2(&mut raw, fallback_language),
            _ => unreachable!("no migration step from v{}", version),
        }
        version += 1;
    }
    if from_version < SCHEMA_VERSION {
        log::info!("Migrated project {} from schema v{} to v{}", project_id, from_version, SCHEMA_VERSION);
    }

    repair_record(&mut raw, project_id);
    let mut state: ProjectState = serde_json::from_value(raw)?;
    if state.id.is_empty() {
        state.id = project_id.to_string();
    }
    state.version = SCHEMA_VERSION;
    state.normalize();
    state.assign_ids();
    Ok(UpgradedRecord { state, from_version })
}

/// Serialize a project for the store. Decoded handles are dropped by the
/// serde attributes; sources and filenames are kept.
pub fn serialize_record(state: &ProjectState) -> Result<String> {
    let mut value = serde_json::to_value(state)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("version".to_string(), json!(SCHEMA_VERSION));
    }
    Ok(serde_json::to_string(&value)?)
}

/// Deserialize one settings branch onto schema defaults; garbage becomes the
/// default with a warning.
fn settings_or_default<T>(value: Option<&Value>, what: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match value {
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            log::warn!("Discarding unreadable legacy {} settings: {}", what, e);
            T::default()
        }),
        None => T::default(),
    }
}

/// Drop the fields of `value` that do not deserialize as part of `T`,
/// keeping the rest. Every field of `T` must have a default.
fn retain_readable<T: DeserializeOwned>(value: &mut Value, what: &str) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    if serde_json::from_value::<T>(Value::Object(obj.clone())).is_ok() {
        return;
    }
    obj.retain(|key, field| {
        let mut single = Map::new();
        single.insert(key.clone(), field.clone());
        match serde_json::from_value::<T>(Value::Object(single)) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Discarding unreadable {} field '{}': {}", what, key, e);
                false
            }
        }
    });
}

fn repair_settings(settings: &mut Map<String, Value>) {
    if let Some(v) = settings.get_mut("background") {
        retain_readable::<Background>(v, "background");
    }
    if let Some(v) = settings.get_mut("screenshot") {
        retain_readable::<DeviceTransform>(v, "screenshot");
    }
    if let Some(v) = settings.get_mut("text") {
        retain_readable::<TextBlock>(v, "text");
    }
}

/// Replace every unreadable value in an upgraded record with its schema
/// default, field by field, so one bad value never costs the whole project.
fn repair_record(raw: &mut Value, project_id: &str) {
    let Some(obj) = raw.as_object_mut() else {
        return;
    };

    if let Some(defaults) = obj.get_mut("defaults") {
        if let Some(map) = defaults.as_object_mut() {
            repair_settings(map);
        }
        retain_readable::<SettingsTree>(defaults, "defaults");
    }

    if let Some(shots) = obj.get_mut("screenshots").and_then(Value::as_array_mut) {
        let before = shots.len();
        shots.retain(Value::is_object);
        if shots.len() < before {
            log::warn!("Project {}: dropped {} unreadable screenshot(s)", project_id, before - shots.len());
        }
        for shot in shots.iter_mut() {
            if let Some(map) = shot.as_object_mut() {
                repair_settings(map);
                if let Some(images) = map.get_mut("localizedImages").and_then(Value::as_object_mut) {
                    images.retain(|_, entry| entry.is_object());
                    for entry in images.values_mut() {
                        retain_readable::<LocalizedImage>(entry, "image");
                    }
                }
            }
            retain_readable::<Screenshot>(shot, "screenshot");
        }
    }

    retain_readable::<ProjectState>(raw, "project");
}

fn to_value_or_null<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Flat top-level settings become `defaults`; screenshots without their own
/// branches get a copy of them.
fn migrate_v0_to_v1(raw: &mut Value) {
    if !raw.is_object() {
        *raw = json!({});
    }
    let Some(obj) = raw.as_object_mut() else {
        return;
    };

    let legacy_defaults = obj.remove("defaults");
    let legacy_bg = obj.remove("background");
    let legacy_transform = obj.remove("screenshot");
    let legacy_text = obj.remove("text");

    let source = |kind: SettingsKind| -> Option<Value> {
        legacy_defaults
            .as_ref()
            .and_then(|d| d.get(kind.key()).cloned())
            .or_else(|| match kind {
                SettingsKind::Background => legacy_bg.clone(),
                SettingsKind::Screenshot => legacy_transform.clone(),
                SettingsKind::Text => legacy_text.clone(),
            })
    };

    let mut defaults = Map::new();
    defaults.insert(
        "background".to_string(),
        to_value_or_null(&settings_or_default::<Background>(source(SettingsKind::Background).as_ref(), "background")),
    );
    defaults.insert(
        "screenshot".to_string(),
        to_value_or_null(&settings_or_default::<DeviceTransform>(source(SettingsKind::Screenshot).as_ref(), "screenshot")),
    );
    // Text stays raw here; the v1 -> v2 step rewrites single-string headlines.
    defaults.insert(
        "text".to_string(),
        source(SettingsKind::Text).unwrap_or_else(|| to_value_or_null(&TextBlock::default())),
    );

    if let Some(shots) = obj.get_mut("screenshots").and_then(Value::as_array_mut) {
        for shot in shots.iter_mut() {
            let Some(shot) = shot.as_object_mut() else {
                continue;
            };
            for kind in SettingsKind::all() {
                let missing = shot.get(kind.key()).is_none_or(Value::is_null);
                if missing {
                    shot.insert(kind.key().to_string(), defaults[kind.key()].clone());
                }
            }
        }
    }

    obj.insert("defaults".to_string(), Value::Object(defaults));
    obj.insert("version".to_string(), json!(1));
}

/// Single images move into the localized image map; single-string
/// headlines become per-language maps.
fn migrate_v1_to_v2(raw: &mut Value, fallback_language: &str) {
    let Some(obj) = raw.as_object_mut() else {
        return;
    };
    let current = obj
        .get("currentLanguage")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback_language)
        .to_string();

    if let Some(text) = obj.get_mut("defaults").and_then(|d| d.get_mut("text")) {
        upgrade_text(text, &current);
    }

    let mut used_languages: Vec<String> = Vec::new();
    if let Some(shots) = obj.get_mut("screenshots").and_then(Value::as_array_mut) {
        for shot in shots.iter_mut() {
            let Some(shot) = shot.as_object_mut() else {
                continue;
            };
            if let Some(text) = shot.get_mut("text") {
                upgrade_text(text, &current);
            }

            let has_localized = shot
                .get("localizedImages")
                .and_then(Value::as_object)
                .is_some_and(|m| !m.is_empty());
            let legacy_src = shot
                .get("src")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            if has_localized {
                continue;
            }
            if let Some(src) = legacy_src {
                let name = shot
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let lang = parse_language_suffix(&name).unwrap_or_else(|| current.clone());
                if !used_languages.contains(&lang) {
                    used_languages.push(lang.clone());
                }
                let mut images = Map::new();
                images.insert(lang, json!({ "src": src, "name": name }));
                shot.insert("localizedImages".to_string(), Value::Object(images));
            }
        }
    }

    let languages = obj
        .entry("projectLanguages")
        .or_insert_with(|| json!([]));
    if let Some(list) = languages.as_array_mut() {
        for lang in std::iter::once(current.clone()).chain(used_languages) {
            if !list.iter().any(|l| l.as_str() == Some(lang.as_str())) {
                list.push(json!(lang));
            }
        }
    }
    obj.entry("currentLanguage").or_insert_with(|| json!(current));
    obj.insert("version".to_string(), json!(2));
}

fn upgrade_text(text: &mut Value, lang: &str) {
    let Some(text) = text.as_object_mut() else {
        return;
    };
    for (single, map, list, current) in [
        ("headline", "headlines", "headlineLanguages", "currentHeadlineLang"),
        ("subheadline", "subheadlines", "subheadlineLanguages", "currentSubheadlineLang"),
    ] {
        let legacy = text.remove(single);
        if text.get(map).is_some_and(Value::is_object) {
            continue;
        }
        let value = legacy
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut strings = Map::new();
        strings.insert(lang.to_string(), Value::String(value));
        text.insert(map.to_string(), Value::Object(strings));
        text.insert(list.to_string(), json!([lang]));
        text.insert(current.to_string(), json!(lang));
    }
}
