use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use super::controllers::projects::ProjectList;
use super::controllers::uploads::{self, ConflictPrompt, DecodeFailure, UploadFile, UploadReport};
use super::domain::asset::{ImageHandle, ImageSource};
use super::domain::config::AppConfig;
use super::domain::project::{OutputDevice, ProjectMeta, ProjectState};
use super::domain::settings::{Background, BackgroundKind, SettingsKind, SettingsTree, TextField};
use super::infrastructure::error::{AppError, Result};
use super::infrastructure::platform::{
    DefaultImageDecoder, ImageDecoder, Renderer, Translator, decode_data_uri, encode_data_uri,
};
use super::infrastructure::store::ProjectStore;
use super::services::assets::{AssetLoader, LoadedScreenshot, pending_requests};
use super::services::field_path;
use super::services::history::HistoryEngine;
use super::services::localization;
use super::services::migration;
use super::services::save_scheduler::SaveScheduler;
use super::services::style;

const DEFAULT_PROJECT_NAME: &str = "My Project";

/// Decoded images of a state, keyed by their persisted source.
type HandleCache = HashMap<ImageSource, ImageHandle>;

/// A project whose on-disk record was upgraded, or could not be read at
/// all, on load. The record is not overwritten until the user confirms.
struct PendingMigration {
    original: String,
    from_version: u32,
    unreadable: bool,
    declined: bool,
}

/// Owner of the live project and everything that reacts to its changes.
///
/// All mutation goes through the setters below. Each one records a history
/// step, re-arms the save timer and notifies the renderer; structural
/// project operations write to the store immediately instead.
pub struct AppState {
    config: AppConfig,
    project: ProjectState,
    projects: ProjectList,
    store: ProjectStore,
    scheduler: SaveScheduler,
    history: HistoryEngine,
    loader: AssetLoader,
    renderer: Option<Box<dyn Renderer>>,
    translator: Option<Box<dyn Translator>>,
    migration: Option<PendingMigration>,
    decode_failures: Vec<DecodeFailure>,
}

fn handle_cache(state: &ProjectState) -> HandleCache {
    let mut cache = HandleCache::new();
    let backgrounds = std::iter::once(&state.defaults.background)
        .chain(state.screenshots.iter().map(|s| &s.settings.background));
    for background in backgrounds {
        if let (Some(src), Some(image)) = (&background.image_src, &background.image) {
            cache.insert(src.clone(), image.clone());
        }
    }
    for shot in &state.screenshots {
        for entry in shot.localized_images.values() {
            if let Some(image) = &entry.image {
                cache.insert(entry.src.clone(), image.clone());
            }
        }
    }
    cache
}

/// Give `background` its decoded image back, from the cache or by decoding
/// its source.
fn restore_background(background: &mut Background, cache: &HandleCache, decoder: &dyn ImageDecoder) -> Result<()> {
    if background.image.is_some() {
        return Ok(());
    }
    let Some(src) = &background.image_src else {
        return Ok(());
    };
    let image = match cache.get(src) {
        Some(image) => image.clone(),
        None => decode_data_uri(src.as_str()).and_then(|bytes| decoder.decode(&bytes))?,
    };
    background.image = Some(image);
    Ok(())
}

fn apply_field(
    settings: &mut SettingsTree,
    kind: SettingsKind,
    path: &str,
    value: Value,
    decoder: &dyn ImageDecoder,
) -> Result<()> {
    match kind {
        SettingsKind::Background => {
            let background = &mut settings.background;
            let image_src = background.image_src.clone();
            let image = background.image.clone();
            field_path::set_path(background, path, value)?;
            if background.image_src == image_src {
                // Keep the shared source rather than the reparsed copy.
                background.image_src = image_src;
                background.image = image;
            } else if let Err(e) = restore_background(background, &HandleCache::new(), decoder) {
                log::warn!("Background image could not be decoded: {}", e);
            }
        }
        SettingsKind::Screenshot => field_path::set_path(&mut settings.screenshot, path, value)?,
        SettingsKind::Text => field_path::set_path(&mut settings.text, path, value)?,
    }
    settings.normalize();
    Ok(())
}

fn field_label(field: TextField) -> &'static str {
    match field {
        TextField::Headline => "headline",
        TextField::Subheadline => "subheadline",
    }
}

impl AppState {
    /// Open the configured store with the default decoder.
    pub fn open(config: AppConfig) -> Self {
        let store = ProjectStore::open(&config.resolved_store_path());
        Self::new(config, store, Arc::new(DefaultImageDecoder))
    }

    /// Load the project list and the active project from `store`, creating
    /// a first project when there is none. Store errors are logged and the
    /// app starts with what could be read.
    pub fn new(config: AppConfig, store: ProjectStore, decoder: Arc<dyn ImageDecoder>) -> Self {
        let list = store.load_project_list().unwrap_or_else(|e| {
            log::error!("Could not read the project list: {}", e);
            Vec::new()
        });
        let active = store.current_project().unwrap_or_else(|e| {
            log::error!("Could not read the active project: {}", e);
            None
        });

        let mut state = Self {
            project: ProjectState::new(""),
            projects: ProjectList::new(list, active),
            store,
            scheduler: SaveScheduler::new(config.save_debounce()),
            history: HistoryEngine::new(config.max_history),
            loader: AssetLoader::new(decoder),
            renderer: None,
            translator: None,
            migration: None,
            decode_failures: Vec::new(),
            config,
        };

        if state.projects.is_empty() {
            if let Err(e) = state.bootstrap_project() {
                log::error!("Could not create the first project: {}", e);
            }
        }
        if let Some(id) = state.projects.active_id().map(str::to_string) {
            state.load_into_memory(&id);
        }
        state
    }

    fn bootstrap_project(&mut self) -> Result<()> {
        let meta = self.projects.create(DEFAULT_PROJECT_NAME)?;
        self.projects.set_active(&meta.id)?;
        if let Err(e) = self.store.save_project(&ProjectState::new(&meta.id)) {
            log::error!("Failed to save project {}: {}", meta.id, e);
        }
        self.persist_project_list();
        log::info!("Created first project {}", meta.id);
        Ok(())
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = Some(renderer);
        self.notify_renderer();
    }

    pub fn set_translator(&mut self, translator: Box<dyn Translator>) {
        self.translator = Some(translator);
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn project(&self) -> &ProjectState {
        &self.project
    }

    pub fn projects(&self) -> &[ProjectMeta] {
        self.projects.projects()
    }

    pub fn active_project_id(&self) -> &str {
        &self.project.id
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryEngine {
        &self.history
    }

    /// Selected index, clamped into range.
    pub fn selected_index(&mut self) -> usize {
        self.project.selected_index()
    }

    /// Settings of the selected screenshot, or the defaults when the project
    /// has no screenshots.
    pub fn current_settings(&mut self) -> &SettingsTree {
        self.project.current_settings()
    }

    /// Edit the current settings in place as one undoable step.
    pub fn edit_current<R>(&mut self, label: &str, edit: impl FnOnce(&mut SettingsTree) -> R) -> R {
        let settings = self.project.current_settings();
        let result = edit(settings);
        settings.normalize();
        self.commit(label);
        result
    }

    pub fn get_field(&mut self, kind: SettingsKind, path: &str) -> Option<Value> {
        let settings = self.project.current_settings();
        match kind {
            SettingsKind::Background => field_path::get_path(&settings.background, path),
            SettingsKind::Screenshot => field_path::get_path(&settings.screenshot, path),
            SettingsKind::Text => field_path::get_path(&settings.text, path),
        }
    }

    /// Write one field of the current settings, e.g.
    /// `set_field(SettingsKind::Screenshot, "shadow.blur", json!(20))`.
    /// With no screenshots this edits the defaults; it never creates one.
    pub fn set_field(&mut self, kind: SettingsKind, path: &str, value: Value) -> Result<()> {
        let settings = self.project.current_settings();
        apply_field(settings, kind, path, value, self.loader.decoder())?;
        self.commit(&format!("Change {}", kind.key()));
        Ok(())
    }

    /// Like [`set_field`](Self::set_field) for a specific screenshot.
    /// Returns `Ok(false)` when there is no screenshot at `index`.
    pub fn set_screenshot_field(&mut self, index: usize, kind: SettingsKind, path: &str, value: Value) -> Result<bool> {
        let Some(shot) = self.project.screenshots.get_mut(index) else {
            return Ok(false);
        };
        apply_field(&mut shot.settings, kind, path, value, self.loader.decoder())?;
        self.commit(&format!("Change {}", kind.key()));
        Ok(true)
    }

    pub fn set_default_field(&mut self, kind: SettingsKind, path: &str, value: Value) -> Result<()> {
        apply_field(&mut self.project.defaults, kind, path, value, self.loader.decoder())?;
        self.commit("Change defaults");
        Ok(())
    }

    pub fn set_background_image(&mut self, bytes: &[u8]) -> Result<()> {
        let image = self.loader.decoder().decode(bytes)?;
        let background = &mut self.project.current_settings().background;
        background.image = Some(image);
        background.image_src = Some(encode_data_uri(bytes).into());
        background.kind = BackgroundKind::Image;
        self.commit("Set background image");
        Ok(())
    }

    pub fn set_headline(&mut self, text: &str) {
        self.set_text(TextField::Headline, text);
    }

    pub fn set_subheadline(&mut self, text: &str) {
        self.set_text(TextField::Subheadline, text);
    }

    fn set_text(&mut self, field: TextField, text: &str) {
        let lang = self.project.current_language.clone();
        self.project.current_settings().text.set_text(field, &lang, text);
        self.commit(&format!("Edit {}", field_label(field)));
    }

    pub fn set_output_device(&mut self, device: OutputDevice) {
        self.project.output_device = device;
        self.commit("Change output size");
    }

    pub fn set_custom_size(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(AppError::Settings(format!("invalid output size {}x{}", width, height)));
        }
        self.project.custom_width = width;
        self.project.custom_height = height;
        self.commit("Change output size");
        Ok(())
    }

    // Screenshots

    pub fn add_screenshot(&mut self, name: &str) -> usize {
        let index = self.project.add_screenshot(name);
        self.commit("Add screenshot");
        index
    }

    /// Remove a screenshot and cancel its pending image loads.
    pub fn remove_screenshot(&mut self, index: usize) -> bool {
        let Some(removed) = self.project.remove_screenshot(index) else {
            return false;
        };
        self.loader.cancel(removed.id);
        self.commit("Delete screenshot");
        true
    }

    pub fn duplicate_screenshot(&mut self, index: usize) -> Option<usize> {
        let copy = self.project.duplicate_screenshot(index)?;
        let cache = handle_cache(&self.project);
        self.reattach_assets(&cache);
        self.commit("Duplicate screenshot");
        Some(copy)
    }

    pub fn move_screenshot(&mut self, from: usize, to: usize) -> bool {
        if !self.project.move_screenshot(from, to) {
            return false;
        }
        self.commit("Reorder screenshots");
        true
    }

    pub fn rename_screenshot(&mut self, index: usize, name: &str) -> bool {
        let Some(shot) = self.project.screenshots.get_mut(index) else {
            return false;
        };
        shot.name = name.to_string();
        self.commit("Rename screenshot");
        true
    }

    /// Select a screenshot; out-of-range indices are clamped. Selection is
    /// persisted but is not an undo step.
    pub fn select(&mut self, index: usize) -> usize {
        let selected = self.project.select(index);
        self.schedule_save();
        self.notify_renderer();
        selected
    }

    // Style

    pub fn transfer_style(&mut self, source: usize, target: usize) -> bool {
        if !style::transfer_style(&mut self.project.screenshots, source, target) {
            return false;
        }
        self.commit("Copy style");
        true
    }

    pub fn apply_style_to_all(&mut self, source: usize) -> usize {
        let updated = style::apply_style_to_all(&mut self.project.screenshots, source);
        if updated > 0 {
            self.commit("Apply style to all");
        }
        updated
    }

    // Languages

    pub fn add_language(&mut self, lang: &str) -> Result<bool> {
        let added = localization::add_language(&mut self.project, lang)?;
        if added {
            self.commit("Add language");
        }
        Ok(added)
    }

    /// Refused with [`AppError::Language`] when `lang` is the only language.
    pub fn remove_language(&mut self, lang: &str) -> Result<bool> {
        let removed = localization::remove_language(&mut self.project, lang)?;
        if removed {
            self.commit("Remove language");
        }
        Ok(removed)
    }

    pub fn set_current_language(&mut self, lang: &str) -> Result<()> {
        localization::set_current_language(&mut self.project, lang)?;
        self.commit("Switch language");
        Ok(())
    }

    pub fn is_complete(&self, index: usize) -> bool {
        self.project
            .screenshots
            .get(index)
            .is_some_and(|shot| localization::is_complete(shot, &self.project.project_languages))
    }

    /// Screenshots lacking an image for some project language, with the
    /// languages they lack.
    pub fn missing_images(&self) -> Vec<(usize, Vec<String>)> {
        self.project
            .screenshots
            .iter()
            .enumerate()
            .filter_map(|(index, shot)| {
                let missing = localization::missing_languages(shot, &self.project.project_languages);
                (!missing.is_empty()).then_some((index, missing))
            })
            .collect()
    }

    /// Translate the current settings' `field` from `source_lang` into every
    /// other project language. Returns how many languages were written.
    pub fn translate_text(&mut self, field: TextField, source_lang: &str) -> Result<usize> {
        let translator = self
            .translator
            .as_deref()
            .ok_or_else(|| AppError::Translation("no translation provider configured".to_string()))?;
        let targets: Vec<String> = self
            .project
            .project_languages
            .iter()
            .filter(|lang| lang.as_str() != source_lang)
            .cloned()
            .collect();
        if targets.is_empty() {
            return Ok(0);
        }

        let settings = self.project.current_settings();
        let source = settings.text.text(field, source_lang).to_string();
        if source.trim().is_empty() {
            return Err(AppError::Translation(format!(
                "no {} text in '{}' to translate",
                field_label(field),
                source_lang
            )));
        }
        let translated = translator.translate_batch(source_lang, &targets, &[source])?;

        let mut written = 0;
        for lang in &targets {
            match translated.get(lang).and_then(|texts| texts.first()) {
                Some(text) => {
                    settings.text.set_text(field, lang, text);
                    written += 1;
                }
                None => log::warn!("Translation provider returned nothing for '{}'", lang),
            }
        }
        if written > 0 {
            self.commit(&format!("Translate {}", field_label(field)));
        }
        Ok(written)
    }

    // Uploads and assets

    /// Route uploaded files into screenshots. Files that fail to decode are
    /// listed in the report and in [`decode_failures`](Self::decode_failures).
    pub fn upload_files(&mut self, files: &[UploadFile], prompt: &mut dyn ConflictPrompt) -> Result<UploadReport> {
        let report = uploads::apply_uploads(
            &mut self.project,
            self.loader.decoder(),
            files,
            &self.config.fallback_language,
            prompt,
        )?;
        self.decode_failures.extend(report.failures.iter().cloned());
        if report.changed() {
            self.commit("Upload images");
        }
        Ok(report)
    }

    pub fn decode_failures(&self) -> &[DecodeFailure] {
        &self.decode_failures
    }

    pub fn take_decode_failures(&mut self) -> Vec<DecodeFailure> {
        std::mem::take(&mut self.decode_failures)
    }

    /// Apply image batches that finished decoding. Returns how many
    /// screenshots became ready.
    pub fn poll_assets(&mut self) -> usize {
        let done = self.loader.poll();
        let count = done.len();
        for loaded in done {
            self.apply_loaded(loaded);
        }
        count
    }

    /// Block until every pending image batch has been applied.
    pub fn wait_for_assets(&mut self) -> usize {
        let done = self.loader.wait();
        let count = done.len();
        for loaded in done {
            self.apply_loaded(loaded);
        }
        count
    }

    fn apply_loaded(&mut self, loaded: LoadedScreenshot) {
        let current = self.project.current_language.clone();
        let Some(shot) = self.project.screenshot_mut(loaded.screenshot_id) else {
            return;
        };
        for (lang, result) in loaded.results {
            let Some(entry) = shot.localized_images.get_mut(&lang) else {
                continue;
            };
            match result {
                Ok(image) if entry.image.is_none() => entry.image = Some(image),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Could not decode '{}' image of {}: {}", lang, shot.name, e);
                    self.decode_failures.push(DecodeFailure {
                        filename: entry.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        shot.loading = false;
        shot.sync_legacy_image(&current);
        self.notify_renderer();
    }

    /// Restore decoded images after the state was replaced: reuse handles
    /// from `cache`, decode background images, and start loads for
    /// localized images that are still missing.
    fn reattach_assets(&mut self, cache: &HandleCache) {
        let current = self.project.current_language.clone();
        let decoder = self.loader.decoder();
        let backgrounds = std::iter::once(&mut self.project.defaults.background)
            .chain(self.project.screenshots.iter_mut().map(|s| &mut s.settings.background));
        for background in backgrounds {
            if let Err(e) = restore_background(background, cache, decoder) {
                log::warn!("Background image could not be decoded: {}", e);
                self.decode_failures.push(DecodeFailure {
                    filename: "background".to_string(),
                    message: e.to_string(),
                });
            }
        }

        for shot in &mut self.project.screenshots {
            for entry in shot.localized_images.values_mut() {
                if entry.image.is_none() {
                    entry.image = cache.get(&entry.src).cloned();
                }
            }
            let requests = pending_requests(shot);
            if !requests.is_empty() && !self.loader.is_loading(shot.id) {
                self.loader.spawn(shot.id, requests);
            }
            shot.loading = self.loader.is_loading(shot.id);
            shot.sync_legacy_image(&current);
        }
    }

    fn notify_renderer(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let index = self.project.selected_index();
        if let Some(shot) = self.project.screenshots.get(index) {
            if shot.is_ready() {
                renderer.render(shot, &self.project.current_language);
            } else {
                log::debug!("Skipped render of {} while its images load", shot.name);
            }
        }
    }

    // History

    fn commit(&mut self, label: &str) {
        self.history.record(&self.project, label);
        self.schedule_save();
        self.notify_renderer();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    pub fn undo(&mut self) -> bool {
        let Some(state) = self.history.undo().cloned() else {
            return false;
        };
        self.restore_snapshot(state);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(state) = self.history.redo().cloned() else {
            return false;
        };
        self.restore_snapshot(state);
        true
    }

    fn restore_snapshot(&mut self, state: ProjectState) {
        let cache = handle_cache(&self.project);
        for shot in &self.project.screenshots {
            if state.index_of(shot.id).is_none() {
                self.loader.cancel(shot.id);
            }
        }
        self.project = state;
        self.reattach_assets(&cache);
        self.schedule_save();
        self.notify_renderer();
    }

    // Persistence

    /// Re-arm the debounce timer for the active project.
    pub fn schedule_save(&mut self) {
        self.scheduler.schedule(&self.project.id, Instant::now());
    }

    pub fn save_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn next_save_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    /// Drive background work: apply finished image loads and perform the
    /// debounced write once its quiet period has passed. Returns true when
    /// a write happened.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.poll_assets();
        match self.scheduler.take_due(now) {
            Some(id) if id == self.project.id => self.write_current(),
            Some(id) => {
                log::debug!("Dropped stale save for project {}", id);
                false
            }
            None => false,
        }
    }

    /// Write the active project now, cancelling any pending debounced write.
    pub fn save_now(&mut self) -> bool {
        self.scheduler.cancel_for(&self.project.id);
        self.write_current()
    }

    fn write_current(&mut self) -> bool {
        if self.migration.is_some() {
            log::debug!("Write for project {} held until its migration is confirmed", self.project.id);
            return false;
        }
        match self.store.save_project(&self.project) {
            Ok(()) => {
                self.projects
                    .set_screenshot_count(&self.project.id, self.project.screenshots.len());
                true
            }
            Err(e) => {
                log::error!("Failed to save project {}: {}", self.project.id, e);
                false
            }
        }
    }

    fn persist_project_list(&mut self) {
        if let Err(e) = self.store.save_project_list(self.projects.projects()) {
            log::error!("Failed to save the project list: {}", e);
        }
        if let Some(id) = self.projects.active_id() {
            if let Err(e) = self.store.set_current_project(id) {
                log::error!("Failed to save the active project: {}", e);
            }
        }
    }

    /// Flush pending work before exit.
    pub fn shutdown(&mut self) {
        self.save_now();
        self.loader.cancel_all();
    }

    // Migration

    /// True when the active project was upgraded on load and the user has
    /// not yet been asked about it.
    pub fn migration_prompt_due(&self) -> bool {
        self.migration.as_ref().is_some_and(|m| !m.declined)
    }

    /// Schema version the active project had on disk, while its upgrade is
    /// still unconfirmed.
    pub fn migrated_from(&self) -> Option<u32> {
        self.migration.as_ref().map(|m| m.from_version)
    }

    /// True when the active project's stored record could not be read and
    /// the project was opened empty.
    pub fn record_unreadable(&self) -> bool {
        self.migration.as_ref().is_some_and(|m| m.unreadable)
    }

    /// Overwrite the legacy record with the upgraded one, keeping a backup
    /// of the legacy JSON.
    pub fn confirm_migration(&mut self) -> Result<()> {
        let Some(pending) = self.migration.take() else {
            return Ok(());
        };
        if let Err(e) = self.store.save_migrated_project(&self.project, &pending.original) {
            self.migration = Some(pending);
            return Err(e);
        }
        self.scheduler.cancel_for(&self.project.id);
        log::info!(
            "Saved project {} in the current format (was v{})",
            self.project.id,
            pending.from_version
        );
        Ok(())
    }

    /// Keep the legacy record. Edits stay in memory for this session.
    pub fn decline_migration(&mut self) {
        if let Some(pending) = &mut self.migration {
            pending.declined = true;
            log::info!("Migration of project {} declined; changes will not be saved", self.project.id);
        }
    }

    // Projects

    fn load_into_memory(&mut self, id: &str) {
        self.loader.cancel_all();
        self.migration = None;
        self.decode_failures.clear();

        let loaded = match self.store.load_project(id, &self.config.fallback_language) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("Could not read project {}: {}; starting empty", id, e);
                self.hold_unreadable_record(id);
                None
            }
        };
        self.project = match loaded {
            Some(loaded) => {
                if let Some(original) = loaded.original {
                    log::info!(
                        "Project {} upgraded from schema v{}; stored record kept until confirmed",
                        id,
                        loaded.record.from_version
                    );
                    self.migration = Some(PendingMigration {
                        original,
                        from_version: loaded.record.from_version,
                        unreadable: false,
                        declined: false,
                    });
                }
                loaded.record.state
            }
            None => ProjectState::new(id),
        };
        self.projects.set_screenshot_count(id, self.project.screenshots.len());
        self.reattach_assets(&HandleCache::new());
        self.history.reset(&self.project);
        self.notify_renderer();
    }

    /// Keep a record that failed to load exactly as stored. It is backed up
    /// and replaced only through [`confirm_migration`](Self::confirm_migration).
    fn hold_unreadable_record(&mut self, id: &str) {
        match self.store.load_raw(id) {
            Ok(Some(original)) => {
                let from_version = serde_json::from_str::<Value>(&original)
                    .map(|raw| migration::record_version(&raw))
                    .unwrap_or(0);
                self.migration = Some(PendingMigration {
                    original,
                    from_version,
                    unreadable: true,
                    declined: false,
                });
            }
            Ok(None) => {}
            Err(e) => log::error!("Could not keep the record of project {}: {}", id, e),
        }
    }

    /// Warn before the live copy of a project with an unconfirmed migration
    /// is dropped.
    fn warn_unsaved_migration(&self) {
        if self.migration.is_some() {
            log::warn!("Leaving project {} without saving its unconfirmed migration", self.project.id);
        }
    }

    /// Create a project and switch to it. Returns its id.
    pub fn create_project(&mut self, name: &str) -> Result<String> {
        let meta = self.projects.create(name)?;
        self.warn_unsaved_migration();
        self.save_now();
        if let Err(e) = self.store.save_project(&ProjectState::new(&meta.id)) {
            log::error!("Failed to save project {}: {}", meta.id, e);
        }
        self.projects.set_active(&meta.id)?;
        self.persist_project_list();
        self.load_into_memory(&meta.id);
        log::info!("Created project {} ({})", meta.name, meta.id);
        Ok(meta.id)
    }

    pub fn rename_project(&mut self, id: &str, name: &str) -> Result<()> {
        self.projects.rename(id, name)?;
        self.persist_project_list();
        Ok(())
    }

    /// Delete a project. The last remaining project cannot be deleted. A
    /// pending debounced write for it is dropped, and deleting the active
    /// project cancels its image loads and switches to a neighbour.
    pub fn delete_project(&mut self, id: &str) -> Result<()> {
        let was_active = self.project.id == id;
        self.projects.remove(id)?;
        if was_active {
            self.warn_unsaved_migration();
        }
        if self.scheduler.cancel_for(id) {
            log::info!("Dropped pending save for deleted project {}", id);
        }
        if let Err(e) = self.store.delete_project(id) {
            log::error!("Failed to delete project {}: {}", id, e);
        }
        self.persist_project_list();
        if was_active {
            if let Some(next) = self.projects.active_id().map(str::to_string) {
                self.load_into_memory(&next);
            }
        }
        log::info!("Deleted project {}", id);
        Ok(())
    }

    /// Save the active project and replace it with `id`. History does not
    /// carry over.
    pub fn switch_project(&mut self, id: &str) -> Result<()> {
        if !self.projects.contains(id) {
            return Err(AppError::Project(format!("unknown project '{}'", id)));
        }
        if self.project.id == id {
            return Ok(());
        }
        self.warn_unsaved_migration();
        self.save_now();
        self.projects.set_active(id)?;
        self.persist_project_list();
        self.load_into_memory(id);
        Ok(())
    }

    /// Copy a project under a new name without switching to it.
    pub fn duplicate_project(&mut self, id: &str, name: &str) -> Result<String> {
        if !self.projects.contains(id) {
            return Err(AppError::Project(format!("unknown project '{}'", id)));
        }
        let mut copy = if self.project.id == id {
            self.save_now();
            self.project.clone()
        } else {
            match self.store.load_project(id, &self.config.fallback_language)? {
                Some(loaded) => loaded.record.state,
                None => ProjectState::new(id),
            }
        };
        let meta = self.projects.create(name)?;
        copy.id = meta.id.clone();
        self.projects.set_screenshot_count(&meta.id, copy.screenshots.len());
        if let Err(e) = self.store.save_project(&copy) {
            log::error!("Failed to save project {}: {}", meta.id, e);
        }
        self.persist_project_list();
        Ok(meta.id)
    }
}
