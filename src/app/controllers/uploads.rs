//! Routing of uploaded images into screenshots.
//!
//! A file whose base name matches an existing screenshot becomes a language
//! variant of it; anything else starts a new screenshot. When the variant
//! slot is already taken the caller is asked what to do.

use rayon::prelude::*;

use crate::app::domain::asset::{ImageHandle, LocalizedImage};
use crate::app::domain::project::ProjectState;
use crate::app::infrastructure::error::Result;
use crate::app::infrastructure::platform::{ImageDecoder, encode_data_uri};
use crate::app::services::localization;

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPlan {
    NewScreenshot { lang: String },
    AddVariant { index: usize, lang: String },
    /// `index` already has an image for `lang`.
    Conflict { index: usize, lang: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Replace,
    CreateNew,
    Ignore,
}

/// Asks the user how to resolve a variant that already exists.
pub trait ConflictPrompt {
    fn choose(&mut self, filename: &str, screenshot_name: &str, lang: &str) -> ConflictChoice;
}

impl<F> ConflictPrompt for F
where
    F: FnMut(&str, &str, &str) -> ConflictChoice,
{
    fn choose(&mut self, filename: &str, screenshot_name: &str, lang: &str) -> ConflictChoice {
        self(filename, screenshot_name, lang)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFailure {
    pub filename: String,
    pub message: String,
}

/// What happened to each file of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    /// Indices of screenshots created by the batch.
    pub created: Vec<usize>,
    /// (screenshot index, language) of variants added or replaced.
    pub variants: Vec<(usize, String)>,
    pub ignored: Vec<String>,
    pub failures: Vec<DecodeFailure>,
}

impl UploadReport {
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.variants.is_empty()
    }
}

/// Decide where `filename` goes in `state`.
pub fn plan_upload(state: &ProjectState, filename: &str, fallback_language: &str) -> UploadPlan {
    let lang = localization::detect_language(filename, fallback_language);
    match localization::find_variant_target(state, filename) {
        Some(index) if state.screenshots[index].localized_images.contains_key(&lang) => {
            UploadPlan::Conflict { index, lang }
        }
        Some(index) => UploadPlan::AddVariant { index, lang },
        None => UploadPlan::NewScreenshot { lang },
    }
}

fn entry_for(file: &UploadFile, image: ImageHandle) -> LocalizedImage {
    LocalizedImage::new(image, encode_data_uri(&file.bytes).into(), file.name.clone())
}

fn ensure_language(state: &mut ProjectState, lang: &str) -> Result<()> {
    if localization::add_language(state, lang)? {
        log::info!("Upload introduced language '{}'", lang);
    }
    Ok(())
}

fn new_screenshot(state: &mut ProjectState, file: &UploadFile, lang: &str, image: ImageHandle) -> usize {
    let index = state.add_screenshot(&file.name);
    let current = state.current_language.clone();
    let shot = &mut state.screenshots[index];
    shot.set_localized_image(lang, entry_for(file, image));
    shot.sync_legacy_image(&current);
    index
}

fn put_variant(state: &mut ProjectState, index: usize, file: &UploadFile, lang: &str, image: ImageHandle) {
    let current = state.current_language.clone();
    let shot = &mut state.screenshots[index];
    shot.set_localized_image(lang, entry_for(file, image));
    shot.sync_legacy_image(&current);
}

/// Decode every file in parallel, then route them in order. A file that
/// fails to decode is reported and skipped; the rest of the batch still
/// goes through.
pub fn apply_uploads(
    state: &mut ProjectState,
    decoder: &dyn ImageDecoder,
    files: &[UploadFile],
    fallback_language: &str,
    prompt: &mut dyn ConflictPrompt,
) -> Result<UploadReport> {
    let decoded: Vec<Result<ImageHandle>> = files
        .par_iter()
        .map(|file| decoder.decode(&file.bytes))
        .collect();

    let mut report = UploadReport::default();
    for (file, result) in files.iter().zip(decoded) {
        let image = match result {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Could not decode {}: {}", file.name, e);
                report.failures.push(DecodeFailure {
                    filename: file.name.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        match plan_upload(state, &file.name, fallback_language) {
            UploadPlan::NewScreenshot { lang } => {
                ensure_language(state, &lang)?;
                report.created.push(new_screenshot(state, file, &lang, image));
            }
            UploadPlan::AddVariant { index, lang } => {
                ensure_language(state, &lang)?;
                put_variant(state, index, file, &lang, image);
                report.variants.push((index, lang));
            }
            UploadPlan::Conflict { index, lang } => {
                let screenshot_name = state.screenshots[index].name.clone();
                match prompt.choose(&file.name, &screenshot_name, &lang) {
                    ConflictChoice::Replace => {
                        put_variant(state, index, file, &lang, image);
                        report.variants.push((index, lang));
                    }
                    ConflictChoice::CreateNew => {
                        report.created.push(new_screenshot(state, file, &lang, image));
                    }
                    ConflictChoice::Ignore => {
                        log::debug!("Ignored {} (variant '{}' exists)", file.name, lang);
                        report.ignored.push(file.name.clone());
                    }
                }
            }
        }
    }
    Ok(report)
}
