//! Domain layer - core data structures and types.
//!
//! This module contains the fundamental domain models:
//! - Settings tree shared by screenshots and project defaults
//! - Screenshots and their localized images
//! - Project state and project list metadata
//! - Application configuration and the language table

pub mod asset;
pub mod config;
pub mod language;
pub mod project;
pub mod screenshot;
pub mod settings;

pub use asset::{ImageHandle, ImageSource, LocalizedImage};
pub use config::AppConfig;
pub use language::language_name;
pub use project::{OutputDevice, ProjectMeta, ProjectState, SCHEMA_VERSION};
pub use screenshot::{DeviceType, Screenshot, ScreenshotId};
pub use settings::{Background, DeviceTransform, SettingsKind, SettingsTree, TextBlock, TextField};
