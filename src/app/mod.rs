//! Application layer - organized by Clean Architecture principles.
//!
//! # Structure
//!
//! - `domain/` - Core data structures (settings tree, screenshots, projects, config)
//! - `controllers/` - Orchestration (project list, upload routing)
//! - `services/` - Business operations (localization, migration, history, style, saving, assets)
//! - `infrastructure/` - External integrations (SQLite store, platform seams, error)
//! - `state.rs` - Main application coordinator

pub mod controllers;
pub mod domain;
pub mod infrastructure;
pub mod services;
pub mod state;

// Re-exports for convenient external access
pub use controllers::projects::ProjectList;
pub use controllers::uploads::{ConflictChoice, ConflictPrompt, DecodeFailure, UploadFile, UploadReport};
pub use domain::{AppConfig, ImageSource, OutputDevice, ProjectMeta, ProjectState, Screenshot, SettingsKind, SettingsTree, TextField, language_name};
pub use infrastructure::error::{AppError, Result};
pub use infrastructure::platform::{DefaultImageDecoder, ImageDecoder, Renderer, Translator};
pub use infrastructure::store::{ProjectStore, StoreMode};
pub use state::AppState;
