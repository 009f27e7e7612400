//! Services layer - business operations and utilities.
//!
//! This module contains business logic and operations:
//! - Localization lookups and language management
//! - Schema migration of stored records
//! - Undo/redo history
//! - Style propagation between screenshots
//! - Save debouncing and background image loading

pub mod assets;
pub mod field_path;
pub mod history;
pub mod localization;
pub mod migration;
pub mod save_scheduler;
pub mod style;
