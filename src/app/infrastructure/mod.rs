//! Infrastructure layer - external integrations and utilities.
//!
//! This module contains code that interfaces with external systems:
//! - SQLite project store
//! - Image decoding, rendering and translation seams
//! - Error types

pub mod error;
pub mod platform;
pub mod store;
