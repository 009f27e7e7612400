//! Controllers layer - orchestration and coordination.
//!
//! This module contains controllers that coordinate between
//! domain models and services:
//! - Project list management
//! - Upload routing and conflict resolution

pub mod projects;
pub mod uploads;
