//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and the rigid tree-to-world transform
//! - Logging utilities

pub mod math;
pub mod logging;
