//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the scene:
//! - Math types and operations
//! - Typed handles and collections
//! - Logging utilities

pub mod collections;
pub mod logging;
pub mod math;
