//! Debug module for visualization tools
//!
//! Based on Game Engine Architecture 3rd Edition, Chapter 10.2:
//! "Debug Drawing Facilities"

pub mod draw;

pub use draw::{argb_to_abgr, DebugDraw, DebugLine, DebugPoint, DebugTriangle};
