//! Gemini-backed GeoJSON generation.

pub mod client;
pub mod overlay;

pub use client::{GeminiClient, GeminiConfig};
pub use overlay::OverlayGenerator;
