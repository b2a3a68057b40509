//! Core of a rich-text note editor: a run-based document, range resolution,
//! character formatting, toolbar synchronization and continuous dictation.

pub mod config;
pub mod dictation;
pub mod document;
pub mod editor;
pub mod error;
pub mod render;
pub mod theme;
pub mod toolbar;

pub use error::{EditorError, Result};
