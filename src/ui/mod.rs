//! UI layer: line-oriented console and plain-text rendering.

pub mod commands;
pub mod console;
pub mod demo;
pub mod render;

/// Returns the UI module name for smoke checks.
pub fn module_name() -> &'static str {
    "ui"
}
