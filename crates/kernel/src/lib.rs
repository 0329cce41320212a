//! Core traits, settings, and the module registry.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
pub use settings::Settings;
