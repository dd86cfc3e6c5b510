//! Shelfmark Core — error taxonomy, shared enums, runtime configuration.

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{LlmSettings, RenamerConfig};
pub use error::{Error, Result};
pub use paths::{data_path, resolve_data_dir};
pub use types::{CaseStyle, DateLocale, DisplayStyle, Language};
