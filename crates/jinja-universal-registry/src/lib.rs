//! Single source-of-truth registry for jinja-universal.
//!
//! `languages.toml` maps a language id to a descriptor: display name, Zed
//! language id, detection tokens, and support tier. This crate owns the
//! model, structural validation (every violation reported, not just the
//! first), and atomic persistence. It never touches the network.

pub mod error;
pub mod layout;
pub mod model;
pub mod store;

pub use error::ConfigError;
pub use layout::{BASE_RULE_FILES, GENERATED_FOLDER_SUFFIX, RepoLayout};
pub use model::{LanguageDescriptor, Registry, Source};
