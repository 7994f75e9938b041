//! Locus Core - Output Location Algebra And Tag Rendering
//!
//! # Layers
//! 1. `paths` / `urls`: directory-aware location algebra
//! 2. `locator`: manifest outputs to paths and URLs in a frame of reference
//! 3. `template` / `tags`: conditional tag trees rendered to markup
//!
//! Soft misses are `None`; only structural violations are errors.

pub mod error;
pub mod locator;
pub mod manifest;
pub mod paths;
pub mod reader;
pub mod tags;
pub mod template;
pub mod urls;

pub use error::{Error, Result};
pub use locator::{Locator, LocatorOptions};
pub use manifest::{replace_base_url, Manifest, OutputDefinition, Outputs, Urls};
pub use paths::{
    is_absolute_path, is_dir_path, normalize_path, relative_path, resolve_path, to_dir_path,
};
pub use reader::{read_locator, read_manifest};
pub use tags::{render_tag, render_tag_list, DefinitionChild, Node, Tag, TagDefinition, TagResolver};
pub use template::{is_truthy, Current, Evaluate, OutputKind, TemplateContext, TeraEvaluator};
pub use urls::{is_absolute_url, relative_url, resolve_url, to_dir_url};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
