//! Output Locator - Manifest Outputs To Paths And URLs
//!
//! A locator is a frame of reference over a shared manifest. Re-basing and
//! transformation always build a new locator; nothing is mutated in place.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::manifest::{Manifest, OutputDefinition};
use crate::paths::{is_absolute_path, relative_path, resolve_path};
use crate::tags::{render_tag_list, TagDefinition, TagResolver};
use crate::template::Evaluate;
use crate::urls::{is_absolute_url, relative_url, resolve_url};

pub const DEFAULT_BASE_PATH: &str = ".";
pub const DEFAULT_BASE_URL: &str = ".";

/// Overrides for the frame of reference. Unset (or empty) fields fall back
/// to the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorOptions {
    pub base_path: Option<String>,
    pub base_url: Option<String>,
    pub output_path: Option<String>,
}

impl LocatorOptions {
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_output_path(mut self, output_path: impl Into<String>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Locator {
    manifest: Arc<Manifest>,
    options: LocatorOptions,
    base_path: String,
    base_url: String,
    output_path: Option<String>,
}

impl Locator {
    pub fn new(manifest: Manifest, options: LocatorOptions) -> Self {
        Self::from_shared(Arc::new(manifest), options)
    }

    pub fn from_shared(manifest: Arc<Manifest>, options: LocatorOptions) -> Self {
        let base_path = non_empty(&options.base_path)
            .unwrap_or(DEFAULT_BASE_PATH)
            .to_string();
        let base_url = non_empty(&options.base_url)
            .or_else(|| non_empty(&manifest.urls.output))
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();
        let output_path = non_empty(&options.output_path)
            .or_else(|| non_empty(&manifest.output_path))
            .map(str::to_string);

        tracing::debug!(%base_path, %base_url, ?output_path, "created locator");

        Self {
            manifest,
            options,
            base_path,
            base_url,
            output_path,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn shared_manifest(&self) -> Arc<Manifest> {
        Arc::clone(&self.manifest)
    }

    pub fn options(&self) -> &LocatorOptions {
        &self.options
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn output_path(&self) -> Option<&str> {
        self.output_path.as_deref()
    }

    /// Same manifest instance and same resolved frame.
    pub(crate) fn same_frame(&self, other: &Locator) -> bool {
        Arc::ptr_eq(&self.manifest, &other.manifest)
            && self.base_path == other.base_path
            && self.base_url == other.base_url
            && self.output_path == other.output_path
    }

    /// Resolve against the output path. `None` unless the result is absolute.
    pub fn absolute_path(&self, path: &str) -> Option<String> {
        if path.is_empty() {
            return None;
        }

        let resolved = match &self.output_path {
            Some(output_path) => resolve_path(output_path, path),
            None => path.to_string(),
        };

        is_absolute_path(&resolved).then_some(resolved)
    }

    /// Resolve against the manifest's base URL. `None` unless the result is
    /// absolute.
    pub fn absolute_url(&self, url: &str) -> Option<String> {
        if url.is_empty() {
            return None;
        }

        let resolved = match non_empty(&self.manifest.urls.base) {
            Some(base_url) => resolve_url(base_url, url),
            None => url.to_string(),
        };

        is_absolute_url(&resolved).then_some(resolved)
    }

    /// Path relative to this locator's base path.
    pub fn path(&self, path: &str) -> Option<String> {
        (!path.is_empty()).then(|| relative_path(&self.base_path, path))
    }

    /// URL relative to this locator's base URL.
    pub fn url(&self, url: &str) -> Option<String> {
        (!url.is_empty()).then(|| relative_url(&self.base_url, url))
    }

    pub fn absolute_document_path(&self, name: &str) -> Option<String> {
        self.absolute_path(self.document_field(name, |d| &d.path)?)
    }

    pub fn absolute_document_url(&self, name: &str) -> Option<String> {
        self.absolute_url(self.document_field(name, |d| &d.url)?)
    }

    pub fn absolute_image_path(&self, name: &str, size: &str) -> Option<String> {
        self.absolute_path(self.image_field(name, size, |d| &d.path)?)
    }

    pub fn absolute_image_url(&self, name: &str, size: &str) -> Option<String> {
        self.absolute_url(self.image_field(name, size, |d| &d.url)?)
    }

    pub fn document_path(&self, name: &str) -> Option<String> {
        self.path(self.document_field(name, |d| &d.path)?)
    }

    pub fn document_url(&self, name: &str) -> Option<String> {
        self.url(self.document_field(name, |d| &d.url)?)
    }

    pub fn image_path(&self, name: &str, size: &str) -> Option<String> {
        self.path(self.image_field(name, size, |d| &d.path)?)
    }

    pub fn image_url(&self, name: &str, size: &str) -> Option<String> {
        self.url(self.image_field(name, size, |d| &d.url)?)
    }

    /// Locator whose relative frame is the named document's own location.
    pub fn for_document(&self, name: &str) -> Result<Self> {
        let definition = self
            .manifest
            .document(name)
            .ok_or_else(|| Error::OutputNotFound(name.to_string()))?;

        tracing::debug!(document = name, "rebasing locator");

        let options = LocatorOptions {
            base_path: definition.path.clone(),
            base_url: definition.url.clone(),
            ..self.options.clone()
        };

        Ok(Self::from_shared(self.shared_manifest(), options))
    }

    /// Locator over the manifest produced by applying `transformations` in
    /// order. Options are kept.
    pub fn transform<I, F>(&self, transformations: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(Manifest) -> Manifest,
    {
        let manifest = transformations
            .into_iter()
            .fold(Manifest::clone(&self.manifest), |manifest, transformation| {
                transformation(manifest)
            });

        tracing::debug!("transformed locator manifest");

        Self::new(manifest, self.options.clone())
    }

    /// Resolve and render tag definitions in this locator's frame.
    pub fn render_tag_list(
        &self,
        definitions: &[TagDefinition],
        evaluator: &dyn Evaluate,
    ) -> Result<Vec<String>> {
        render_tag_list(&TagResolver::new(self, evaluator), definitions)
    }

    fn document_field(
        &self,
        name: &str,
        field: impl Fn(&OutputDefinition) -> &Option<String>,
    ) -> Option<&str> {
        field(self.manifest.document(name)?).as_deref()
    }

    fn image_field(
        &self,
        name: &str,
        size: &str,
        field: impl Fn(&OutputDefinition) -> &Option<String>,
    ) -> Option<&str> {
        field(self.manifest.image(name, size)?).as_deref()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
