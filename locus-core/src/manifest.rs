//! Manifest - Declared Build Outputs
//!
//! Names and size keys are chosen by the manifest producer. The manifest is
//! read once and shared immutably by every locator built from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type OutputName = String;
pub type SizeKey = String;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub output: Outputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default)]
    pub urls: Urls,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub document: BTreeMap<OutputName, OutputDefinition>,
    #[serde(default)]
    pub image: BTreeMap<OutputName, BTreeMap<SizeKey, OutputDefinition>>,
}

/// Where a single output lives. Neither field set means an undefined location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Urls {
    /// Public base URL of the application; the frame for absolute URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// URL of the output directory; the default frame for relative URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl Manifest {
    pub fn document(&self, name: &str) -> Option<&OutputDefinition> {
        self.output.document.get(name)
    }

    pub fn image_sizes(&self, name: &str) -> Option<&BTreeMap<SizeKey, OutputDefinition>> {
        self.output.image.get(name)
    }

    pub fn image(&self, name: &str, size: &str) -> Option<&OutputDefinition> {
        self.image_sizes(name)?.get(size)
    }
}

impl OutputDefinition {
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            url: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            path: None,
            url: Some(url.into()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Transformation replacing the public base URL (`urls.base`).
pub fn replace_base_url(base: impl Into<String>) -> impl Fn(Manifest) -> Manifest {
    let base = base.into();

    move |manifest| Manifest {
        urls: Urls {
            base: Some(base.clone()),
            ..manifest.urls
        },
        ..manifest
    }
}
