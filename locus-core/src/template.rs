//! Template Evaluation - Pluggable Expression Engine
//!
//! Tag predicates and attribute values are opaque template values. The tag
//! engine only ever asks an [`Evaluate`] implementation to turn one into a
//! concrete JSON value; [`TeraEvaluator`] is the default engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tera::Tera;

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::manifest::OutputDefinition;
use crate::paths::{is_absolute_path, relative_path, resolve_path, to_dir_path};
use crate::urls::{is_absolute_url, relative_url, resolve_url, to_dir_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Document,
    Image,
}

/// The output a tag definition is currently being resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Current {
    pub name: String,
    pub output: OutputDefinition,
    pub size: Option<String>,
    pub kind: OutputKind,
}

impl Current {
    pub fn document(name: impl Into<String>, output: OutputDefinition) -> Self {
        Self {
            name: name.into(),
            output,
            size: None,
            kind: OutputKind::Document,
        }
    }

    pub fn image(
        name: impl Into<String>,
        size: impl Into<String>,
        output: OutputDefinition,
    ) -> Self {
        Self {
            name: name.into(),
            output,
            size: Some(size.into()),
            kind: OutputKind::Image,
        }
    }

    /// URL of this output relative to the locator's base URL.
    pub fn url(&self, locator: &Locator) -> Option<String> {
        match self.kind {
            OutputKind::Document => locator.document_url(&self.name),
            OutputKind::Image => locator.image_url(&self.name, self.size.as_deref()?),
        }
    }

    /// Path of this output relative to the locator's base path.
    pub fn path(&self, locator: &Locator) -> Option<String> {
        match self.kind {
            OutputKind::Document => locator.document_path(&self.name),
            OutputKind::Image => locator.image_path(&self.name, self.size.as_deref()?),
        }
    }
}

/// Everything a template value may be evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    locator: &'a Locator,
    current: Option<&'a Current>,
}

impl<'a> TemplateContext<'a> {
    pub fn new(locator: &'a Locator) -> Self {
        Self {
            locator,
            current: None,
        }
    }

    pub fn with_current(self, current: &'a Current) -> Self {
        Self {
            current: Some(current),
            ..self
        }
    }

    pub fn locator(&self) -> &'a Locator {
        self.locator
    }

    pub fn current(&self) -> Option<&'a Current> {
        self.current
    }
}

/// Evaluate a template value against a context.
pub trait Evaluate {
    fn evaluate(&self, value: &Value, context: &TemplateContext<'_>) -> Result<Value>;
}

impl<F> Evaluate for F
where
    F: Fn(&Value, &TemplateContext<'_>) -> Result<Value>,
{
    fn evaluate(&self, value: &Value, context: &TemplateContext<'_>) -> Result<Value> {
        self(value, context)
    }
}

/// Falsy values are `null`, `false`, `0`, NaN and the empty string.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => number
            .as_f64()
            .is_some_and(|number| number != 0.0 && !number.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Named string argument of a template function.
pub fn str_arg<'a>(args: &'a HashMap<String, Value>, name: &str) -> Result<&'a str> {
    match args.get(name) {
        Some(Value::String(value)) => Ok(value),
        Some(other) => Err(Error::TypeMismatch(format!(
            "argument `{name}` must be a string, got {other}"
        ))),
        None => Err(Error::TypeMismatch(format!(
            "argument `{name}` must be a string, got nothing"
        ))),
    }
}

/// Tera-backed evaluator.
///
/// Strings containing Tera delimiters are rendered without escaping; every
/// other value is returned as-is. Templates see `manifest`, `base_path`,
/// `base_url`, `output_path` and (when set) `current`, plus functions for
/// every locator accessor and the path/URL algebra:
///
/// ```text
/// {{ image_url(name="appleTouchIcon", size="180") }}
/// {% if current.size == "180" %}1{% endif %}
/// {{ relative_path(from="a/b", to="a/c/") }}
/// ```
///
/// The engine is built once per frame of reference and reused until the
/// evaluator sees a locator with a different frame.
#[derive(Debug, Default)]
pub struct TeraEvaluator {
    engine: Mutex<Option<(Locator, Tera)>>,
}

type TeraArgs = HashMap<String, Value>;

const LOCATION_ACCESSORS: [(&str, &str, fn(&Locator, &str) -> Option<String>); 8] = [
    ("path", "path", Locator::path),
    ("url", "url", Locator::url),
    ("absolute_path", "path", Locator::absolute_path),
    ("absolute_url", "url", Locator::absolute_url),
    ("document_path", "name", Locator::document_path),
    ("document_url", "name", Locator::document_url),
    ("absolute_document_path", "name", Locator::absolute_document_path),
    ("absolute_document_url", "name", Locator::absolute_document_url),
];

const IMAGE_ACCESSORS: [(&str, fn(&Locator, &str, &str) -> Option<String>); 4] = [
    ("image_path", Locator::image_path),
    ("image_url", Locator::image_url),
    ("absolute_image_path", Locator::absolute_image_path),
    ("absolute_image_url", Locator::absolute_image_url),
];

const BINARY_ALGEBRA: [(&str, &str, &str, fn(&str, &str) -> String); 4] = [
    ("resolve_path", "base", "path", resolve_path),
    ("relative_path", "from", "to", relative_path),
    ("resolve_url", "base", "url", resolve_url),
    ("relative_url", "from", "to", relative_url),
];

const DIR_ALGEBRA: [(&str, &str, fn(&str) -> String); 2] =
    [("to_dir_path", "path", to_dir_path), ("to_dir_url", "url", to_dir_url)];

const ABSOLUTENESS_TESTS: [(&str, &str, fn(&str) -> bool); 2] = [
    ("is_absolute_path", "path", is_absolute_path),
    ("is_absolute_url", "url", is_absolute_url),
];

#[derive(Serialize)]
struct CurrentData<'a> {
    name: &'a str,
    output: &'a OutputDefinition,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
    #[serde(rename = "type")]
    kind: OutputKind,
    url: Option<String>,
    path: Option<String>,
}

impl TeraEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn engine(locator: &Locator) -> Tera {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        let locator = Arc::new(locator.clone());

        for (function, argument, accessor) in LOCATION_ACCESSORS {
            let locator = Arc::clone(&locator);
            tera.register_function(function, move |args: &TeraArgs| {
                let value = str_arg(args, argument).map_err(function_error)?;
                Ok(accessor(&locator, value).map_or(Value::Null, Value::String))
            });
        }

        for (function, accessor) in IMAGE_ACCESSORS {
            let locator = Arc::clone(&locator);
            tera.register_function(function, move |args: &TeraArgs| {
                let name = str_arg(args, "name").map_err(function_error)?;
                let size = str_arg(args, "size").map_err(function_error)?;
                Ok(accessor(&locator, name, size).map_or(Value::Null, Value::String))
            });
        }

        for (function, first, second, operation) in BINARY_ALGEBRA {
            tera.register_function(function, move |args: &TeraArgs| {
                let a = str_arg(args, first).map_err(function_error)?;
                let b = str_arg(args, second).map_err(function_error)?;
                Ok(Value::String(operation(a, b)))
            });
        }

        for (function, argument, operation) in DIR_ALGEBRA {
            tera.register_function(function, move |args: &TeraArgs| {
                let value = str_arg(args, argument).map_err(function_error)?;
                Ok(Value::String(operation(value)))
            });
        }

        for (function, argument, test) in ABSOLUTENESS_TESTS {
            tera.register_function(function, move |args: &TeraArgs| {
                let value = str_arg(args, argument).map_err(function_error)?;
                Ok(Value::Bool(test(value)))
            });
        }

        tera
    }

    fn data(context: &TemplateContext<'_>) -> tera::Context {
        let locator = context.locator();
        let mut data = tera::Context::new();
        data.insert("manifest", locator.manifest());
        data.insert("base_path", locator.base_path());
        data.insert("base_url", locator.base_url());
        data.insert("output_path", &locator.output_path());

        if let Some(current) = context.current() {
            data.insert(
                "current",
                &CurrentData {
                    name: &current.name,
                    output: &current.output,
                    size: current.size.as_deref(),
                    kind: current.kind,
                    url: current.url(locator),
                    path: current.path(locator),
                },
            );
        }

        data
    }
}

impl Evaluate for TeraEvaluator {
    fn evaluate(&self, value: &Value, context: &TemplateContext<'_>) -> Result<Value> {
        let Value::String(template) = value else {
            return Ok(value.clone());
        };

        if !is_template(template) {
            return Ok(value.clone());
        }

        let locator = context.locator();
        let mut slot = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|(cached, _)| !cached.same_frame(locator)) {
            *slot = None;
        }
        let (_, engine) = slot.get_or_insert_with(|| (locator.clone(), Self::engine(locator)));

        let rendered = engine
            .render_str(template, &Self::data(context))
            .map_err(|error| {
                function_mismatch(&error)
                    .unwrap_or_else(|| Error::Template(format_tera_error(&error)))
            })?;

        tracing::trace!(%template, %rendered, "evaluated template");

        Ok(Value::String(rendered))
    }
}

fn is_template(text: &str) -> bool {
    text.contains("{{") || text.contains("{%") || text.contains("{#")
}

/// Keeps the crate error as the source so it survives Tera's wrapping.
fn function_error(error: Error) -> tera::Error {
    tera::Error::chain(error.to_string(), error)
}

/// The argument mismatch a template function failed with, if any.
fn function_mismatch(error: &tera::Error) -> Option<Error> {
    use std::error::Error as _;

    let mut source = error.source();
    while let Some(inner) = source {
        if let Some(Error::TypeMismatch(message)) = inner.downcast_ref::<Error>() {
            return Some(Error::TypeMismatch(message.clone()));
        }
        source = inner.source();
    }

    None
}

/// Flatten a Tera error chain into one line, dropping the one-off template name.
fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error as _;

    let mut messages = vec![error.to_string()];
    let mut source = error.source();
    while let Some(inner) = source {
        messages.push(inner.to_string());
        source = inner.source();
    }

    let messages: Vec<String> = messages
        .into_iter()
        .map(|message| {
            message
                .replace("while rendering '__tera_one_off'", "")
                .replace("Failed to render '__tera_one_off'", "")
                .replace("Failed to parse '__tera_one_off'", "syntax error")
                .replace("'__tera_one_off'", "template")
                .trim()
                .to_string()
        })
        .filter(|message| !message.is_empty())
        .collect();

    if messages.is_empty() {
        "template could not be rendered".to_string()
    } else {
        messages.join(": ")
    }
}
