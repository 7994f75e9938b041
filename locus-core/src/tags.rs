//! Tag Engine - Conditional Tag Trees To Markup
//!
//! Resolution evaluates predicates and attributes of declarative
//! definitions into concrete [`Tag`] trees. Rendering folds a resolved tree
//! into a markup string and enforces its structural invariants.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::template::{is_truthy, Current, Evaluate, TemplateContext};

/// A producer-authored tag definition.
///
/// `imageName` and `documentName` only apply to top-level definitions: the
/// definition is resolved once per size of the named image, or once for the
/// named document, with that output exposed to templates as `current`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDefinition {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<DefinitionChild>,
    #[serde(default)]
    pub is_self_closing: bool,
    #[serde(default)]
    pub predicate: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
}

/// Child of a definition. Definitions are shared so one sub-tree can appear
/// under several parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefinitionChild {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Definition(Arc<TagDefinition>),
}

/// A resolved tag, ready to render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub is_self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Tag(Tag),
}

impl TagDefinition {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: DefinitionChild) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_predicate(mut self, value: impl Into<Value>) -> Self {
        self.predicate.push(value.into());
        self
    }

    pub fn self_closing(mut self) -> Self {
        self.is_self_closing = true;
        self
    }

    pub fn for_image(mut self, name: impl Into<String>) -> Self {
        self.image_name = Some(name.into());
        self
    }

    pub fn for_document(mut self, name: impl Into<String>) -> Self {
        self.document_name = Some(name.into());
        self
    }
}

impl From<TagDefinition> for DefinitionChild {
    fn from(definition: TagDefinition) -> Self {
        Self::Definition(Arc::new(definition))
    }
}

impl From<&str> for DefinitionChild {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl Node {
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Node::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

/// Resolves definitions against a locator through a template evaluator.
#[derive(Clone, Copy)]
pub struct TagResolver<'a> {
    locator: &'a Locator,
    evaluator: &'a dyn Evaluate,
}

impl<'a> TagResolver<'a> {
    pub fn new(locator: &'a Locator, evaluator: &'a dyn Evaluate) -> Self {
        Self { locator, evaluator }
    }

    pub fn locator(&self) -> &'a Locator {
        self.locator
    }

    /// Resolve top-level definitions, expanding `imageName` per size and
    /// binding `documentName`. Dropped definitions contribute nothing.
    pub fn resolve(&self, definitions: &[TagDefinition]) -> Result<Vec<Tag>> {
        let manifest = self.locator.manifest();
        let mut resolved = Vec::with_capacity(definitions.len());

        for definition in definitions {
            let base = TemplateContext::new(self.locator);

            if let Some(name) = non_empty(&definition.image_name) {
                let Some(sizes) = manifest.image_sizes(name) else {
                    tracing::trace!(image = name, "no sizes for image definition");
                    continue;
                };

                for (size, output) in sizes {
                    let current = Current::image(name, size, output.clone());
                    resolved.extend(self.resolve_tag(definition, &base.with_current(&current))?);
                }
            } else if let Some(name) = non_empty(&definition.document_name) {
                let output = manifest.document(name).cloned().unwrap_or_default();
                let current = Current::document(name, output);
                resolved.extend(self.resolve_tag(definition, &base.with_current(&current))?);
            } else {
                resolved.extend(self.resolve_tag(definition, &base)?);
            }
        }

        Ok(resolved)
    }

    /// Resolve one definition in `context`. `None` when a predicate value is
    /// falsy.
    pub fn resolve_tag(
        &self,
        definition: &TagDefinition,
        context: &TemplateContext<'_>,
    ) -> Result<Option<Tag>> {
        for value in &definition.predicate {
            if !is_truthy(&self.evaluator.evaluate(value, context)?) {
                tracing::trace!(
                    tag = ?definition.tag,
                    predicate = %value,
                    "dropped tag definition"
                );
                return Ok(None);
            }
        }

        // Checked against the definition, since children dropped below leave no node.
        if definition.is_self_closing && !definition.children.is_empty() {
            return Err(Error::MalformedTag(SELF_CLOSING_WITH_CHILDREN.to_string()));
        }

        let attributes = definition
            .attributes
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.evaluator.evaluate(value, context)?)))
            .collect::<Result<Map<_, _>>>()?;

        let mut children = Vec::with_capacity(definition.children.len());
        for child in &definition.children {
            let node = match child {
                DefinitionChild::Null => Node::Null,
                DefinitionChild::Bool(value) => Node::Bool(*value),
                DefinitionChild::Number(value) => Node::Number(value.clone()),
                DefinitionChild::Text(text) => Node::Text(text.clone()),
                DefinitionChild::Definition(child) => match self.resolve_tag(child, context)? {
                    Some(tag) => Node::Tag(tag),
                    None => continue,
                },
            };
            children.push(node);
        }

        Ok(Some(Tag {
            tag: definition.tag.clone(),
            attributes,
            children,
            is_self_closing: definition.is_self_closing,
        }))
    }
}

/// Resolve `definitions` and render every surviving tag.
pub fn render_tag_list(
    resolver: &TagResolver<'_>,
    definitions: &[TagDefinition],
) -> Result<Vec<String>> {
    let rendered = resolver
        .resolve(definitions)?
        .iter()
        .map(render_tag)
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        definitions = definitions.len(),
        rendered = rendered.len(),
        "rendered tag list"
    );

    Ok(rendered)
}

/// Render a resolved tag to markup.
///
/// Text children are inserted verbatim; attribute values are escaped.
pub fn render_tag(tag: &Tag) -> Result<String> {
    // Breadth-first: the children of `flat[i]` are `flat[first_child[i]..]`.
    let mut flat = vec![tag];
    let mut first_child = Vec::new();
    let mut index = 0;

    while index < flat.len() {
        let current = flat[index];
        validate(current)?;
        first_child.push(flat.len());
        flat.extend(current.children.iter().filter_map(Node::as_tag));
        index += 1;
    }

    let mut rendered = vec![String::new(); flat.len()];

    for (index, current) in flat.iter().enumerate().rev() {
        let mut next = first_child[index];
        let mut inner = String::new();

        for child in &current.children {
            match child {
                Node::Tag(_) => {
                    inner.push_str(&std::mem::take(&mut rendered[next]));
                    next += 1;
                }
                Node::Null | Node::Bool(false) => {}
                Node::Bool(true) => inner.push_str("true"),
                Node::Number(number) => inner.push_str(&number_text(number)),
                Node::Text(text) => inner.push_str(text),
            }
        }

        rendered[index] = element(current, &inner);
    }

    Ok(std::mem::take(&mut rendered[0]))
}

const SELF_CLOSING_WITH_CHILDREN: &str = "Self-closing tags cannot have children";

fn validate(tag: &Tag) -> Result<()> {
    if tag.tag.as_deref().map_or(true, str::is_empty) {
        return Err(Error::MalformedTag("Missing tag name".to_string()));
    }

    if tag.is_self_closing && !tag.children.is_empty() {
        return Err(Error::MalformedTag(SELF_CLOSING_WITH_CHILDREN.to_string()));
    }

    Ok(())
}

fn element(tag: &Tag, inner: &str) -> String {
    let name = tag.tag.as_deref().unwrap_or_default();
    let mut html = format!("<{name}");

    for (attribute, value) in &tag.attributes {
        let text = match value {
            Value::Bool(true) => {
                html.push(' ');
                html.push_str(attribute);
                continue;
            }
            Value::Null | Value::Bool(false) => continue,
            Value::String(text) if text.is_empty() => continue,
            Value::String(text) => Cow::Borrowed(text.as_str()),
            Value::Number(number) => Cow::Owned(number_text(number)),
            Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
        };

        html.push_str(&format!(" {attribute}=\"{}\"", escape_attr(&text)));
    }

    html.push('>');

    if !tag.is_self_closing {
        html.push_str(inner);
        html.push_str(&format!("</{name}>"));
    }

    html
}

/// Decimal form. Integral floats below 1e21 print without a fraction or an
/// exponent.
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(value) if number.is_f64() && value == 0.0 => "0".to_string(),
        Some(value) if number.is_f64() && value.fract() == 0.0 && value.abs() < 1e21 => {
            format!("{value:.0}")
        }
        _ => number.to_string(),
    }
}

fn escape_attr(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }

    Cow::Owned(escaped)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
