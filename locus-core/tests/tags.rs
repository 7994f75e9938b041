//! Tag Engine Contract Tests
//!
//! Resolution against a locator, then rendering.

use locus_core::{
    render_tag, DefinitionChild, Error, Evaluate, Locator, LocatorOptions, Manifest, Node,
    TagDefinition, TagResolver, TemplateContext, TeraEvaluator,
};
use serde_json::{json, Value};

fn locator() -> Locator {
    let manifest: Manifest = serde_json::from_value(json!({
        "outputPath": "dist",
        "urls": {"base": "https://iconduit.github.io/", "output": "."},
        "output": {
            "document": {
                "webAppManifest": {"path": "site.webmanifest", "url": "site.webmanifest"},
                "browserconfig": {"path": "ms/browserconfig.xml", "url": "ms/browserconfig.xml"}
            },
            "image": {
                "appleTouchIcon": {
                    "152": {"path": "apple-touch-icon-152.png", "url": "apple-touch-icon-152.png"},
                    "180": {"path": "apple-touch-icon-180.png", "url": "apple-touch-icon-180.png"}
                }
            }
        }
    }))
    .unwrap();

    Locator::new(manifest, LocatorOptions::default())
}

fn definitions(value: Value) -> Vec<TagDefinition> {
    serde_json::from_value(value).unwrap()
}

#[test]
fn image_definitions_expand_per_size() {
    let locator = locator();
    let rendered = locator
        .render_tag_list(
            &definitions(json!([{
                "tag": "link",
                "imageName": "appleTouchIcon",
                "isSelfClosing": true,
                "attributes": {
                    "rel": "apple-touch-icon",
                    "sizes": "{{ current.size }}x{{ current.size }}",
                    "href": "{{ current.url }}"
                }
            }])),
            &TeraEvaluator::new(),
        )
        .unwrap();

    assert_eq!(
        rendered,
        vec![
            r#"<link rel="apple-touch-icon" sizes="152x152" href="apple-touch-icon-152.png">"#,
            r#"<link rel="apple-touch-icon" sizes="180x180" href="apple-touch-icon-180.png">"#,
        ]
    );
}

#[test]
fn missing_image_expands_to_nothing() {
    let locator = locator();
    let rendered = locator
        .render_tag_list(
            &definitions(json!([{"tag": "link", "imageName": "missing", "isSelfClosing": true}])),
            &TeraEvaluator::new(),
        )
        .unwrap();

    assert!(rendered.is_empty());
}

#[test]
fn predicates_filter_image_sizes() {
    let locator = locator();
    let rendered = locator
        .render_tag_list(
            &definitions(json!([{
                "tag": "link",
                "imageName": "appleTouchIcon",
                "isSelfClosing": true,
                "predicate": [r#"{% if current.size == "180" %}1{% endif %}"#],
                "attributes": {"href": "{{ current.url }}"}
            }])),
            &TeraEvaluator::new(),
        )
        .unwrap();

    assert_eq!(rendered, vec![r#"<link href="apple-touch-icon-180.png">"#]);
}

#[test]
fn document_definitions_bind_current() {
    let locator = locator();
    let rendered = locator
        .render_tag_list(
            &definitions(json!([{
                "tag": "link",
                "documentName": "webAppManifest",
                "isSelfClosing": true,
                "attributes": {"rel": "manifest", "href": "{{ current.url }}"}
            }])),
            &TeraEvaluator::new(),
        )
        .unwrap();

    assert_eq!(rendered, vec![r#"<link rel="manifest" href="site.webmanifest">"#]);
}

#[test]
fn rendering_for_a_document_uses_its_frame() {
    let locator = locator().for_document("browserconfig").unwrap();
    let rendered = locator
        .render_tag_list(
            &definitions(json!([{
                "tag": "square150x150logo",
                "isSelfClosing": true,
                "attributes": {"src": r#"{{ image_url(name="appleTouchIcon", size="152") }}"#}
            }])),
            &TeraEvaluator::new(),
        )
        .unwrap();

    assert_eq!(
        rendered,
        vec![r#"<square150x150logo src="../apple-touch-icon-152.png">"#]
    );
}

#[test]
fn falsy_predicate_drops_definition() {
    let locator = locator();
    let rendered = locator
        .render_tag_list(
            &definitions(json!([
                {
                    "tag": "meta",
                    "isSelfClosing": true,
                    "predicate": ["{% if false %}yes{% endif %}"]
                },
                {"tag": "meta", "isSelfClosing": true, "predicate": [true, ""]},
                {"tag": "br", "isSelfClosing": true, "predicate": [true, 1, "{{ base_url }}"]}
            ])),
            &TeraEvaluator::new(),
        )
        .unwrap();

    assert_eq!(rendered, vec!["<br>"]);
}

#[test]
fn dropped_children_leave_no_node() {
    let locator = locator();
    let resolved = TagResolver::new(&locator, &TeraEvaluator::new())
        .resolve(&definitions(json!([{
            "tag": "head",
            "children": [
                {"tag": "a", "predicate": [false]},
                "text",
                {"tag": "b"}
            ]
        }])))
        .unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].children.len(), 2);
    assert_eq!(resolved[0].children[0], Node::Text("text".into()));
    assert_eq!(render_tag(&resolved[0]).unwrap(), "<head>text<b></b></head>");
}

#[test]
fn reused_sub_definitions_render_independently() {
    let leaf = DefinitionChild::from(TagDefinition::new("tag-c"));
    let child = DefinitionChild::from(TagDefinition::new("tag-b").with_child(leaf));
    let parent = TagDefinition::new("tag-a")
        .with_child(child.clone())
        .with_child(child);

    let locator = locator();
    let evaluator = TeraEvaluator::new();
    let resolver = TagResolver::new(&locator, &evaluator);

    let first = locus_core::render_tag_list(&resolver, std::slice::from_ref(&parent)).unwrap();
    let second = locus_core::render_tag_list(&resolver, &[parent]).unwrap();

    let expected = "<tag-a><tag-b><tag-c></tag-c></tag-b><tag-b><tag-c></tag-c></tag-b></tag-a>";
    assert_eq!(first, vec![expected]);
    assert_eq!(second, first);
}

#[test]
fn attributes_are_evaluated_then_escaped() {
    let locator = locator();
    let rendered = locator
        .render_tag_list(
            &[TagDefinition::new("meta")
                .self_closing()
                .with_attribute("content", "{{ \"a & b\" }}")
                .with_attribute("data-empty", "{% if false %}x{% endif %}")
                .with_attribute("data-flag", true)
                .with_attribute("data-width", 150)],
            &TeraEvaluator::new(),
        )
        .unwrap();

    assert_eq!(
        rendered,
        vec![r#"<meta content="a &amp; b" data-flag data-width="150">"#]
    );
}

#[test]
fn custom_evaluators_plug_in() {
    fn evaluator(value: &Value, context: &TemplateContext<'_>) -> locus_core::Result<Value> {
        match value.as_str() {
            Some("manifest-url") => Ok(context
                .locator()
                .absolute_document_url("webAppManifest")
                .map_or(Value::Null, Value::String)),
            _ => Ok(value.clone()),
        }
    }

    let locator = locator();
    let rendered = locator
        .render_tag_list(
            &[TagDefinition::new("link")
                .self_closing()
                .with_attribute("href", "manifest-url")
                .with_attribute("rel", "manifest")],
            &evaluator,
        )
        .unwrap();

    assert_eq!(
        rendered,
        vec![r#"<link href="https://iconduit.github.io/site.webmanifest" rel="manifest">"#]
    );
}

#[test]
fn evaluation_errors_propagate() {
    struct Failing;

    impl Evaluate for Failing {
        fn evaluate(&self, _: &Value, _: &TemplateContext<'_>) -> locus_core::Result<Value> {
            Err(Error::Template("boom".into()))
        }
    }

    let locator = locator();
    let result = locator.render_tag_list(
        &[TagDefinition::new("meta").with_predicate(true)],
        &Failing,
    );

    assert!(matches!(result, Err(Error::Template(message)) if message == "boom"));
}

#[test]
fn malformed_definitions_fail_at_render_time() {
    let locator = locator();

    let missing_name =
        locator.render_tag_list(&definitions(json!([{"attributes": {}}])), &TeraEvaluator::new());
    assert!(matches!(missing_name, Err(Error::MalformedTag(_))));

    let self_closing = locator.render_tag_list(
        &definitions(json!([{"tag": "a", "isSelfClosing": true, "children": ["x"]}])),
        &TeraEvaluator::new(),
    );
    assert!(matches!(self_closing, Err(Error::MalformedTag(_))));
}

#[test]
fn self_closing_with_dropped_children_is_malformed() {
    let locator = locator();

    let result = locator.render_tag_list(
        &definitions(json!([{
            "tag": "br",
            "isSelfClosing": true,
            "children": [{"tag": "x", "predicate": [false]}]
        }])),
        &TeraEvaluator::new(),
    );

    assert!(matches!(result, Err(Error::MalformedTag(_))));
}

#[test]
fn large_integral_attributes_render_without_exponent() {
    let locator = locator();
    let rendered = locator
        .render_tag_list(
            &[TagDefinition::new("meta")
                .self_closing()
                .with_attribute("data-large", 1e20)
                .with_attribute("data-ratio", 1.5)],
            &TeraEvaluator::new(),
        )
        .unwrap();

    assert_eq!(
        rendered,
        vec![r#"<meta data-large="100000000000000000000" data-ratio="1.5">"#]
    );
}
