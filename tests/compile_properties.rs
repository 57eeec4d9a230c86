//! Integration tests for template compilation and wire output

use blockweave::{compile, wire, WarningCategory};
use pretty_assertions::assert_eq;
use serde_json::json;

fn to_wire(source: &str) -> String {
    compile(source).expect("Should compile").document.to_wire()
}

#[test]
fn test_end_to_end_heading_and_paragraph() {
    let compiled = compile("<h1>Title</h1><p>Hello <strong>world</strong></p>").unwrap();
    let blocks = &compiled.document.blocks;
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].name, "core/heading");
    assert_eq!(blocks[0].attr("level"), Some(&json!(1)));
    assert_eq!(blocks[0].content(), "Title");
    assert_eq!(blocks[1].name, "core/paragraph");
    assert_eq!(blocks[1].content(), "Hello <strong>world</strong>");

    insta::assert_snapshot!(
        compiled.document.to_wire(),
        @r#"<!-- wp:heading {"level":1} --><h1>Title</h1><!-- /wp:heading --><!-- wp:paragraph --><p>Hello <strong>world</strong></p><!-- /wp:paragraph -->"#
    );
}

#[test]
fn test_fallback_mapping() {
    let compiled = compile("<custom-tag>text</custom-tag>").unwrap();
    let block = &compiled.document.blocks[0];
    assert_eq!(block.name, "core/html");
    assert_eq!(block.content(), "text");
    assert_eq!(
        compiled.document.to_wire(),
        "<!-- wp:html --><custom-tag>text</custom-tag><!-- /wp:html -->"
    );
}

#[test]
fn test_figure_without_image_is_raw_html() {
    let compiled = compile("<figure><span>x</span></figure>").unwrap();
    assert_eq!(compiled.document.blocks[0].name, "core/html");
}

#[test]
fn test_bare_text_is_wrapped() {
    let compiled = compile("Hello").unwrap();
    let block = &compiled.document.blocks[0];
    assert_eq!(block.name, "core/paragraph");
    assert_eq!(block.content(), "Hello");
    assert_eq!(to_wire("Hello"), "<!-- wp:paragraph --><p>Hello</p><!-- /wp:paragraph -->");
}

#[test]
fn test_generic_passthrough() {
    let compiled = compile(r#"<block name="any/thing" foo="bar">X</block>"#).unwrap();
    let block = &compiled.document.blocks[0];
    assert_eq!(block.name, "any/thing");
    assert_eq!(block.attr("foo"), Some(&json!("bar")));
    assert_eq!(block.html(), "X");
    assert_eq!(compiled.warnings.len(), 1);
    assert_eq!(compiled.warnings[0].category, WarningCategory::UnknownBlock);

    insta::assert_snapshot!(
        compiled.document.to_wire(),
        @r#"<!-- wp:any/thing {"foo":"bar"} -->X<!-- /wp:any/thing -->"#
    );
}

#[test]
fn test_nested_container_with_controls() {
    let source = r#"
<section key="hero" templateLock="contentOnly">
  <h2 key="title">Welcome</h2>
  <p>Intro text</p>
</section>
"#;
    insta::assert_snapshot!(
        to_wire(source),
        @r#"<!-- wp:group {"metadata":{"key":"hero"},"tagName":"section","templateLock":"contentOnly"} --><section><!-- wp:heading {"metadata":{"key":"title"}} --><h2>Welcome</h2><!-- /wp:heading --><!-- wp:paragraph --><p>Intro text</p><!-- /wp:paragraph --></section><!-- /wp:group -->"#
    );
}

#[test]
fn test_image_attributes() {
    let compiled = compile(r#"<img src="/cat.png" alt="A cat" width="640">"#).unwrap();
    assert_eq!(
        compiled.document.to_wire(),
        r#"<!-- wp:image {"alt":"A cat","url":"/cat.png","width":640} --><img src="/cat.png" alt="A cat" width="640"><!-- /wp:image -->"#
    );
}

#[test]
fn test_attribute_text_is_escaped_in_json() {
    let compiled = compile(r#"<block name="acme/note" label="a -- <b> &amp; &quot;c&quot;"/>"#).unwrap();
    assert_eq!(
        compiled.document.to_wire(),
        r#"<!-- wp:acme/note {"label":"a \u002d\u002d \u003cb\u003e \u0026 \u0022c\u0022"} /-->"#
    );
}

#[test]
fn test_compile_output_parses_back() {
    let source = r#"<h1>T</h1><ul><li>a</li><li key="b">b</li></ul><blockquote><p>q</p></blockquote><hr>"#;
    let compiled = compile(source).unwrap();
    let wire_text = compiled.document.to_wire();
    let parsed = wire::parse(&wire_text).unwrap();
    assert_eq!(parsed, compiled.document.blocks);
}

#[test]
fn test_serialization_is_repeatable() {
    let source = "<div class=\"a\"><p>x</p><pre><code>let x = 1;</code></pre></div>";
    assert_eq!(to_wire(source), to_wire(source));
}

#[test]
fn test_parse_error_has_position() {
    let err = compile("<div>\n  <p>text</div>").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("2:"), "unexpected message: {}", message);
    let report = err.format("<div>\n  <p>text</div>", "page.html");
    assert!(report.contains("page.html"));
}
