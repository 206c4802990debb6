//! Comprehensive tests for weft-html
//!
//! Parsing edge cases and the shape of the resulting DOM.

use weft_html::HtmlParser;

#[test]
fn test_parse_minimal_html() {
    let doc = HtmlParser::new().parse("").unwrap();
    assert!(doc.tree().len() >= 1, "Even empty HTML should have root");
    assert!(doc.document_element().is_some());
}

#[test]
fn test_whitespace_text_is_dropped() {
    let doc = HtmlParser::new()
        .parse("<body>\n   <div id=\"a\">  </div>\n</body>")
        .unwrap();
    let div = doc.get_element_by_id("a").unwrap();
    assert!(doc.tree().child_ids(div).is_empty());
}

#[test]
fn test_attributes_preserved() {
    let html = r#"
        <div id="main" class="container primary" data-value="123">
            <a href="https://example.com" target="_blank">Link</a>
        </div>
    "#;

    let doc = HtmlParser::new().parse(html).unwrap();
    let tree = doc.tree();
    let main = doc.get_element_by_id("main").unwrap();
    assert_eq!(tree.get_attribute(main, "data-value"), Some("123"));
    assert_eq!(tree.get_attribute(main, "class"), Some("container primary"));

    let link = tree.child_ids(main)[0];
    assert_eq!(tree.tag_name(link), Some("a"));
    assert_eq!(tree.text_content(link), "Link");
}

#[test]
fn test_parse_malformed_html() {
    // HTML5 parser should handle malformed HTML gracefully
    let html = r#"
        <div>
            <p>Unclosed paragraph
            <span>Unclosed span
        </div>
        <p>Another paragraph without closing
    "#;

    let doc = HtmlParser::new().parse(html).unwrap();
    assert!(doc.tree().len() > 5);
}

#[test]
fn test_form_controls() {
    let html = r#"
        <form>
            <input id="name" value="Ada">
            <select id="size"><option>S</option><option selected>M</option></select>
            <textarea id="bio">Hello</textarea>
        </form>
    "#;
    let doc = HtmlParser::new().parse(html).unwrap();
    let tree = doc.tree();

    let name = doc.get_element_by_id("name").unwrap();
    let size = doc.get_element_by_id("size").unwrap();
    let bio = doc.get_element_by_id("bio").unwrap();

    assert_eq!(tree.value(name).as_deref(), Some("Ada"));
    assert_eq!(tree.value(size).as_deref(), Some("M"));
    assert_eq!(tree.value(bio).as_deref(), Some("Hello"));
}

#[test]
fn test_uppercase_tags_are_lowercased() {
    let doc = HtmlParser::new().parse("<DIV ID=\"x\"><SPAN>t</SPAN></DIV>").unwrap();
    let div = doc.get_element_by_id("x").unwrap();
    assert_eq!(doc.tree().tag_name(div), Some("div"));
}
