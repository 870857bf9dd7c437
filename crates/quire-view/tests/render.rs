use quire_core::{Document, Mark, Marks, Node, TextNode};
use quire_view::{RenderNode, Tag, document_to_html, render_document, render_leaf};

fn doc(json: &str) -> Document {
    Document::from_json_str(json).unwrap()
}

#[test]
fn block_types_map_to_tags_and_styles() {
    let html = document_to_html(&doc(
        r#"[
            {"type":"heading-one","children":[{"text":"Title"}]},
            {"type":"heading-two","children":[{"text":"Sub"}]},
            {"type":"block-quote","children":[{"text":"Quoted"}]},
            {"type":"code","children":[{"text":"let x"}]}
        ]"#,
    ));

    assert_eq!(
        html,
        concat!(
            "<h1><span>Title</span></h1>",
            "<h2 style=\"color: #555\"><span>Sub</span></h2>",
            "<blockquote style=\"color: #777; background-color: #EEE\"><span>Quoted</span></blockquote>",
            "<code><span>let x</span></code>",
        )
    );
}

#[test]
fn lists_render_nested() {
    let html = document_to_html(&doc(
        r#"[
            {"type":"bulleted-list","children":[{"type":"list-item","children":[{"text":"a"}]}]},
            {"type":"numbered-list","children":[{"type":"list-item","children":[{"text":"b"}]}]}
        ]"#,
    ));

    assert_eq!(
        html,
        "<ul><li><span>a</span></li></ul><ol><li><span>b</span></li></ol>"
    );
}

#[test]
fn unknown_block_type_renders_as_paragraph() {
    let nodes = render_document(&doc(
        r#"[{"type":"callout","children":[{"text":"x"}]},{"type":"paragraph","children":[{"text":"y"}]}]"#,
    ));

    assert_eq!(nodes[0].tag(), Some(Tag::P));
    assert_eq!(nodes[1].tag(), Some(Tag::P));
}

#[test]
fn only_set_flags_add_wrappers() {
    let leaf = TextNode {
        text: "hi".to_string(),
        marks: Marks::default()
            .with(Mark::Italic, true)
            .with(Mark::Bold, true),
    };
    let rendered = render_leaf(&leaf, vec![RenderNode::Text("hi".to_string())]);
    assert_eq!(rendered.to_html(), "<span><strong><em>hi</em></strong></span>");

    let plain = Node::text("hi");
    let Node::Text(plain) = &plain else {
        panic!("expected leaf");
    };
    assert_eq!(
        render_leaf(plain, vec![RenderNode::Text("hi".to_string())]).to_html(),
        "<span>hi</span>"
    );
}

#[test]
fn text_content_is_escaped() {
    let html = document_to_html(&Document::new(vec![Node::paragraph("1 < 2 && \"q\"")]));
    assert_eq!(html, "<p><span>1 &lt; 2 &amp;&amp; &quot;q&quot;</span></p>");
}
